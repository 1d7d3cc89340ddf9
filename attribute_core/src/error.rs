//! Error types for the attribute engine
//!
//! Nothing here is fatal: every failing call leaves the attribute set as it
//! was and reports why.

use crate::types::AttributeTag;
use thiserror::Error;

/// Failure of a single engine call
#[derive(Error, Debug)]
pub enum AttributeError {
    #[error("attribute not found: {0}")]
    NotFound(AttributeTag),
    #[error("attribute already exists: {0}")]
    DuplicateKey(AttributeTag),
    #[error("divide by zero for attribute: {0}")]
    DivisionByZero(AttributeTag),
    #[error("invalid operation code: {0}")]
    InvalidOperation(u8),
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Failure reported by a save store
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("save store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("save store rejected slot {slot}[{index}]: {reason}")]
    Rejected {
        slot: String,
        index: u32,
        reason: String,
    },
}
