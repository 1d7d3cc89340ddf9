//! Prelude module for convenient imports
//!
//! ```rust
//! use attribute_core::prelude::*;
//! ```

// Core types
pub use crate::attribute::{AttributeDefinition, AttributeValues};
pub use crate::system::AttributeSystem;
pub use crate::types::{tags, AttributeTag, Operation, ValueTarget};

// Events
pub use crate::events::{AttributeEvent, EventKind};

// Modifiers and time
pub use crate::modifier::Modifier;
pub use crate::scheduler::{ManualScheduler, Scheduler};

// Persistence
pub use crate::persistence::{AttributeSnapshot, JsonFileStore, LoadOutcome, MemoryStore, SaveStore};

// Config
pub use crate::config::{default_attributes, load_attribute_set, EngineSettings};

pub use crate::error::AttributeError;
