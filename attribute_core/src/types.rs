//! Core types shared across the attribute engine

use crate::error::AttributeError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Identifier for an attribute (e.g. `Attribute.Health`)
///
/// Equality and hashing are by string content, so a `const` tag and a tag
/// parsed from a config file compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeTag(Cow<'static, str>);

impl AttributeTag {
    /// Create a tag from a static string, usable in `const` items
    pub const fn from_static(name: &'static str) -> Self {
        AttributeTag(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        AttributeTag(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for AttributeTag {
    fn from(s: &str) -> Self {
        AttributeTag::new(s)
    }
}

impl From<String> for AttributeTag {
    fn from(s: String) -> Self {
        AttributeTag(Cow::Owned(s))
    }
}

impl fmt::Display for AttributeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Well-known attribute tags
pub mod tags {
    use super::AttributeTag;

    pub const HEALTH: AttributeTag = AttributeTag::from_static("Attribute.Health");
    pub const MANA: AttributeTag = AttributeTag::from_static("Attribute.Mana");
    pub const STAMINA: AttributeTag = AttributeTag::from_static("Attribute.Stamina");
}

/// Arithmetic applied by the mutation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Override,
}

impl Operation {
    /// Compute the proposed value. Returns `None` for a zero divisor.
    pub fn apply(self, old: f64, input: f64) -> Option<f64> {
        match self {
            Operation::Add => Some(old + input),
            Operation::Subtract => Some(old - input),
            Operation::Multiply => Some(old * input),
            Operation::Divide => {
                if input == 0.0 {
                    None
                } else {
                    Some(old / input)
                }
            }
            Operation::Override => Some(input),
        }
    }

    /// Numeric code used by hosts that pass operations across a C-like boundary
    pub fn code(self) -> u8 {
        match self {
            Operation::Add => 0,
            Operation::Subtract => 1,
            Operation::Multiply => 2,
            Operation::Divide => 3,
            Operation::Override => 4,
        }
    }
}

impl TryFrom<u8> for Operation {
    type Error = AttributeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Operation::Add),
            1 => Ok(Operation::Subtract),
            2 => Ok(Operation::Multiply),
            3 => Ok(Operation::Divide),
            4 => Ok(Operation::Override),
            other => Err(AttributeError::InvalidOperation(other)),
        }
    }
}

/// Which field of an attribute an operation writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTarget {
    #[default]
    CurrentValue,
    MinBound,
    MaxBound,
}
