//! Attribute definitions and the registry that owns them

mod registry;

pub use registry::AttributeRegistry;

use crate::types::{AttributeTag, ValueTarget};
use serde::{Deserialize, Serialize};

/// Static description and live state of one attribute
///
/// Invariant after any mutation: `min_value <= value <= max_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Unique identifier
    pub tag: AttributeTag,
    /// Current value
    #[serde(default)]
    pub value: f64,
    /// Lower bound (never negative once mutated)
    #[serde(default)]
    pub min_value: f64,
    /// Upper bound (no ceiling)
    #[serde(default = "default_max_value")]
    pub max_value: f64,
    /// Whether the value regenerates toward `max_value`
    #[serde(default)]
    pub use_regen: bool,
    /// Seconds between regen ticks
    #[serde(default)]
    pub regen_rate: f64,
    /// Amount added per regen tick
    #[serde(default)]
    pub regen_value: f64,
}

fn default_max_value() -> f64 {
    100.0
}

impl Default for AttributeDefinition {
    fn default() -> Self {
        AttributeDefinition {
            tag: AttributeTag::from_static(""),
            value: 0.0,
            min_value: 0.0,
            max_value: default_max_value(),
            use_regen: false,
            regen_rate: 0.0,
            regen_value: 0.0,
        }
    }
}

impl AttributeDefinition {
    /// Create a definition without regen
    pub fn new(tag: impl Into<AttributeTag>, value: f64, min_value: f64, max_value: f64) -> Self {
        AttributeDefinition {
            tag: tag.into(),
            value,
            min_value,
            max_value,
            ..Default::default()
        }
    }

    /// Enable regen: `regen_value` added every `regen_rate` seconds
    pub fn with_regen(mut self, regen_rate: f64, regen_value: f64) -> Self {
        self.use_regen = true;
        self.regen_rate = regen_rate;
        self.regen_value = regen_value;
        self
    }

    /// Read one field
    pub fn field(&self, target: ValueTarget) -> f64 {
        match target {
            ValueTarget::CurrentValue => self.value,
            ValueTarget::MinBound => self.min_value,
            ValueTarget::MaxBound => self.max_value,
        }
    }

    /// Clamp a proposed value for the given field
    ///
    /// - current value: `[min, max]`
    /// - min bound: `[0, max]`
    /// - max bound: `[min, +inf)`
    pub fn clamp_for(&self, target: ValueTarget, proposed: f64) -> f64 {
        match target {
            ValueTarget::CurrentValue => clamp(proposed, self.min_value, self.max_value),
            ValueTarget::MinBound => clamp(proposed, 0.0, self.max_value),
            ValueTarget::MaxBound => proposed.max(self.min_value),
        }
    }

    /// Whether a regen timer should exist for this attribute
    pub fn wants_regen(&self) -> bool {
        self.use_regen && self.value < self.max_value
    }

    /// Normalized value in `[0, 1]`, or 0 for a degenerate range
    pub fn normalized(&self) -> f64 {
        if self.max_value != self.min_value {
            (self.value - self.min_value) / (self.max_value - self.min_value)
        } else {
            0.0
        }
    }

    /// Bring a definition from an external source into a consistent state
    ///
    /// Returns true if anything had to change.
    pub(crate) fn normalize(&mut self) -> bool {
        let before = (self.value, self.max_value);
        self.max_value = self.max_value.max(self.min_value);
        self.value = clamp(self.value, self.min_value, self.max_value);
        before != (self.value, self.max_value)
    }

    pub fn values(&self) -> AttributeValues {
        AttributeValues {
            value: self.value,
            min: self.min_value,
            max: self.max_value,
        }
    }
}

/// Value and bounds of one attribute, zeroed for a missing tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeValues {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

/// Like `f64::clamp`, but does not panic on inverted or NaN bounds
fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}
