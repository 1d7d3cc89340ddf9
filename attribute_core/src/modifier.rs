//! Modifiers - additive adjustments to an attribute's current value

use crate::scheduler::TimerHandle;
use crate::types::AttributeTag;
use serde::{Deserialize, Serialize};

/// Signed adjustment to one attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub tag: AttributeTag,
    /// Amount added on apply and subtracted on revert
    pub value: f64,
    /// Seconds until automatic revert; `<= 0` means permanent
    #[serde(default = "permanent")]
    pub duration: f64,
}

fn permanent() -> f64 {
    -1.0
}

impl Modifier {
    pub fn permanent(tag: impl Into<AttributeTag>, value: f64) -> Self {
        Modifier {
            tag: tag.into(),
            value,
            duration: permanent(),
        }
    }

    pub fn timed(tag: impl Into<AttributeTag>, value: f64, duration: f64) -> Self {
        Modifier {
            tag: tag.into(),
            value,
            duration,
        }
    }

    pub fn is_temporary(&self) -> bool {
        self.duration > 0.0
    }

    fn matches(&self, tag: &AttributeTag, amount: f64) -> bool {
        self.tag == *tag && self.value == amount
    }
}

/// A modifier currently in effect
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveModifier {
    pub modifier: Modifier,
    /// Pending revert timer for temporary modifiers
    pub revert_timer: Option<TimerHandle>,
}

/// Ordered list of active modifiers
///
/// Not keyed: two modifiers with the same tag and value are
/// indistinguishable to `remove_first`.
#[derive(Debug, Clone, Default)]
pub struct ModifierLedger {
    active: Vec<ActiveModifier>,
}

impl ModifierLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, modifier: Modifier, revert_timer: Option<TimerHandle>) {
        self.active.push(ActiveModifier {
            modifier,
            revert_timer,
        });
    }

    /// Remove the first entry matching `(tag, amount)` exactly
    pub fn remove_first(&mut self, tag: &AttributeTag, amount: f64) -> Option<ActiveModifier> {
        let position = self
            .active
            .iter()
            .position(|m| m.modifier.matches(tag, amount))?;
        Some(self.active.remove(position))
    }

    /// Remove every entry for a tag
    pub fn remove_tag(&mut self, tag: &AttributeTag) -> Vec<ActiveModifier> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|m| m.modifier.tag == *tag);
        self.active = kept;
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Modifier> {
        self.active.iter().map(|m| &m.modifier)
    }

    pub fn entries(&self) -> &[ActiveModifier] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
