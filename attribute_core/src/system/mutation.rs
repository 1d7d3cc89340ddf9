//! Value mutation: the single write path for values and bounds

use super::{not_found, AttributeSystem};
use crate::attribute::AttributeValues;
use crate::error::AttributeError;
use crate::events::AttributeEvent;
use crate::scheduler::Scheduler;
use crate::types::{AttributeTag, Operation, ValueTarget};
use tracing::{debug, warn};

impl<S: Scheduler> AttributeSystem<S> {
    /// Apply `operation` with `input` to one field of an attribute
    ///
    /// The result is clamped for the target field before it is committed.
    /// A commit that leaves the field unchanged emits nothing. Returns the
    /// field's value after the call.
    pub fn apply_operation(
        &mut self,
        tag: &AttributeTag,
        input: f64,
        operation: Operation,
        target: ValueTarget,
    ) -> Result<f64, AttributeError> {
        let Some(attr) = self.registry.get(tag) else {
            return Err(not_found("apply_operation", tag));
        };

        let old = attr.field(target);
        let Some(proposed) = operation.apply(old, input) else {
            warn!("Divide by zero for attribute: {} ({:?})", tag, target);
            return Err(AttributeError::DivisionByZero(tag.clone()));
        };
        let committed = attr.clamp_for(target, proposed);

        if committed == old {
            return Ok(old);
        }

        match target {
            ValueTarget::CurrentValue => {
                self.emit(AttributeEvent::PreChanged {
                    tag: tag.clone(),
                    proposed,
                });
                self.commit_value(tag, committed);
            }
            ValueTarget::MinBound | ValueTarget::MaxBound => {
                self.commit_bound(tag, target, committed);
            }
        }

        debug!(
            "Attribute {} {:?}: {} -> {} ({:?} {})",
            tag, target, old, committed, operation, input
        );
        Ok(committed)
    }

    /// `apply_operation` on the current value
    pub fn set_value(&mut self, tag: &AttributeTag, value: f64, operation: Operation) -> Result<f64, AttributeError> {
        self.apply_operation(tag, value, operation, ValueTarget::CurrentValue)
    }

    pub fn increase(&mut self, tag: &AttributeTag, amount: f64) -> Result<f64, AttributeError> {
        self.apply_operation(tag, amount, Operation::Add, ValueTarget::CurrentValue)
    }

    pub fn decrease(&mut self, tag: &AttributeTag, amount: f64) -> Result<f64, AttributeError> {
        self.apply_operation(tag, amount, Operation::Subtract, ValueTarget::CurrentValue)
    }

    pub fn set_min_value(&mut self, tag: &AttributeTag, value: f64, operation: Operation) -> Result<f64, AttributeError> {
        self.apply_operation(tag, value, operation, ValueTarget::MinBound)
    }

    pub fn set_max_value(&mut self, tag: &AttributeTag, value: f64, operation: Operation) -> Result<f64, AttributeError> {
        self.apply_operation(tag, value, operation, ValueTarget::MaxBound)
    }

    /// Emit `ThresholdReached` if the attribute sits at or below its minimum
    ///
    /// Returns whether the threshold was reached.
    pub fn check_threshold(&mut self, tag: &AttributeTag) -> Result<bool, AttributeError> {
        let Some(attr) = self.registry.get(tag) else {
            return Err(not_found("check_threshold", tag));
        };
        if attr.value > attr.min_value {
            return Ok(false);
        }

        let value = attr.value;
        self.emit(AttributeEvent::ThresholdReached {
            tag: tag.clone(),
            value,
        });
        debug!("Threshold reached for attribute: {} ({})", tag, value);
        Ok(true)
    }

    /// `(value - min) / (max - min)`, or 0 for a degenerate range or missing tag
    pub fn value_normalized(&self, tag: &AttributeTag) -> f64 {
        self.registry.get(tag).map(|a| a.normalized()).unwrap_or(0.0)
    }

    // === Vital ===

    /// Damage the vital attribute
    ///
    /// Emits `VitalDepleted` the first time the value ends at or below zero.
    /// The check is against a literal zero, not the attribute's minimum;
    /// `check_threshold` is the min-based check.
    pub fn decrease_vital(&mut self, amount: f64) -> Result<f64, AttributeError> {
        let tag = self.settings.vital_tag.clone();
        let result = self.decrease(&tag, amount);

        if let Some(attr) = self.registry.get(&tag) {
            if attr.value <= 0.0 && !self.vital_depleted {
                self.vital_depleted = true;
                self.emit(AttributeEvent::VitalDepleted);
                debug!("Vital attribute {} depleted", tag);
            }
        }
        result
    }

    pub fn increase_vital(&mut self, amount: f64) -> Result<f64, AttributeError> {
        let tag = self.settings.vital_tag.clone();
        self.increase(&tag, amount)
    }

    pub fn vital(&self) -> f64 {
        self.value(&self.settings.vital_tag)
    }

    pub fn max_vital(&self) -> f64 {
        self.values(&self.settings.vital_tag).max
    }

    pub fn vital_normalized(&self) -> f64 {
        self.value_normalized(&self.settings.vital_tag)
    }

    pub fn vital_values(&self) -> AttributeValues {
        self.values(&self.settings.vital_tag)
    }

    // === Commit ===

    /// Write a current value, notify, and re-evaluate regen
    ///
    /// Callers have already clamped `value` and decided it is worth a
    /// notification.
    pub(super) fn commit_value(&mut self, tag: &AttributeTag, value: f64) {
        let Some(attr) = self.registry.get_mut(tag) else {
            return;
        };
        attr.value = value;

        self.emit(AttributeEvent::Changed {
            tag: tag.clone(),
            value,
        });
        self.track_vital(tag, value);
        self.evaluate_regen(tag);
    }

    /// Write a bound, pull the current value back into range, notify, and
    /// re-evaluate regen
    fn commit_bound(&mut self, tag: &AttributeTag, target: ValueTarget, bound: f64) {
        let Some(attr) = self.registry.get_mut(tag) else {
            return;
        };
        match target {
            ValueTarget::MinBound => attr.min_value = bound,
            ValueTarget::MaxBound => attr.max_value = bound,
            ValueTarget::CurrentValue => attr.value = bound,
        }
        let old_value = attr.value;
        let value = attr.clamp_for(ValueTarget::CurrentValue, old_value);
        attr.value = value;

        self.emit(AttributeEvent::Changed {
            tag: tag.clone(),
            value: bound,
        });
        if value != old_value {
            self.emit(AttributeEvent::Changed {
                tag: tag.clone(),
                value,
            });
            self.track_vital(tag, value);
        }
        self.evaluate_regen(tag);
    }

    fn track_vital(&mut self, tag: &AttributeTag, value: f64) {
        if value > 0.0 && *tag == self.settings.vital_tag {
            self.vital_depleted = false;
        }
    }
}
