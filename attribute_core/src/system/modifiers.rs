//! Applying, removing and expiring modifiers

use super::{not_found, AttributeSystem};
use crate::error::AttributeError;
use crate::modifier::{Modifier, ModifierLedger};
use crate::scheduler::{Scheduler, TimerTask};
use crate::types::{AttributeTag, Operation, ValueTarget};
use tracing::{debug, trace};

impl<S: Scheduler> AttributeSystem<S> {
    /// Add `modifier.value` to its attribute and record it
    ///
    /// A positive duration schedules a revert that subtracts the same amount
    /// once it elapses. Returns the value after the add.
    pub fn apply_modifier(&mut self, modifier: Modifier) -> Result<f64, AttributeError> {
        if !self.registry.contains(&modifier.tag) {
            return Err(not_found("apply_modifier", &modifier.tag));
        }

        let value = self.apply_operation(
            &modifier.tag,
            modifier.value,
            Operation::Add,
            ValueTarget::CurrentValue,
        )?;

        let revert_timer = modifier.is_temporary().then(|| {
            self.scheduler.schedule_once(
                modifier.duration,
                TimerTask::RevertModifier {
                    tag: modifier.tag.clone(),
                    amount: modifier.value,
                },
            )
        });

        debug!(
            "Modifier applied: {} {:+} ({})",
            modifier.tag,
            modifier.value,
            if modifier.is_temporary() {
                format!("{}s", modifier.duration)
            } else {
                "permanent".to_string()
            }
        );
        self.modifiers.push(modifier, revert_timer);
        Ok(value)
    }

    /// Subtract `amount` from the attribute and drop the first ledger entry
    /// matching `(tag, amount)`
    ///
    /// The subtraction happens even when no entry matches. A pending revert
    /// of the dropped entry is left scheduled and will subtract again when
    /// it fires.
    pub fn remove_modifier(&mut self, tag: &AttributeTag, amount: f64) -> Result<f64, AttributeError> {
        if !self.registry.contains(tag) {
            return Err(not_found("remove_modifier", tag));
        }

        let value = self.apply_operation(tag, amount, Operation::Subtract, ValueTarget::CurrentValue)?;

        match self.modifiers.remove_first(tag, amount) {
            Some(_) => debug!("Modifier removed: {} {:+}", tag, amount),
            None => debug!("No modifier recorded for {} {:+}, value adjusted anyway", tag, amount),
        }
        Ok(value)
    }

    /// Deferred revert of a timed modifier, through `remove_modifier`
    pub(super) fn expire_modifier(&mut self, tag: &AttributeTag, amount: f64) {
        match self.remove_modifier(tag, amount) {
            Ok(value) => debug!("Modifier expired: {} {:+} -> {}", tag, amount, value),
            Err(e) => trace!("Modifier revert for {} had no effect: {}", tag, e),
        }
    }

    /// Active modifiers in the order they were applied
    pub fn active_modifiers(&self) -> impl Iterator<Item = &Modifier> {
        self.modifiers.iter()
    }

    pub fn modifiers(&self) -> &ModifierLedger {
        &self.modifiers
    }
}
