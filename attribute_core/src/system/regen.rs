//! Per-attribute regeneration timers

use super::AttributeSystem;
use crate::scheduler::{Scheduler, TimerHandle, TimerTask};
use crate::types::{AttributeTag, Operation, ValueTarget};
use tracing::{debug, trace, warn};

impl<S: Scheduler> AttributeSystem<S> {
    /// Start or stop the regen timer so it exists exactly while the attribute
    /// wants regen
    pub(super) fn evaluate_regen(&mut self, tag: &AttributeTag) {
        let Some(attr) = self.registry.get(tag) else {
            self.stop_regen(tag);
            return;
        };

        if !attr.wants_regen() {
            self.stop_regen(tag);
            return;
        }
        if self.regen_timers.contains_key(tag) {
            return;
        }

        let rate = attr.regen_rate;
        if rate <= 0.0 {
            warn!("Attribute {} has regen enabled with non-positive rate {}", tag, rate);
            return;
        }

        let handle = self
            .scheduler
            .schedule_repeating(rate, TimerTask::RegenTick(tag.clone()));
        self.regen_timers.insert(tag.clone(), handle);
        debug!("Regen started for {} every {}s", tag, rate);
    }

    pub(super) fn stop_regen(&mut self, tag: &AttributeTag) {
        if let Some(handle) = self.regen_timers.remove(tag) {
            self.scheduler.cancel(handle);
            debug!("Regen stopped for {}", tag);
        }
    }

    pub(super) fn regen_tick(&mut self, handle: TimerHandle, tag: &AttributeTag) {
        if self.regen_timers.get(tag) != Some(&handle) {
            trace!("Ignoring stale regen tick for {}", tag);
            return;
        }
        let Some(amount) = self.registry.get(tag).map(|a| a.regen_value) else {
            trace!("Regen tick for missing attribute {}", tag);
            return;
        };

        // Add on a present tag cannot fail
        let _ = self.apply_operation(tag, amount, Operation::Add, ValueTarget::CurrentValue);
        self.evaluate_regen(tag);
    }

    /// Whether a regen timer is live for the attribute
    pub fn is_regenerating(&self, tag: &AttributeTag) -> bool {
        self.regen_timers.contains_key(tag)
    }

    /// Tags with a live regen timer, sorted
    pub fn regenerating_tags(&self) -> Vec<AttributeTag> {
        let mut tags: Vec<_> = self.regen_timers.keys().cloned().collect();
        tags.sort();
        tags
    }
}
