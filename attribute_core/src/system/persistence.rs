//! Snapshot, restore and save-slot round trips

use super::AttributeSystem;
use crate::error::AttributeError;
use crate::persistence::{AttributeSnapshot, LoadOutcome, SaveStore};
use crate::scheduler::Scheduler;
use crate::types::ValueTarget;
use tracing::{debug, info, warn};

impl<S: Scheduler> AttributeSystem<S> {
    /// Current value of every attribute
    pub fn snapshot(&self) -> AttributeSnapshot {
        self.registry
            .all()
            .iter()
            .map(|a| (a.tag.clone(), a.value))
            .collect()
    }

    /// Overwrite values for tags present in both the snapshot and the registry
    ///
    /// Bypasses the operation pipeline: no pre-change event, and a `Changed`
    /// for every restored tag even if its value did not move. Returns how
    /// many attributes were restored.
    pub fn restore(&mut self, snapshot: &AttributeSnapshot) -> usize {
        let mut restored = 0;

        for (tag, saved) in snapshot.iter() {
            let Some(attr) = self.registry.get(tag) else {
                debug!("Snapshot tag {} not in registry, skipping", tag);
                continue;
            };

            let value = attr.clamp_for(ValueTarget::CurrentValue, saved);
            if value != saved {
                warn!(
                    "Saved value {} for {} outside [{}, {}], clamped to {}",
                    saved, tag, attr.min_value, attr.max_value, value
                );
            }

            self.commit_value(tag, value);
            restored += 1;
        }

        debug!("Restored {} of {} saved attributes", restored, snapshot.len());
        restored
    }

    /// Write the current snapshot to `(slot, index)`
    pub fn save_attributes(
        &self,
        store: &mut impl SaveStore,
        slot: &str,
        index: u32,
    ) -> Result<AttributeSnapshot, AttributeError> {
        let snapshot = self.snapshot();
        snapshot
            .ensure_finite(slot, index)
            .and_then(|_| store.save_slot(slot, index, &snapshot))
            .map_err(|e| {
                warn!("Failed to save attributes to {}[{}]: {}", slot, index, e);
                e
            })?;

        info!("Saved {} attributes to {}[{}]", snapshot.len(), slot, index);
        Ok(snapshot)
    }

    /// Load-or-create
    ///
    /// Restores the saved snapshot when there is one. When nothing is saved
    /// the live values are written as the new save. A store that fails to
    /// read is left alone and the live values stay in effect.
    pub fn load_attributes(&mut self, store: &mut impl SaveStore, slot: &str, index: u32) -> LoadOutcome {
        match store.load_slot(slot, index) {
            Ok(Some(snapshot)) => {
                let restored = self.restore(&snapshot);
                info!("Loaded {} attributes from {}[{}]", restored, slot, index);
                LoadOutcome::Restored(snapshot)
            }
            Ok(None) => {
                debug!("No save at {}[{}], creating one", slot, index);
                match self.save_attributes(store, slot, index) {
                    Ok(snapshot) => LoadOutcome::Created(snapshot),
                    // Already logged; the live values are still the effective snapshot
                    Err(_) => LoadOutcome::Created(self.snapshot()),
                }
            }
            Err(e) => {
                warn!("Failed to load {}[{}], keeping live values: {}", slot, index, e);
                LoadOutcome::Unavailable(self.snapshot())
            }
        }
    }

    /// `save_attributes` on the slot named in the settings
    pub fn save_default(&self, store: &mut impl SaveStore) -> Result<AttributeSnapshot, AttributeError> {
        self.save_attributes(store, &self.settings.save_slot, self.settings.save_index)
    }

    /// `load_attributes` on the slot named in the settings
    pub fn load_default(&mut self, store: &mut impl SaveStore) -> LoadOutcome {
        let slot = self.settings.save_slot.clone();
        let index = self.settings.save_index;
        self.load_attributes(store, &slot, index)
    }
}
