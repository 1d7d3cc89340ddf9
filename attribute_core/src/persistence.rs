//! Snapshots and the save stores they are written to

use crate::error::PersistenceError;
use crate::types::AttributeTag;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Default slot used when the host does not name one
pub const DEFAULT_SAVE_SLOT: &str = "AttributeSaveSlot";

/// Persisted attribute values: tag to current value, nothing else
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSnapshot {
    values: BTreeMap<AttributeTag, f64>,
}

impl AttributeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: AttributeTag, value: f64) {
        self.values.insert(tag, value);
    }

    pub fn get(&self, tag: &AttributeTag) -> Option<f64> {
        self.values.get(tag).copied()
    }

    pub fn contains(&self, tag: &AttributeTag) -> bool {
        self.values.contains_key(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeTag, f64)> {
        self.values.iter().map(|(t, v)| (t, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reject snapshots JSON cannot hold (`inf` and `NaN` would read back as `null`)
    pub fn ensure_finite(&self, slot: &str, index: u32) -> Result<(), PersistenceError> {
        match self.values.iter().find(|(_, v)| !v.is_finite()) {
            Some((tag, value)) => Err(PersistenceError::Rejected {
                slot: slot.to_string(),
                index,
                reason: format!("{} has non-finite value {}", tag, value),
            }),
            None => Ok(()),
        }
    }
}

impl FromIterator<(AttributeTag, f64)> for AttributeSnapshot {
    fn from_iter<I: IntoIterator<Item = (AttributeTag, f64)>>(iter: I) -> Self {
        AttributeSnapshot {
            values: iter.into_iter().collect(),
        }
    }
}

/// Result of a load-or-create
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// A saved snapshot was found and restored
    Restored(AttributeSnapshot),
    /// Nothing was saved; the live values were written as a fresh save
    Created(AttributeSnapshot),
    /// The store failed to read; the live values are in effect and the slot
    /// was left untouched
    Unavailable(AttributeSnapshot),
}

impl LoadOutcome {
    pub fn snapshot(&self) -> &AttributeSnapshot {
        match self {
            LoadOutcome::Restored(s) | LoadOutcome::Created(s) | LoadOutcome::Unavailable(s) => s,
        }
    }

    pub fn into_snapshot(self) -> AttributeSnapshot {
        match self {
            LoadOutcome::Restored(s) | LoadOutcome::Created(s) | LoadOutcome::Unavailable(s) => s,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, LoadOutcome::Created(_))
    }

    pub fn was_restored(&self) -> bool {
        matches!(self, LoadOutcome::Restored(_))
    }
}

/// Key-value store addressed by `(slot, index)`
pub trait SaveStore {
    fn save_slot(
        &mut self,
        slot: &str,
        index: u32,
        snapshot: &AttributeSnapshot,
    ) -> Result<(), PersistenceError>;

    /// `Ok(None)` when nothing has been saved at that address
    fn load_slot(&self, slot: &str, index: u32) -> Result<Option<AttributeSnapshot>, PersistenceError>;
}

/// In-memory store, for tests and hosts without a filesystem
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: HashMap<(String, u32), AttributeSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, slot: &str, index: u32) -> bool {
        self.slots.contains_key(&(slot.to_string(), index))
    }
}

impl SaveStore for MemoryStore {
    fn save_slot(
        &mut self,
        slot: &str,
        index: u32,
        snapshot: &AttributeSnapshot,
    ) -> Result<(), PersistenceError> {
        self.slots.insert((slot.to_string(), index), snapshot.clone());
        Ok(())
    }

    fn load_slot(&self, slot: &str, index: u32) -> Result<Option<AttributeSnapshot>, PersistenceError> {
        Ok(self.slots.get(&(slot.to_string(), index)).cloned())
    }
}

/// Store that keeps each slot as `{dir}/{slot}_{index}.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    /// Create the store, creating `base_dir` if needed
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(JsonFileStore { base_dir })
    }

    pub fn slot_path(&self, slot: &str, index: u32) -> PathBuf {
        self.base_dir.join(format!("{}_{}.json", slot, index))
    }

    /// Path for a slot, refusing names that would leave `base_dir`
    fn checked_path(&self, slot: &str, index: u32) -> Result<PathBuf, PersistenceError> {
        if slot.is_empty() || slot.contains(['/', '\\']) {
            return Err(PersistenceError::Rejected {
                slot: slot.to_string(),
                index,
                reason: "slot name must be a plain file stem".to_string(),
            });
        }
        Ok(self.slot_path(slot, index))
    }
}

impl SaveStore for JsonFileStore {
    fn save_slot(
        &mut self,
        slot: &str,
        index: u32,
        snapshot: &AttributeSnapshot,
    ) -> Result<(), PersistenceError> {
        snapshot.ensure_finite(slot, index)?;
        let path = self.checked_path(slot, index)?;
        let temp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!("Saved attributes to {}", path.display());
        Ok(())
    }

    fn load_slot(&self, slot: &str, index: u32) -> Result<Option<AttributeSnapshot>, PersistenceError> {
        let path = self.checked_path(slot, index)?;
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        let snapshot = serde_json::from_slice(&bytes)?;

        tracing::debug!("Loaded attributes from {}", path.display());
        Ok(Some(snapshot))
    }
}
