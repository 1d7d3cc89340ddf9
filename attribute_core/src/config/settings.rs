//! Engine settings

use crate::persistence::DEFAULT_SAVE_SLOT;
use crate::types::{tags, AttributeTag};
use serde::{Deserialize, Serialize};

/// Tunable engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Attribute watched by the vital helpers (`decrease_vital` and friends)
    #[serde(default = "default_vital_tag")]
    pub vital_tag: AttributeTag,
    /// Slot used by `save_default` / `load_default`
    #[serde(default = "default_save_slot")]
    pub save_slot: String,
    #[serde(default)]
    pub save_index: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            vital_tag: default_vital_tag(),
            save_slot: default_save_slot(),
            save_index: 0,
        }
    }
}

fn default_vital_tag() -> AttributeTag {
    tags::HEALTH
}
fn default_save_slot() -> String {
    DEFAULT_SAVE_SLOT.to_string()
}
