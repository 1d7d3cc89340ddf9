//! Attribute set configuration loading

use super::{ConfigError, EngineSettings};
use crate::attribute::AttributeDefinition;
use crate::types::tags;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// An ordered attribute set plus the settings that go with it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeSetConfig {
    #[serde(default)]
    pub settings: EngineSettings,
    #[serde(rename = "attributes", default)]
    pub attributes: Vec<AttributeDefinition>,
}

impl AttributeSetConfig {
    /// Reject sets that could never satisfy `min <= value <= max`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for attr in &self.attributes {
            if attr.tag.is_empty() {
                return Err(ConfigError::Invalid(
                    "attribute with empty tag".to_string(),
                ));
            }
            if !seen.insert(&attr.tag) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate attribute tag: {}",
                    attr.tag
                )));
            }
            if attr.min_value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{}: min_value must not be negative",
                    attr.tag
                )));
            }
            if attr.min_value > attr.max_value {
                return Err(ConfigError::Invalid(format!(
                    "{}: min_value {} exceeds max_value {}",
                    attr.tag, attr.min_value, attr.max_value
                )));
            }
            if attr.value < attr.min_value || attr.value > attr.max_value {
                return Err(ConfigError::Invalid(format!(
                    "{}: value {} outside [{}, {}]",
                    attr.tag, attr.value, attr.min_value, attr.max_value
                )));
            }
            if attr.use_regen && attr.regen_rate <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{}: regen enabled with non-positive regen_rate",
                    attr.tag
                )));
            }
        }
        Ok(())
    }
}

/// Load and validate an attribute set from a TOML file
pub fn load_attribute_set(path: &Path) -> Result<AttributeSetConfig, ConfigError> {
    let config: AttributeSetConfig = super::load_toml(path)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate an attribute set from a TOML string
pub fn parse_attribute_set(content: &str) -> Result<AttributeSetConfig, ConfigError> {
    let config: AttributeSetConfig = super::parse_toml(content)?;
    config.validate()?;
    Ok(config)
}

/// Built-in Health / Mana / Stamina set
pub fn default_attributes() -> Vec<AttributeDefinition> {
    let toml = include_str!("../../config/attributes.toml");
    parse_attribute_set(toml)
        .map(|config| config.attributes)
        .unwrap_or_else(|_| {
            vec![
                AttributeDefinition::new(tags::HEALTH, 100.0, 0.0, 100.0).with_regen(1.0, 1.0),
                AttributeDefinition::new(tags::MANA, 100.0, 0.0, 100.0).with_regen(0.5, 2.0),
                AttributeDefinition::new(tags::STAMINA, 100.0, 0.0, 100.0).with_regen(0.25, 5.0),
            ]
        })
}
