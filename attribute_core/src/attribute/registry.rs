//! AttributeRegistry - ordered attribute storage with a tag index

use super::AttributeDefinition;
use crate::types::AttributeTag;
use std::collections::HashMap;

/// Live attribute set, indexed by tag
///
/// Insertion order is kept for enumeration and reset. The registry is pure
/// storage; events and regen bookkeeping live in `AttributeSystem`.
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    attributes: Vec<AttributeDefinition>,
    index: HashMap<AttributeTag, usize>,
    /// Copy of the set given to `replace`, used by `restore_backup`
    backup: Vec<AttributeDefinition>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the live set and the reset backup
    ///
    /// Returns the tags that were dropped as duplicates (first occurrence wins).
    pub fn replace(&mut self, definitions: Vec<AttributeDefinition>) -> Vec<AttributeTag> {
        let mut duplicates = Vec::new();
        let mut unique: Vec<AttributeDefinition> = Vec::with_capacity(definitions.len());
        for def in definitions {
            if unique.iter().any(|d| d.tag == def.tag) {
                duplicates.push(def.tag);
            } else {
                unique.push(def);
            }
        }
        self.backup = unique.clone();
        self.attributes = unique;
        self.rebuild_index();
        duplicates
    }

    /// Restore the live set from the backup taken by `replace`
    pub fn restore_backup(&mut self) {
        self.attributes = self.backup.clone();
        self.rebuild_index();
    }

    /// Insert a new attribute. Returns false if the tag is already present.
    pub fn insert(&mut self, definition: AttributeDefinition) -> bool {
        if self.contains(&definition.tag) {
            return false;
        }
        self.index
            .insert(definition.tag.clone(), self.attributes.len());
        self.attributes.push(definition);
        true
    }

    /// Remove an attribute, returning it if present
    pub fn remove(&mut self, tag: &AttributeTag) -> Option<AttributeDefinition> {
        let position = self.index.get(tag).copied()?;
        let removed = self.attributes.remove(position);
        self.rebuild_index();
        Some(removed)
    }

    pub fn get(&self, tag: &AttributeTag) -> Option<&AttributeDefinition> {
        self.index.get(tag).map(|&i| &self.attributes[i])
    }

    pub fn get_mut(&mut self, tag: &AttributeTag) -> Option<&mut AttributeDefinition> {
        match self.index.get(tag) {
            Some(&i) => self.attributes.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, tag: &AttributeTag) -> bool {
        self.index.contains_key(tag)
    }

    /// All attributes in insertion order
    pub fn all(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    /// Tags in insertion order
    pub fn tags(&self) -> Vec<AttributeTag> {
        self.attributes.iter().map(|a| a.tag.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.tag.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tags;

    fn sample() -> Vec<AttributeDefinition> {
        vec![
            AttributeDefinition::new(tags::HEALTH, 100.0, 0.0, 100.0),
            AttributeDefinition::new(tags::MANA, 50.0, 0.0, 80.0),
            AttributeDefinition::new(tags::STAMINA, 30.0, 0.0, 30.0),
        ]
    }

    #[test]
    fn test_replace_keeps_order_and_indexes() {
        let mut registry = AttributeRegistry::new();
        let dropped = registry.replace(sample());
        assert!(dropped.is_empty());
        assert_eq!(registry.tags(), vec![tags::HEALTH, tags::MANA, tags::STAMINA]);
        assert!((registry.get(&tags::MANA).unwrap().value - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_replace_drops_duplicates() {
        let mut defs = sample();
        defs.push(AttributeDefinition::new(tags::HEALTH, 1.0, 0.0, 10.0));
        let mut registry = AttributeRegistry::new();
        let dropped = registry.replace(defs);
        assert_eq!(dropped, vec![tags::HEALTH]);
        assert_eq!(registry.len(), 3);
        assert!((registry.get(&tags::HEALTH).unwrap().value - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_remove_reindexes() {
        let mut registry = AttributeRegistry::new();
        registry.replace(sample());
        let removed = registry.remove(&tags::HEALTH).unwrap();
        assert_eq!(removed.tag, tags::HEALTH);
        assert!(!registry.contains(&tags::HEALTH));
        // Later entries still resolve after the shift
        assert!((registry.get(&tags::STAMINA).unwrap().value - 30.0).abs() < f64::EPSILON);
        assert!(registry.remove(&tags::HEALTH).is_none());
    }

    #[test]
    fn test_insert_rejects_existing_tag() {
        let mut registry = AttributeRegistry::new();
        registry.replace(sample());
        assert!(!registry.insert(AttributeDefinition::new(tags::MANA, 1.0, 0.0, 1.0)));
        assert!(registry.insert(AttributeDefinition::new("Attribute.Focus", 1.0, 0.0, 1.0)));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_restore_backup_ignores_runtime_changes() {
        let mut registry = AttributeRegistry::new();
        registry.replace(sample());
        registry.get_mut(&tags::HEALTH).unwrap().value = 5.0;
        registry.insert(AttributeDefinition::new("Attribute.Focus", 1.0, 0.0, 1.0));
        registry.remove(&tags::MANA);

        registry.restore_backup();
        assert_eq!(registry.tags(), vec![tags::HEALTH, tags::MANA, tags::STAMINA]);
        assert!((registry.get(&tags::HEALTH).unwrap().value - 100.0).abs() < f64::EPSILON);
    }
}
