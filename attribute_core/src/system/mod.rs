//! AttributeSystem - the live attribute set and everything that mutates it
//!
//! Every write to an attribute goes through `apply_operation` (or, for
//! snapshot restore, the same commit routine underneath it), so regen
//! bookkeeping and change events cannot be bypassed.

mod modifiers;
mod mutation;
mod persistence;
mod regen;

use crate::attribute::{AttributeDefinition, AttributeRegistry, AttributeValues};
use crate::config::{AttributeSetConfig, EngineSettings};
use crate::error::AttributeError;
use crate::events::{AttributeEvent, EventDispatcher, EventKind, SubscriptionId};
use crate::modifier::ModifierLedger;
use crate::scheduler::{ManualScheduler, Scheduler, TimerHandle, TimerTask};
use crate::types::AttributeTag;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Attribute engine bound to a host scheduler
#[derive(Debug)]
pub struct AttributeSystem<S: Scheduler = ManualScheduler> {
    registry: AttributeRegistry,
    modifiers: ModifierLedger,
    /// Live regen timer per tag; absent means Inactive
    regen_timers: HashMap<AttributeTag, TimerHandle>,
    events: EventDispatcher,
    scheduler: S,
    settings: EngineSettings,
    /// Set once `VitalDepleted` fired; cleared when the vital rises above zero
    vital_depleted: bool,
}

impl AttributeSystem<ManualScheduler> {
    /// Empty system on a manual clock
    pub fn new() -> Self {
        Self::with_scheduler(ManualScheduler::new())
    }
}

impl Default for AttributeSystem<ManualScheduler> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Scheduler> AttributeSystem<S> {
    pub fn with_scheduler(scheduler: S) -> Self {
        AttributeSystem {
            registry: AttributeRegistry::new(),
            modifiers: ModifierLedger::new(),
            regen_timers: HashMap::new(),
            events: EventDispatcher::new(),
            scheduler,
            settings: EngineSettings::default(),
            vital_depleted: false,
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build a system from a loaded attribute set
    pub fn from_config(config: AttributeSetConfig, scheduler: S) -> Self {
        let mut system = Self::with_scheduler(scheduler).with_settings(config.settings);
        system.load_definitions(config.attributes);
        system
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    // === Events ===

    pub fn subscribe(&mut self, listener: impl FnMut(&AttributeEvent) + Send + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn subscribe_kind(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&AttributeEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe_kind(kind, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn emit(&mut self, event: AttributeEvent) {
        self.events.emit(event);
    }

    // === Registry ===

    /// Replace the attribute set (and the reset backup) with `definitions`
    ///
    /// Regen timers from the previous set are cancelled. Pending modifier
    /// reverts stay scheduled for tags that survive the reload.
    pub fn load_definitions(&mut self, definitions: impl IntoIterator<Item = AttributeDefinition>) {
        self.cancel_regen_timers();

        let definitions: Vec<_> = definitions
            .into_iter()
            .map(|mut def| {
                if def.normalize() {
                    warn!(
                        "Attribute {} had inconsistent bounds, normalized to value {} in [{}, {}]",
                        def.tag, def.value, def.min_value, def.max_value
                    );
                }
                def
            })
            .collect();

        for duplicate in self.registry.replace(definitions) {
            warn!("Attribute already exists, dropping duplicate definition: {}", duplicate);
        }
        self.prune_modifiers();
        self.vital_depleted = false;

        for tag in self.registry.tags() {
            self.announce(&tag);
        }
        self.emit(AttributeEvent::Initialized);

        debug!("Loaded {} attributes", self.registry.len());
    }

    /// Add one attribute at runtime
    pub fn add_attribute(&mut self, mut definition: AttributeDefinition) -> Result<(), AttributeError> {
        if self.registry.contains(&definition.tag) {
            warn!("Attribute already exists: {}", definition.tag);
            return Err(AttributeError::DuplicateKey(definition.tag));
        }
        definition.normalize();

        let tag = definition.tag.clone();
        let initial = definition.value;
        self.registry.insert(definition);

        self.emit(AttributeEvent::Changed {
            tag: tag.clone(),
            value: initial,
        });
        self.emit(AttributeEvent::Added {
            tag: tag.clone(),
            initial,
        });
        self.evaluate_regen(&tag);

        debug!("Attribute added: {}", tag);
        Ok(())
    }

    /// Remove an attribute, cancelling its regen timer and modifier reverts
    pub fn remove_attribute(&mut self, tag: &AttributeTag) -> Result<AttributeDefinition, AttributeError> {
        let Some(removed) = self.registry.remove(tag) else {
            return Err(not_found("remove_attribute", tag));
        };

        self.stop_regen(tag);
        for entry in self.modifiers.remove_tag(tag) {
            if let Some(handle) = entry.revert_timer {
                self.scheduler.cancel(handle);
            }
        }

        self.emit(AttributeEvent::Changed {
            tag: tag.clone(),
            value: 0.0,
        });
        self.emit(AttributeEvent::Removed { tag: tag.clone() });

        debug!("Attribute removed: {}", tag);
        Ok(removed)
    }

    /// Restore every attribute to the set given to the last `load_definitions`
    ///
    /// Only regen timers are cancelled; pending modifier reverts still run.
    pub fn reset_all(&mut self) {
        self.cancel_regen_timers();
        self.registry.restore_backup();
        self.prune_modifiers();
        self.vital_depleted = false;

        for tag in self.registry.tags() {
            self.announce(&tag);
        }

        debug!("All attributes reset ({} attributes)", self.registry.len());
    }

    /// Toggle regen for one attribute and re-evaluate its timer
    pub fn set_use_regen(&mut self, tag: &AttributeTag, enabled: bool) -> Result<(), AttributeError> {
        let Some(attr) = self.registry.get_mut(tag) else {
            return Err(not_found("set_use_regen", tag));
        };
        attr.use_regen = enabled;
        self.evaluate_regen(tag);

        debug!("Attribute {} use_regen = {}", tag, enabled);
        Ok(())
    }

    pub fn attribute(&self, tag: &AttributeTag) -> Option<&AttributeDefinition> {
        self.registry.get(tag)
    }

    /// Copy of an attribute, or the empty default definition for a missing tag
    pub fn get_attribute(&self, tag: &AttributeTag) -> AttributeDefinition {
        self.registry.get(tag).cloned().unwrap_or_default()
    }

    pub fn exists(&self, tag: &AttributeTag) -> bool {
        self.registry.contains(tag)
    }

    /// Current value, 0 for a missing tag
    pub fn value(&self, tag: &AttributeTag) -> f64 {
        self.registry.get(tag).map(|a| a.value).unwrap_or(0.0)
    }

    /// Value and bounds, all zero for a missing tag
    pub fn values(&self, tag: &AttributeTag) -> AttributeValues {
        self.registry
            .get(tag)
            .map(AttributeDefinition::values)
            .unwrap_or_default()
    }

    /// All attributes in insertion order
    pub fn attributes(&self) -> &[AttributeDefinition] {
        self.registry.all()
    }

    pub fn attribute_map(&self) -> HashMap<AttributeTag, AttributeDefinition> {
        self.registry
            .all()
            .iter()
            .map(|a| (a.tag.clone(), a.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    // === Time ===

    /// Advance the scheduler and run every timer that comes due
    ///
    /// Firings are dispatched one at a time with the clock at their due
    /// time, so timers started by a firing can fire in the same call. The
    /// outcome does not depend on how the host slices `delta`.
    pub fn advance(&mut self, delta: f64) {
        let deadline = self.scheduler.deadline(delta);
        while let Some(firing) = self.scheduler.pop_due(deadline) {
            match firing.task {
                TimerTask::RegenTick(tag) => self.regen_tick(firing.handle, &tag),
                TimerTask::RevertModifier { tag, amount } => self.expire_modifier(&tag, amount),
            }
        }
        self.scheduler.settle(deadline);
    }

    /// Emit the current value of an attribute and evaluate its regen timer
    fn announce(&mut self, tag: &AttributeTag) {
        let value = self.value(tag);
        self.emit(AttributeEvent::Changed {
            tag: tag.clone(),
            value,
        });
        self.evaluate_regen(tag);
    }

    fn cancel_regen_timers(&mut self) {
        for (_, handle) in self.regen_timers.drain() {
            self.scheduler.cancel(handle);
        }
    }

    /// Drop ledger entries for tags no longer in the registry
    ///
    /// Their reverts could only ever miss, so the timers go too.
    fn prune_modifiers(&mut self) {
        let stale: Vec<_> = self
            .modifiers
            .iter()
            .map(|m| m.tag.clone())
            .filter(|tag| !self.registry.contains(tag))
            .collect();
        for tag in stale {
            for entry in self.modifiers.remove_tag(&tag) {
                if let Some(handle) = entry.revert_timer {
                    self.scheduler.cancel(handle);
                }
            }
        }
    }
}

/// Log and build a `NotFound` error
fn not_found(operation: &str, tag: &AttributeTag) -> AttributeError {
    warn!("{}: attribute not found: {}", operation, tag);
    AttributeError::NotFound(tag.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventRecorder;
    use crate::types::tags;

    fn loaded() -> (AttributeSystem, EventRecorder) {
        let mut system = AttributeSystem::new();
        let recorder = EventRecorder::new();
        system.subscribe(recorder.listener());
        system.load_definitions(vec![
            AttributeDefinition::new(tags::HEALTH, 100.0, 0.0, 100.0),
            AttributeDefinition::new(tags::MANA, 40.0, 0.0, 80.0).with_regen(1.0, 5.0),
        ]);
        (system, recorder)
    }

    #[test]
    fn test_load_emits_changes_then_initialized() {
        let (system, recorder) = loaded();
        assert_eq!(
            recorder.events(),
            vec![
                AttributeEvent::Changed {
                    tag: tags::HEALTH,
                    value: 100.0
                },
                AttributeEvent::Changed {
                    tag: tags::MANA,
                    value: 40.0
                },
                AttributeEvent::Initialized,
            ]
        );
        assert!(!system.is_regenerating(&tags::HEALTH));
        assert!(system.is_regenerating(&tags::MANA));
    }

    #[test]
    fn test_add_attribute() {
        let (mut system, recorder) = loaded();
        recorder.clear();

        system
            .add_attribute(AttributeDefinition::new(tags::STAMINA, 10.0, 0.0, 50.0))
            .unwrap();
        assert_eq!(
            recorder.events(),
            vec![
                AttributeEvent::Changed {
                    tag: tags::STAMINA,
                    value: 10.0
                },
                AttributeEvent::Added {
                    tag: tags::STAMINA,
                    initial: 10.0
                },
            ]
        );
        assert_eq!(system.len(), 3);
    }

    #[test]
    fn test_add_duplicate_is_noop() {
        let (mut system, recorder) = loaded();
        recorder.clear();

        let err = system
            .add_attribute(AttributeDefinition::new(tags::HEALTH, 1.0, 0.0, 5.0))
            .unwrap_err();
        assert!(matches!(err, AttributeError::DuplicateKey(_)));
        assert!(recorder.is_empty());
        assert!((system.value(&tags::HEALTH) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_remove_attribute() {
        let (mut system, recorder) = loaded();
        recorder.clear();

        let removed = system.remove_attribute(&tags::MANA).unwrap();
        assert_eq!(removed.tag, tags::MANA);
        assert!(!system.exists(&tags::MANA));
        assert!(!system.is_regenerating(&tags::MANA));
        assert_eq!(
            recorder.events(),
            vec![
                AttributeEvent::Changed {
                    tag: tags::MANA,
                    value: 0.0
                },
                AttributeEvent::Removed { tag: tags::MANA },
            ]
        );

        assert!(matches!(
            system.remove_attribute(&tags::MANA),
            Err(AttributeError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_lookups_are_safe_defaults() {
        let (system, _) = loaded();
        let missing = AttributeTag::from("Attribute.Missing");

        assert!(system.attribute(&missing).is_none());
        assert!(system.get_attribute(&missing).tag.is_empty());
        assert!((system.value(&missing) - 0.0).abs() < f64::EPSILON);
        assert_eq!(system.values(&missing), AttributeValues::default());
    }

    #[test]
    fn test_values_and_map() {
        let (system, _) = loaded();
        let mana = system.values(&tags::MANA);
        assert!((mana.value - 40.0).abs() < f64::EPSILON);
        assert!((mana.max - 80.0).abs() < f64::EPSILON);

        let map = system.attribute_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&tags::HEALTH].tag, tags::HEALTH);
        assert_eq!(system.attributes()[1].tag, tags::MANA);
    }

    #[test]
    fn test_reset_restores_loaded_set() {
        let (mut system, recorder) = loaded();
        system
            .apply_operation(&tags::HEALTH, 10.0, crate::Operation::Override, crate::ValueTarget::CurrentValue)
            .unwrap();
        system.remove_attribute(&tags::MANA).unwrap();
        system
            .add_attribute(AttributeDefinition::new(tags::STAMINA, 1.0, 0.0, 2.0))
            .unwrap();
        recorder.clear();

        system.reset_all();
        let tags_after: Vec<_> = system.attributes().iter().map(|a| a.tag.clone()).collect();
        assert_eq!(tags_after, vec![tags::HEALTH, tags::MANA]);
        assert!((system.value(&tags::HEALTH) - 100.0).abs() < f64::EPSILON);
        assert!(system.is_regenerating(&tags::MANA));
        assert_eq!(recorder.count(EventKind::Changed), 2);
        assert_eq!(recorder.count(EventKind::Initialized), 0);
    }

    #[test]
    fn test_load_normalizes_and_dedups() {
        let mut system = AttributeSystem::new();
        system.load_definitions(vec![
            AttributeDefinition::new(tags::HEALTH, 150.0, 0.0, 100.0),
            AttributeDefinition::new(tags::HEALTH, 5.0, 0.0, 10.0),
        ]);
        assert_eq!(system.len(), 1);
        assert!((system.value(&tags::HEALTH) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_use_regen_toggles_timer() {
        let (mut system, _) = loaded();
        system.set_use_regen(&tags::MANA, false).unwrap();
        assert!(!system.is_regenerating(&tags::MANA));

        system.set_use_regen(&tags::MANA, true).unwrap();
        assert!(system.is_regenerating(&tags::MANA));

        // Health is full, so enabling regen does not start a timer
        system.set_use_regen(&tags::HEALTH, true).unwrap();
        assert!(!system.is_regenerating(&tags::HEALTH));

        assert!(system
            .set_use_regen(&AttributeTag::from("Attribute.Missing"), true)
            .is_err());
    }

    #[test]
    fn test_advance_is_independent_of_step_size() {
        let run = |steps: &[f64]| {
            let mut system = AttributeSystem::new();
            system.load_definitions(vec![
                AttributeDefinition::new(tags::HEALTH, 90.0, 0.0, 100.0).with_regen(1.0, 10.0)
            ]);
            system
                .apply_modifier(crate::Modifier::timed(tags::HEALTH, 5.0, 5.0))
                .unwrap();
            for &step in steps {
                system.advance(step);
            }
            (system.value(&tags::HEALTH), system.is_regenerating(&tags::HEALTH))
        };

        let coarse = run(&[10.0][..]);
        let fine = run(&[1.0; 10][..]);
        assert_eq!(coarse, fine);
        assert_eq!(coarse, (100.0, false));
    }

    #[test]
    fn test_timer_started_by_a_firing_runs_in_the_same_advance() {
        let mut system = AttributeSystem::new();
        system.load_definitions(vec![
            AttributeDefinition::new(tags::MANA, 100.0, 0.0, 100.0).with_regen(1.0, 10.0)
        ]);
        system
            .apply_modifier(crate::Modifier::timed(tags::MANA, 30.0, 2.0))
            .unwrap();

        // Revert at 2.0 drops Mana to 70 and starts regen; ticks at 3.0 and 4.0
        system.advance(4.0);
        assert!((system.value(&tags::MANA) - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_finite_advance_is_ignored() {
        let (mut system, _) = loaded();
        system.advance(f64::INFINITY);
        system.advance(f64::NAN);
        assert!((system.value(&tags::MANA) - 40.0).abs() < f64::EPSILON);
        assert!((system.scheduler().now() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_config() {
        let config = crate::config::parse_attribute_set(
            r#"
[settings]
vital_tag = "Attribute.Shield"

[[attributes]]
tag = "Attribute.Shield"
value = 30
max_value = 30
"#,
        )
        .unwrap();
        let system = AttributeSystem::from_config(config, ManualScheduler::new());
        assert_eq!(system.settings().vital_tag.as_str(), "Attribute.Shield");
        assert!((system.vital() - 30.0).abs() < f64::EPSILON);
    }
}
