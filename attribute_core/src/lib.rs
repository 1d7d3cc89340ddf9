//! attribute_core - Engine-agnostic attribute management for game entities
//!
//! This library provides:
//! - AttributeSystem: Tagged attributes with clamped values and bounds
//! - Regeneration: Per-attribute repeating timers on a host scheduler
//! - Modifiers: Permanent and timed additive adjustments
//! - Persistence: Tag to value snapshots through a save store

pub mod attribute;
pub mod config;
pub mod error;
pub mod events;
pub mod modifier;
pub mod persistence;
pub mod prelude;
pub mod scheduler;
pub mod system;
pub mod types;

// Re-export core types for convenience
pub use attribute::{AttributeDefinition, AttributeRegistry, AttributeValues};
pub use config::{default_attributes, AttributeSetConfig, ConfigError, EngineSettings};
pub use error::{AttributeError, PersistenceError};
pub use events::{AttributeEvent, EventKind, EventRecorder, SubscriptionId};
pub use modifier::{ActiveModifier, Modifier, ModifierLedger};
pub use persistence::{AttributeSnapshot, JsonFileStore, LoadOutcome, MemoryStore, SaveStore, DEFAULT_SAVE_SLOT};
pub use scheduler::{Firing, ManualScheduler, Scheduler, TimerHandle, TimerTask, MAX_CATCH_UP_FIRINGS};
pub use system::AttributeSystem;
pub use types::{tags, AttributeTag, Operation, ValueTarget};
