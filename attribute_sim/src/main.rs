//! attribute_sim - Headless session driving attribute_core
//!
//! Usage: attribute_sim [attributes.toml] [seed] [save_dir]
//!
//! Loads an attribute set (the built-in one when no file is given), then
//! runs a fixed number of one-second steps in which a seeded RNG deals
//! damage, spends resources and applies timed modifiers. Regen and modifier
//! reverts run off the manual clock. The session ends with a save and a
//! reload through a JSON save directory.

use anyhow::Context;
use attribute_core::prelude::*;
use attribute_core::AttributeSetConfig;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_SEED: u64 = 42;
const STEPS: u32 = 30;
const STEP_SECONDS: f64 = 1.0;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,attribute_core=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AttributeSetConfig> {
    match path {
        Some(path) => attribute_core::config::load_attribute_set(path)
            .with_context(|| format!("loading attribute set from {}", path.display())),
        None => Ok(AttributeSetConfig {
            settings: EngineSettings::default(),
            attributes: default_attributes(),
        }),
    }
}

/// Session statistics collected from events
#[derive(Debug, Default)]
struct Tally {
    changes: u32,
    depletions: u32,
    thresholds: u32,
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let seed = match args.next() {
        Some(raw) => raw.parse().with_context(|| format!("invalid seed: {raw}"))?,
        None => DEFAULT_SEED,
    };
    let save_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("saves"));

    let config = load_config(config_path.as_deref())?;
    info!(
        seed,
        attributes = config.attributes.len(),
        vital = %config.settings.vital_tag,
        "Starting attribute session"
    );

    let mut system = AttributeSystem::from_config(config, ManualScheduler::new());
    let tags: Vec<AttributeTag> = system.attributes().iter().map(|a| a.tag.clone()).collect();
    if tags.is_empty() {
        anyhow::bail!("attribute set is empty");
    }

    let tally = std::sync::Arc::new(std::sync::Mutex::new(Tally::default()));
    {
        let tally = tally.clone();
        system.subscribe(move |event| {
            let Ok(mut tally) = tally.lock() else {
                return;
            };
            match event.kind() {
                EventKind::Changed => tally.changes += 1,
                EventKind::VitalDepleted => tally.depletions += 1,
                EventKind::ThresholdReached => tally.thresholds += 1,
                _ => {}
            }
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for step in 1..=STEPS {
        if rng.gen_bool(0.4) {
            let damage = rng.gen_range(5.0..30.0_f64).round();
            let vital = system.decrease_vital(damage).unwrap_or_else(|_| system.vital());
            debug!(step, damage, vital, "Vital hit");
        }

        let tag = &tags[rng.gen_range(0..tags.len())];
        if rng.gen_bool(0.3) {
            let cost = rng.gen_range(1.0..20.0_f64).round();
            system.decrease(tag, cost)?;
        }

        if rng.gen_bool(0.1) {
            let value = rng.gen_range(-20.0..20.0_f64).round();
            let duration = rng.gen_range(2.0..6.0_f64).round();
            system.apply_modifier(Modifier::timed(tag.clone(), value, duration))?;
            info!(step, tag = %tag, value, duration, "Applied timed modifier");
        }

        for tag in &tags {
            system.check_threshold(tag)?;
        }

        system.advance(STEP_SECONDS);
    }

    let mut store = JsonFileStore::new(&save_dir)
        .with_context(|| format!("opening save directory {}", save_dir.display()))?;
    let saved = system.save_default(&mut store)?;

    // A fresh system over the same set should pick up the saved values
    let mut reloaded = AttributeSystem::from_config(load_config(config_path.as_deref())?, ManualScheduler::new());
    let outcome = reloaded.load_default(&mut store);
    if outcome.snapshot() != &saved {
        warn!("Reloaded snapshot differs from the one just saved");
    }

    println!("Session summary (seed {seed}, {STEPS} steps):");
    for attr in system.attributes() {
        println!(
            "  {:<20} {:>7.1} / {:<7.1} regen: {}",
            attr.tag.as_str(),
            attr.value,
            attr.max_value,
            if system.is_regenerating(&attr.tag) { "active" } else { "idle" }
        );
    }
    if let Ok(tally) = tally.lock() {
        println!(
            "  changes: {}, thresholds: {}, vital depleted: {}",
            tally.changes, tally.thresholds, tally.depletions
        );
    }
    println!("  active modifiers: {}", system.active_modifiers().count());
    println!("{}", serde_json::to_string_pretty(outcome.snapshot())?);

    Ok(())
}
