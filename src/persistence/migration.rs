//! Schema migration for save envelopes
//!
//! Old envelopes are upgraded by walking a linear chain of version steps:
//! 1. Look up the step whose source is the envelope's current version
//! 2. Apply it and stamp the step's target version
//! 3. Repeat until the requested version is reached
//! 4. Recalculate the checksum and validate against the target schema

use serde_json::{Map, Value};

use crate::types::RawEnvelope;
use crate::validation::{Validator, CURRENT_VERSION, SCHEMA_CHAIN};

use super::error::MigrationError;

/// Transform applied to the top-level envelope object for one version step
pub type MigrationFn = fn(&mut Map<String, Value>) -> Result<(), String>;

/// A single `from -> to` step of the chain
#[derive(Debug, Clone)]
pub struct MigrationStep {
    pub from: &'static str,
    pub to: &'static str,
    pub apply: MigrationFn,
}

/// Upgrades envelopes to a newer schema version
#[derive(Debug, Clone)]
pub struct Migrator {
    validator: Validator,
    steps: Vec<MigrationStep>,
}

impl Migrator {
    /// Migrator with the built-in steps for every version in the chain
    pub fn new() -> Self {
        Self::with_steps(
            Validator::new(),
            vec![
                MigrationStep {
                    from: "1.0",
                    to: "1.1",
                    apply: add_gold_and_metadata,
                },
                MigrationStep {
                    from: "1.1",
                    to: "2.0",
                    apply: add_location_table,
                },
            ],
        )
    }

    pub fn with_steps(validator: Validator, steps: Vec<MigrationStep>) -> Self {
        Self { validator, steps }
    }

    /// Versions reachable through the chain, oldest first
    pub fn chain(&self) -> Vec<&'static str> {
        let mut chain: Vec<&'static str> = Vec::with_capacity(self.steps.len() + 1);
        if let Some(first) = self.steps.first() {
            chain.push(first.from);
        }
        chain.extend(self.steps.iter().map(|s| s.to));
        chain
    }

    /// Whether `envelope` is at a different version than `target_version`
    pub fn is_migration_needed(&self, envelope: &RawEnvelope, target_version: &str) -> bool {
        envelope.version() != Some(target_version)
    }

    /// Convenience for migrating to [`CURRENT_VERSION`]
    pub fn migrate_to_current(&self, envelope: RawEnvelope) -> Result<RawEnvelope, MigrationError> {
        self.migrate(envelope, CURRENT_VERSION)
    }

    /// Apply chained steps until `target_version` is reached
    ///
    /// An envelope already at `target_version` is returned untouched.
    pub fn migrate(
        &self,
        mut envelope: RawEnvelope,
        target_version: &str,
    ) -> Result<RawEnvelope, MigrationError> {
        let source = envelope.version().unwrap_or_default().to_string();
        if source == target_version {
            return Ok(envelope);
        }

        let source_pos = chain_position(&source)
            .ok_or_else(|| MigrationError::UnknownVersion(source.clone()))?;
        let target_pos = chain_position(target_version)
            .ok_or_else(|| MigrationError::UnknownVersion(target_version.to_string()))?;
        if target_pos < source_pos {
            return Err(MigrationError::Downgrade {
                from: source,
                to: target_version.to_string(),
            });
        }

        let mut current = source;
        // Each step advances one link, so the chain length bounds the loop
        for _ in 0..self.steps.len() {
            if current == target_version {
                break;
            }
            let step = self
                .steps
                .iter()
                .find(|s| s.from == current)
                .ok_or_else(|| MigrationError::NoPath(current.clone()))?;

            let fields = envelope.fields_mut().ok_or_else(|| MigrationError::StepFailed {
                from: step.from.to_string(),
                to: step.to.to_string(),
                reason: "envelope is not an object".to_string(),
            })?;
            (step.apply)(fields).map_err(|reason| MigrationError::StepFailed {
                from: step.from.to_string(),
                to: step.to.to_string(),
                reason,
            })?;
            envelope.set_version(step.to);

            log::debug!("Migrated envelope {} -> {}", step.from, step.to);
            current = step.to.to_string();
        }

        if current != target_version {
            return Err(MigrationError::NoPath(current));
        }

        let checksum = self.validator.calculate_checksum(envelope.document());
        envelope.set_checksum(checksum);

        let missing = self.validator.missing_fields(envelope.document(), target_version);
        if !missing.is_empty() {
            return Err(MigrationError::Invalid {
                version: target_version.to_string(),
                fields: missing,
            });
        }

        Ok(envelope)
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

fn chain_position(version: &str) -> Option<usize> {
    SCHEMA_CHAIN.iter().position(|v| *v == version)
}

/// 1.0 -> 1.1: players gain a gold balance, envelopes a metadata map
fn add_gold_and_metadata(envelope: &mut Map<String, Value>) -> Result<(), String> {
    let player = envelope
        .get_mut("player")
        .and_then(Value::as_object_mut)
        .ok_or("player is not an object")?;
    player.entry("gold").or_insert(Value::from(0));

    envelope
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    Ok(())
}

/// 1.1 -> 2.0: worlds gain a location table seeded with the current location
fn add_location_table(envelope: &mut Map<String, Value>) -> Result<(), String> {
    let world = envelope
        .get_mut("world")
        .and_then(Value::as_object_mut)
        .ok_or("world is not an object")?;

    if !world.contains_key("locations") {
        let current = world
            .get("current_location")
            .and_then(Value::as_str)
            .ok_or("world.current_location is missing")?
            .to_string();
        let mut locations = Map::new();
        locations.insert(current, Value::Object(Map::new()));
        world.insert("locations".to_string(), Value::Object(locations));
    }
    Ok(())
}
