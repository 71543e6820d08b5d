//! Player and world snapshots
//!
//! Both snapshots are opaque to the persistence layer apart from the fields
//! the envelope schema requires. Anything else a caller stores rides along in
//! the flattened `extra` map and survives a save/load round-trip unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form key/value map attached to a save
pub type Metadata = Map<String, Value>;

/// Typed player fields; an `extra` entry may not reuse these names
pub const PLAYER_FIELDS: &[&str] = &["name", "health", "inventory", "location", "gold"];

/// Typed world fields; an `extra` entry may not reuse these names
pub const WORLD_FIELDS: &[&str] = &["current_location", "locations"];

fn shadowed(extra: &Map<String, Value>, reserved: &[&str]) -> Vec<String> {
    extra
        .keys()
        .filter(|key| reserved.contains(&key.as_str()))
        .cloned()
        .collect()
}

/// Player state as seen by the save engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub name: String,
    pub health: i64,
    #[serde(default)]
    pub inventory: Vec<Value>,
    pub location: String,
    /// Absent in 1.0 saves
    #[serde(default)]
    pub gold: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlayerSnapshot {
    /// Create a player with an empty inventory and no gold
    pub fn new(name: impl Into<String>, health: i64, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            health,
            inventory: Vec::new(),
            location: location.into(),
            gold: 0,
            extra: Map::new(),
        }
    }

    pub fn with_gold(mut self, gold: i64) -> Self {
        self.gold = gold;
        self
    }

    pub fn with_inventory(mut self, inventory: Vec<Value>) -> Self {
        self.inventory = inventory;
        self
    }

    /// Attach an extra field the save engine does not interpret
    ///
    /// Names of typed fields are ignored.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if PLAYER_FIELDS.contains(&key.as_str()) {
            log::warn!("Ignoring extra player field '{}': it names a typed field", key);
        } else {
            self.extra.insert(key, value);
        }
        self
    }

    /// Keys in `extra` that would overwrite a typed field when serialized
    pub fn shadowed_fields(&self) -> Vec<String> {
        shadowed(&self.extra, PLAYER_FIELDS)
    }
}

/// World state as seen by the save engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub current_location: String,
    /// Absent before 2.0
    #[serde(default)]
    pub locations: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorldSnapshot {
    /// Create a world whose location table contains only the current location
    pub fn new(current_location: impl Into<String>) -> Self {
        let current_location = current_location.into();
        let mut locations = Map::new();
        locations.insert(current_location.clone(), Value::Object(Map::new()));
        Self {
            current_location,
            locations,
            extra: Map::new(),
        }
    }

    pub fn with_location(mut self, name: impl Into<String>, data: Value) -> Self {
        self.locations.insert(name.into(), data);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if WORLD_FIELDS.contains(&key.as_str()) {
            log::warn!("Ignoring extra world field '{}': it names a typed field", key);
        } else {
            self.extra.insert(key, value);
        }
        self
    }

    pub fn shadowed_fields(&self) -> Vec<String> {
        shadowed(&self.extra, WORLD_FIELDS)
    }
}

/// A complete, immutable unit of saveable game state
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub player: PlayerSnapshot,
    pub world: WorldSnapshot,
    pub metadata: Metadata,
}

impl GameSnapshot {
    pub fn new(player: PlayerSnapshot, world: WorldSnapshot) -> Self {
        Self {
            player,
            world,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}
