//! Save envelope types
//!
//! [`SaveEnvelope`] is the typed envelope of the current schema version.
//! [`RawEnvelope`] is the same document held as JSON, which is how envelopes
//! of older versions are validated and migrated before they can be typed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::snapshot::{GameSnapshot, Metadata, PlayerSnapshot, WorldSnapshot};

/// Versioned wrapper holding payload, checksum and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveEnvelope {
    pub version: String,
    pub timestamp: String,
    pub checksum: String,
    pub player: PlayerSnapshot,
    pub world: WorldSnapshot,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SaveEnvelope {
    pub fn into_snapshot(self) -> GameSnapshot {
        GameSnapshot {
            player: self.player,
            world: self.world,
            metadata: self.metadata,
        }
    }
}

/// An envelope document of any schema version
#[derive(Debug, Clone, PartialEq)]
pub struct RawEnvelope {
    document: Value,
}

impl RawEnvelope {
    pub fn new(document: Value) -> Self {
        Self { document }
    }

    /// Declared schema version, if the document has one
    pub fn version(&self) -> Option<&str> {
        self.document.get("version").and_then(Value::as_str)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.document.get("timestamp").and_then(Value::as_str)
    }

    pub fn checksum(&self) -> Option<&str> {
        self.document.get("checksum").and_then(Value::as_str)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Value {
        &mut self.document
    }

    /// Top-level object, if the document is one
    pub fn fields_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.document.as_object_mut()
    }

    pub fn set_version(&mut self, version: &str) {
        self.set_field("version", Value::String(version.to_string()));
    }

    pub fn set_checksum(&mut self, checksum: String) {
        self.set_field("checksum", Value::String(checksum));
    }

    fn set_field(&mut self, key: &str, value: Value) {
        if let Some(fields) = self.document.as_object_mut() {
            fields.insert(key.to_string(), value);
        }
    }

    /// Read-only view of a player field, used for slot display data
    pub fn player_field(&self, key: &str) -> Option<&Value> {
        self.document.get("player").and_then(|p| p.get(key))
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.document.get("metadata").and_then(Value::as_object)
    }

    /// Convert into the typed envelope
    ///
    /// Fields introduced after the document's version take their serde
    /// defaults, so a validated older envelope still converts.
    pub fn into_typed(self) -> Result<SaveEnvelope, serde_json::Error> {
        serde_json::from_value(self.document)
    }

    pub fn into_document(self) -> Value {
        self.document
    }
}

impl From<Value> for RawEnvelope {
    fn from(document: Value) -> Self {
        Self::new(document)
    }
}
