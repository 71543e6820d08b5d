//! Save slot registry entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::envelope::RawEnvelope;
use super::snapshot::Metadata;

/// Display data cached for a slot so listings need no file reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotMetadata {
    pub player_name: String,
    pub location: String,
    pub health: i64,
    pub gold: i64,
    /// Envelope timestamp of the save
    pub saved_at: Option<String>,
    pub version: Option<String>,
    pub size_bytes: u64,
    /// Set when the slot file could not be decoded during a directory scan
    #[serde(default)]
    pub corrupted: bool,
    /// Caller-supplied metadata stored with the save
    #[serde(default)]
    pub extra: Metadata,
}

impl SlotMetadata {
    /// Derive display data from a decoded envelope of any version
    pub fn from_envelope(envelope: &RawEnvelope, size_bytes: u64) -> Self {
        let text = |key: &str| {
            envelope
                .player_field(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let number = |key: &str| {
            envelope
                .player_field(key)
                .and_then(|v| v.as_i64())
                .unwrap_or_default()
        };

        Self {
            player_name: text("name"),
            location: text("location"),
            health: number("health"),
            gold: number("gold"),
            saved_at: envelope.timestamp().map(str::to_string),
            version: envelope.version().map(str::to_string),
            size_bytes,
            corrupted: false,
            extra: envelope.metadata().cloned().unwrap_or_default(),
        }
    }

    /// Placeholder for a slot file that exists but does not decode
    pub fn corrupted(size_bytes: u64) -> Self {
        Self {
            size_bytes,
            corrupted: true,
            ..Default::default()
        }
    }
}

/// A numbered, persistent save location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSlot {
    pub slot_id: u32,
    pub filename: String,
    pub cached_metadata: SlotMetadata,
    pub last_accessed: DateTime<Utc>,
}

impl SaveSlot {
    pub fn new(slot_id: u32, filename: impl Into<String>, cached_metadata: SlotMetadata) -> Self {
        Self {
            slot_id,
            filename: filename.into(),
            cached_metadata,
            last_accessed: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_from_envelope() {
        let envelope = RawEnvelope::new(json!({
            "version": "2.0",
            "timestamp": "2024-05-01T10:00:00+00:00",
            "checksum": "x",
            "player": {"name": "Kevin", "health": 80, "inventory": [], "location": "Village", "gold": 12},
            "world": {"current_location": "Village", "locations": {}},
            "metadata": {"description": "before the boss"}
        }));

        let meta = SlotMetadata::from_envelope(&envelope, 321);

        assert_eq!(meta.player_name, "Kevin");
        assert_eq!(meta.location, "Village");
        assert_eq!(meta.health, 80);
        assert_eq!(meta.gold, 12);
        assert_eq!(meta.version.as_deref(), Some("2.0"));
        assert_eq!(meta.size_bytes, 321);
        assert_eq!(meta.extra.get("description"), Some(&json!("before the boss")));
        assert!(!meta.corrupted);
    }

    #[test]
    fn test_corrupted_placeholder() {
        let meta = SlotMetadata::corrupted(10);
        assert!(meta.corrupted);
        assert!(meta.player_name.is_empty());
    }
}
