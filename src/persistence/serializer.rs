//! Envelope serializer
//!
//! Builds and parses the versioned, checksummed save envelope.
//!
//! Write path: snapshot → envelope (version, timestamp) → checksum →
//! validate → compact JSON → optional gzip.
//!
//! Read path: gzip probe (raw fallback) → JSON → known version →
//! checksum (optional) → schema validation → typed check.

use serde::Deserialize;
use serde_json::Value;

use crate::types::{GameSnapshot, Metadata, PlayerSnapshot, RawEnvelope, SaveEnvelope, WorldSnapshot};
use crate::utils::{decode_payload, gzip, now_rfc3339};
use crate::validation::{Validator, CURRENT_VERSION};

use super::error::SerializationError;

/// Encodes game snapshots to bytes and back
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    validator: Validator,
}

impl Serializer {
    pub fn new() -> Self {
        Self::with_validator(Validator::new())
    }

    pub fn with_validator(validator: Validator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Serialize a snapshot into envelope bytes at the current version
    pub fn serialize(
        &self,
        player: &PlayerSnapshot,
        world: &WorldSnapshot,
        compress: bool,
        metadata: &Metadata,
    ) -> Result<Vec<u8>, SerializationError> {
        let envelope = self.build_envelope(player, world, metadata)?;
        self.encode_envelope(&envelope, compress)
    }

    /// Build the checksummed envelope document without encoding it
    pub fn build_envelope(
        &self,
        player: &PlayerSnapshot,
        world: &WorldSnapshot,
        metadata: &Metadata,
    ) -> Result<RawEnvelope, SerializationError> {
        let shadowed: Vec<String> = player
            .shadowed_fields()
            .into_iter()
            .map(|f| format!("player.{}", f))
            .chain(world.shadowed_fields().into_iter().map(|f| format!("world.{}", f)))
            .collect();
        if !shadowed.is_empty() {
            return Err(SerializationError::SchemaViolation {
                version: CURRENT_VERSION.to_string(),
                fields: shadowed,
            });
        }

        let envelope = SaveEnvelope {
            version: CURRENT_VERSION.to_string(),
            timestamp: now_rfc3339(),
            checksum: String::new(),
            player: player.clone(),
            world: world.clone(),
            metadata: metadata.clone(),
        };

        let document = serde_json::to_value(&envelope)
            .map_err(|e| SerializationError::Malformed(e.to_string()))?;
        let mut raw = RawEnvelope::new(document);
        let checksum = self.validator.calculate_checksum(raw.document());
        raw.set_checksum(checksum);
        Ok(raw)
    }

    /// Encode an envelope document of any known version
    ///
    /// The document is validated against its own declared version first so
    /// that nothing is written which would not deserialize again.
    pub fn encode_envelope(
        &self,
        envelope: &RawEnvelope,
        compress: bool,
    ) -> Result<Vec<u8>, SerializationError> {
        self.check_schema(envelope)?;

        let json = serde_json::to_vec(envelope.document())
            .map_err(|e| SerializationError::Malformed(e.to_string()))?;

        if compress {
            gzip(&json).map_err(|e| SerializationError::Malformed(format!("gzip failed: {}", e)))
        } else {
            Ok(json)
        }
    }

    /// Decode bytes into a validated envelope document
    pub fn parse_envelope(
        &self,
        bytes: &[u8],
        verify_integrity: bool,
    ) -> Result<RawEnvelope, SerializationError> {
        let payload = decode_payload(bytes);

        let document: Value = serde_json::from_slice(&payload)
            .map_err(|e| SerializationError::Malformed(e.to_string()))?;
        if !document.is_object() {
            return Err(SerializationError::Malformed(
                "envelope is not a JSON object".to_string(),
            ));
        }
        let envelope = RawEnvelope::new(document);

        let version = envelope.version().unwrap_or_default().to_string();
        if !self.validator.is_known_version(&version) {
            return Err(SerializationError::SchemaViolation {
                version,
                fields: vec!["version".to_string()],
            });
        }

        if verify_integrity {
            let computed = self.validator.calculate_checksum(envelope.document());
            let stored = envelope.checksum().unwrap_or_default();
            if stored != computed {
                return Err(SerializationError::ChecksumMismatch {
                    stored: stored.to_string(),
                    computed,
                });
            }
        }

        self.check_schema(&envelope)?;
        Self::check_typed(&envelope)?;
        Ok(envelope)
    }

    /// Decode bytes into a game snapshot
    pub fn deserialize(
        &self,
        bytes: &[u8],
        verify_integrity: bool,
    ) -> Result<GameSnapshot, SerializationError> {
        let envelope = self.parse_envelope(bytes, verify_integrity)?;
        Self::into_snapshot(envelope)
    }

    /// Type a validated envelope document
    pub fn into_snapshot(envelope: RawEnvelope) -> Result<GameSnapshot, SerializationError> {
        let version = envelope.version().unwrap_or_default().to_string();
        envelope
            .into_typed()
            .map(SaveEnvelope::into_snapshot)
            .map_err(|e| SerializationError::SchemaViolation {
                version,
                fields: vec![e.to_string()],
            })
    }

    // A schema-valid document must also convert, or the slot could never load
    fn check_typed(envelope: &RawEnvelope) -> Result<(), SerializationError> {
        SaveEnvelope::deserialize(envelope.document())
            .map(|_| ())
            .map_err(|e| SerializationError::SchemaViolation {
                version: envelope.version().unwrap_or_default().to_string(),
                fields: vec![e.to_string()],
            })
    }

    fn check_schema(&self, envelope: &RawEnvelope) -> Result<(), SerializationError> {
        let version = envelope.version().unwrap_or_default();
        let missing = self.validator.missing_fields(envelope.document(), version);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SerializationError::SchemaViolation {
                version: version.to_string(),
                fields: missing,
            })
        }
    }
}
