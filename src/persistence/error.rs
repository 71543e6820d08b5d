//! Error types for the persistence layer

use std::path::PathBuf;

use thiserror::Error;

/// Failure to encode or decode a save envelope
///
/// The three kinds stay distinct so that callers can pick a recovery
/// strategy: corrupted bytes are worth restoring from a backup, a schema
/// violation of intact data is not.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializationError {
    #[error("malformed save data: {0}")]
    Malformed(String),

    #[error("checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch { stored: String, computed: String },

    #[error("schema violation for version '{version}': {fields:?}")]
    SchemaViolation { version: String, fields: Vec<String> },
}

impl SerializationError {
    /// True for damaged bytes (unparseable or checksum mismatch)
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            SerializationError::Malformed(_) | SerializationError::ChecksumMismatch { .. }
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrationError {
    #[error("unknown schema version '{0}'")]
    UnknownVersion(String),

    #[error("cannot migrate backwards from {from} to {to}")]
    Downgrade { from: String, to: String },

    #[error("no migration step registered from version {0}")]
    NoPath(String),

    #[error("migration step {from} -> {to} failed: {reason}")]
    StepFailed {
        from: String,
        to: String,
        reason: String,
    },

    #[error("migrated envelope is invalid for {version}: {fields:?}")]
    Invalid { version: String, fields: Vec<String> },
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("source file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("backup not found: {}", .0.display())]
    BackupMissing(PathBuf),

    #[error("cannot determine the original file of backup {}", .0.display())]
    UnknownOriginal(PathBuf),
}

pub type BackupResult<T> = Result<T, BackupError>;

/// Errors surfaced by `SaveManager` operations
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("slot {slot} is out of range 1..={max}")]
    InvalidSlot { slot: u32, max: u32 },

    #[error("slot {0} is empty")]
    SlotEmpty(u32),

    #[error("no free save slot")]
    NoFreeSlot,

    #[error("no game state has been published for auto-save")]
    NoGameState,

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("backup failed: {0}")]
    Backup(#[from] BackupError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SaveError {
    /// True when a load failed because the stored bytes are damaged
    pub fn is_corruption(&self) -> bool {
        matches!(self, SaveError::Serialization(e) if e.is_corruption())
    }
}

/// Result type for save manager operations
pub type SaveResult<T> = Result<T, SaveError>;
