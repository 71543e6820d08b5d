//! Persistence Module for versioned game saves
//!
//! This module provides the save/load engine:
//! - `Serializer`: Encodes snapshots into checksummed, optionally gzipped envelopes
//! - `Migrator`: Upgrades old envelopes along the schema version chain
//! - `BackupManager`: Timestamped backups with sidecars, retention and restore
//! - `SaveManager`: Numbered slots, recovery and write-back upgrades
//! - `AutoSaveManager`: Background timer invoking a save callback
//!
//! # Architecture
//!
//! ```text
//! Save Path:
//! ┌──────────┐    ┌─────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │ snapshot │───►│ build +     │───►│ backup existing  │───►│ atomic write │
//! │ + meta   │    │ validate    │    │ "slot_overwrite" │    │ slot_NN.sav  │
//! └──────────┘    └─────────────┘    └──────────────────┘    └──────────────┘
//!
//! Load Path:
//! ┌───────────┐    ┌──────────────┐    ┌───────────────┐    ┌────────────┐
//! │ read slot │───►│ parse/verify │───►│ migrate +     │───►│ snapshot   │
//! │           │    │ checksum     │    │ write back    │    │            │
//! └───────────┘    └──────┬───────┘    └───────────────┘    └────────────┘
//!                         │ corrupted
//!                         ▼
//!                  ┌──────────────────┐
//!                  │ restore newest   │───► retry once
//!                  │ verified backup  │
//!                  └──────────────────┘
//! ```

mod autosave;
mod backup;
mod config;
mod error;
mod migration;
mod save_manager;
mod serializer;
mod stats;

pub use autosave::{AutoSaveManager, AutoSaveStatus, SaveCallback};
pub use backup::{sidecar_path, BackupManager, BackupPolicy};
pub use config::{ConfigError, QuickSavePolicy, SaveConfig, SLOT_EXTENSION};
pub use error::{
    BackupError, BackupResult, MigrationError, SaveError, SaveResult, SerializationError,
};
pub use migration::{MigrationFn, MigrationStep, Migrator};
pub use save_manager::SaveManager;
pub use serializer::Serializer;
pub use stats::{SaveStatistics, SlotStats};
