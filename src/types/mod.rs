//! Core data types for the save engine
//!
//! This module contains all the data structures used throughout the
//! application, organized by domain:
//!
//! - `snapshot`: Player/world snapshots and the combined game snapshot
//! - `envelope`: Typed and raw save envelopes
//! - `slot`: Save slot registry entries
//! - `backup`: Backup sidecars, listings and statistics

mod backup;
mod envelope;
mod slot;
mod snapshot;

pub use backup::{BackupRecord, BackupSidecar, BackupStats};
pub use envelope::{RawEnvelope, SaveEnvelope};
pub use slot::{SaveSlot, SlotMetadata};
pub use snapshot::{
    GameSnapshot, Metadata, PlayerSnapshot, WorldSnapshot, PLAYER_FIELDS, WORLD_FIELDS,
};
