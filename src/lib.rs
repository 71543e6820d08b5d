//! Savekeeper
//!
//! A versioned save/load engine for single-player games, using plain files
//! and a small synchronous stack.
//!
//! # Features
//!
//! - **Integrity**: SHA-256 checksum over canonical JSON, verified on load
//! - **Compression**: Optional gzip, detected automatically on read
//! - **Migration**: Linear schema chain with write-back upgrades
//! - **Backups**: Automatic before every destructive write, with retention
//! - **Recovery**: One bounded restore-and-retry for corrupted slots
//! - **Auto-save**: Background timer over the latest published game state
//!
//! # Modules
//!
//! - `types`: Snapshots, envelopes, slot and backup records
//! - `validation`: Schema registry, field checks and checksums
//! - `persistence`: Serializer, migrator, backups, slots and auto-save
//! - `utils`: Atomic writes, gzip probing, timestamps
//!
//! # Example
//!
//! ```no_run
//! use savekeeper::{Metadata, PlayerSnapshot, SaveConfig, SaveManager, WorldSnapshot};
//!
//! fn main() -> savekeeper::SaveResult<()> {
//!     let manager = SaveManager::new(SaveConfig::new("saves"))?;
//!
//!     let player = PlayerSnapshot::new("Hero", 100, "Village").with_gold(100);
//!     let world = WorldSnapshot::new("Village");
//!     manager.try_create_save_slot(1, &player, &world, &Metadata::new())?;
//!
//!     let snapshot = manager.try_load_save_slot(1)?;
//!     assert_eq!(snapshot.player.name, "Hero");
//!     Ok(())
//! }
//! ```

pub mod persistence;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used items at crate root
pub use persistence::{
    AutoSaveManager, BackupManager, Migrator, QuickSavePolicy, SaveConfig, SaveError,
    SaveManager, SaveResult, SaveStatistics, SerializationError, Serializer,
};
pub use types::{
    BackupRecord, GameSnapshot, Metadata, PlayerSnapshot, SaveSlot, SlotMetadata, WorldSnapshot,
};
pub use validation::{Validator, CURRENT_VERSION};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
