//! Save Manager - numbered save slots
//!
//! The SaveManager owns the slot registry for one save directory and
//! orchestrates the serializer, migrator and backup manager.
//!
//! Every operation comes in two forms: `try_*` returns a [`SaveResult`], and
//! the plain form logs the failure and returns `bool`/`Option` for callers
//! that only need to know whether it worked.
//!
//! All slot operations serialize on the registry lock, so a background
//! auto-save never interleaves with a foreground save in this process.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::types::{GameSnapshot, Metadata, PlayerSnapshot, RawEnvelope, SaveSlot, SlotMetadata, WorldSnapshot};
use crate::utils::{atomic_copy, atomic_write, cleanup_temp_files, parse_rfc3339};
use crate::validation::CURRENT_VERSION;

use super::backup::BackupManager;
use super::config::{QuickSavePolicy, SaveConfig};
use super::error::{SaveError, SaveResult};
use super::migration::Migrator;
use super::serializer::Serializer;
use super::stats::{SaveStatistics, SlotStats};

#[derive(Debug, Default)]
struct SlotRegistry {
    slots: BTreeMap<u32, SaveSlot>,
    current_slot: Option<u32>,
}

/// Manages numbered save slots in one directory
pub struct SaveManager {
    config: SaveConfig,
    serializer: Serializer,
    migrator: Migrator,
    backups: BackupManager,
    registry: Mutex<SlotRegistry>,
    /// Latest published game state, read by auto-save
    game_state: RwLock<Option<Arc<GameSnapshot>>>,
}

impl SaveManager {
    /// Open (or create) the save directory described by `config`
    ///
    /// Leftover temp files are removed and existing slot files are scanned
    /// into the registry.
    pub fn new(config: SaveConfig) -> SaveResult<Self> {
        fs::create_dir_all(config.save_dir())?;
        fs::create_dir_all(config.backup_dir())?;

        let cleaned = cleanup_temp_files(config.save_dir())?;
        if cleaned > 0 {
            log::warn!("Removed {} interrupted write(s) from {}", cleaned, config.save_dir().display());
        }

        let manager = Self {
            backups: BackupManager::from_config(&config),
            serializer: Serializer::new(),
            migrator: Migrator::new(),
            registry: Mutex::new(SlotRegistry::default()),
            game_state: RwLock::new(None),
            config,
        };
        manager.refresh_slots()?;
        Ok(manager)
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    pub fn backup_manager(&self) -> &BackupManager {
        &self.backups
    }

    fn check_slot(&self, slot_id: u32) -> SaveResult<()> {
        if slot_id == 0 || slot_id > self.config.max_slots {
            return Err(SaveError::InvalidSlot {
                slot: slot_id,
                max: self.config.max_slots,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Rebuild the registry from the slot files on disk
    ///
    /// Files that do not decode are registered with `corrupted` set so they
    /// still show up in listings. Returns the number of slots found.
    pub fn refresh_slots(&self) -> SaveResult<usize> {
        let mut slots = BTreeMap::new();

        for slot_id in 1..=self.config.max_slots {
            let path = self.config.slot_path(slot_id);
            if !path.is_file() {
                continue;
            }

            let bytes = fs::read(&path)?;
            let size = bytes.len() as u64;
            let metadata = match self
                .serializer
                .parse_envelope(&bytes, self.config.verify_integrity)
            {
                Ok(envelope) => SlotMetadata::from_envelope(&envelope, size),
                Err(e) => {
                    log::warn!("Slot {} is unreadable: {}", slot_id, e);
                    SlotMetadata::corrupted(size)
                }
            };

            let mut slot = SaveSlot::new(slot_id, self.config.slot_filename(slot_id), metadata);
            if let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) {
                slot.last_accessed = DateTime::<Utc>::from(modified);
            }
            slots.insert(slot_id, slot);
        }

        let count = slots.len();
        let mut registry = self.registry.lock();
        registry.slots = slots;
        if let Some(current) = registry.current_slot {
            if !registry.slots.contains_key(&current) {
                registry.current_slot = None;
            }
        }

        log::debug!("Found {} save slot(s) in {}", count, self.config.save_dir().display());
        Ok(count)
    }

    /// All occupied slots ordered by id
    pub fn list_slots(&self) -> Vec<SaveSlot> {
        self.registry.lock().slots.values().cloned().collect()
    }

    pub fn slot_info(&self, slot_id: u32) -> Option<SaveSlot> {
        self.registry.lock().slots.get(&slot_id).cloned()
    }

    /// Slot most recently saved to or loaded from
    pub fn current_slot(&self) -> Option<u32> {
        self.registry.lock().current_slot
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Save to a slot; an existing file is backed up first
    pub fn create_save_slot(
        &self,
        slot_id: u32,
        player: &PlayerSnapshot,
        world: &WorldSnapshot,
        metadata: &Metadata,
    ) -> bool {
        match self.try_create_save_slot(slot_id, player, world, metadata) {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to save slot {}: {}", slot_id, e);
                false
            }
        }
    }

    pub fn try_create_save_slot(
        &self,
        slot_id: u32,
        player: &PlayerSnapshot,
        world: &WorldSnapshot,
        metadata: &Metadata,
    ) -> SaveResult<SaveSlot> {
        let mut registry = self.registry.lock();
        self.write_slot(&mut registry, slot_id, player, world, metadata)
    }

    fn write_slot(
        &self,
        registry: &mut SlotRegistry,
        slot_id: u32,
        player: &PlayerSnapshot,
        world: &WorldSnapshot,
        metadata: &Metadata,
    ) -> SaveResult<SaveSlot> {
        self.check_slot(slot_id)?;

        // Encode first: invalid data never gets as far as touching the slot
        let envelope = self.serializer.build_envelope(player, world, metadata)?;
        let bytes = self.serializer.encode_envelope(&envelope, self.config.compress)?;

        let path = self.config.slot_path(slot_id);
        if path.exists() {
            if let Err(e) = self.backups.create_backup(&path, "slot_overwrite") {
                log::error!("Could not back up slot {} before overwrite: {}", slot_id, e);
            }
        }

        atomic_write(&path, &bytes)?;

        let slot = SaveSlot::new(
            slot_id,
            self.config.slot_filename(slot_id),
            SlotMetadata::from_envelope(&envelope, bytes.len() as u64),
        );
        registry.slots.insert(slot_id, slot.clone());
        registry.current_slot = Some(slot_id);

        log::info!(
            "Saved slot {} ({}, {} bytes)",
            slot_id,
            player.name,
            bytes.len()
        );
        Ok(slot)
    }

    // ------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------

    /// Load a slot, upgrading and recovering it as needed
    pub fn load_save_slot(&self, slot_id: u32) -> Option<GameSnapshot> {
        match self.try_load_save_slot(slot_id) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::error!("Failed to load slot {}: {}", slot_id, e);
                None
            }
        }
    }

    /// Load a slot
    ///
    /// An old schema version is migrated and written back to the slot. A
    /// corrupted file triggers exactly one recovery attempt: the newest
    /// backup of the slot that passes verification is restored and the load
    /// is retried once.
    pub fn try_load_save_slot(&self, slot_id: u32) -> SaveResult<GameSnapshot> {
        self.check_slot(slot_id)?;
        let mut registry = self.registry.lock();

        let path = self.config.slot_path(slot_id);
        if !path.is_file() {
            return Err(SaveError::SlotEmpty(slot_id));
        }

        let envelope = match self.read_slot_envelope(&path) {
            Ok(envelope) => envelope,
            Err(e) if e.is_corruption() => {
                log::warn!("Slot {} is corrupted ({}), attempting recovery", slot_id, e);
                self.recover_slot(slot_id, &path, e)?;
                self.read_slot_envelope(&path)?
            }
            Err(e) => return Err(e),
        };

        let envelope = self.upgrade_slot(slot_id, &path, envelope);

        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or_default();
        let metadata = SlotMetadata::from_envelope(&envelope, size);
        let snapshot = Serializer::into_snapshot(envelope)?;

        registry
            .slots
            .entry(slot_id)
            .and_modify(|slot| {
                slot.cached_metadata = metadata.clone();
                slot.touch();
            })
            .or_insert_with(|| SaveSlot::new(slot_id, self.config.slot_filename(slot_id), metadata));
        registry.current_slot = Some(slot_id);

        log::info!("Loaded slot {} ({})", slot_id, snapshot.player.name);
        Ok(snapshot)
    }

    fn read_slot_envelope(&self, path: &Path) -> SaveResult<RawEnvelope> {
        let bytes = fs::read(path)?;
        Ok(self
            .serializer
            .parse_envelope(&bytes, self.config.verify_integrity)?)
    }

    /// Restore the newest verifiable backup of a slot over the damaged file
    fn recover_slot(&self, slot_id: u32, path: &Path, cause: SaveError) -> SaveResult<()> {
        let filename = self.config.slot_filename(slot_id);

        let candidates = match self.backups.list_backups(Some(&filename)) {
            Ok(candidates) => candidates,
            Err(e) => {
                log::error!("Cannot list backups for slot {}: {}", slot_id, e);
                return Err(cause);
            }
        };

        let usable = candidates.into_iter().find(|record| {
            fs::read(&record.backup_path)
                .map(|bytes| self.serializer.parse_envelope(&bytes, true).is_ok())
                .unwrap_or(false)
        });

        let Some(record) = usable else {
            log::error!("No usable backup for slot {}; leaving it untouched", slot_id);
            return Err(cause);
        };

        // Restore onto the slot being loaded; the sidecar may name an old location
        match self.backups.restore_backup_to(&record.backup_path, path, true) {
            Ok(true) => {
                log::warn!(
                    "Recovered slot {} from backup {} ({})",
                    slot_id,
                    record.backup_filename,
                    path.display()
                );
                Ok(())
            }
            Ok(false) => Err(cause),
            Err(e) => {
                log::error!("Restoring {} failed: {}", record.backup_filename, e);
                Err(cause)
            }
        }
    }

    /// Migrate an old envelope and write it back to its slot
    ///
    /// Failures are logged; the envelope is then used as it is.
    fn upgrade_slot(&self, slot_id: u32, path: &Path, envelope: RawEnvelope) -> RawEnvelope {
        if !self.migrator.is_migration_needed(&envelope, CURRENT_VERSION) {
            return envelope;
        }

        let from = envelope.version().unwrap_or_default().to_string();
        let migrated = match self.migrator.migrate(envelope.clone(), CURRENT_VERSION) {
            Ok(migrated) => migrated,
            Err(e) => {
                log::warn!("Slot {} stays at version {}: {}", slot_id, from, e);
                return envelope;
            }
        };

        if let Err(e) = self.backups.create_backup(path, "pre_migration") {
            log::warn!("Skipping write-back of slot {}: backup failed: {}", slot_id, e);
            return migrated;
        }

        let written = self
            .serializer
            .encode_envelope(&migrated, self.config.compress)
            .map_err(SaveError::from)
            .and_then(|bytes| atomic_write(path, &bytes).map_err(SaveError::from));

        match written {
            Ok(()) => log::info!("Upgraded slot {} from {} to {}", slot_id, from, CURRENT_VERSION),
            Err(e) => log::warn!("Write-back of upgraded slot {} failed: {}", slot_id, e),
        }
        migrated
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a slot after backing it up; `false` if the slot is empty
    pub fn delete_save_slot(&self, slot_id: u32) -> bool {
        match self.try_delete_save_slot(slot_id) {
            Ok(()) => true,
            Err(SaveError::SlotEmpty(_)) => {
                log::info!("Slot {} is empty, nothing to delete", slot_id);
                false
            }
            Err(e) => {
                log::error!("Failed to delete slot {}: {}", slot_id, e);
                false
            }
        }
    }

    pub fn try_delete_save_slot(&self, slot_id: u32) -> SaveResult<()> {
        self.check_slot(slot_id)?;
        let mut registry = self.registry.lock();

        let path = self.config.slot_path(slot_id);
        if !path.is_file() {
            registry.slots.remove(&slot_id);
            return Err(SaveError::SlotEmpty(slot_id));
        }

        // No backup, no delete
        self.backups.create_backup(&path, "slot_deletion")?;
        fs::remove_file(&path)?;

        registry.slots.remove(&slot_id);
        if registry.current_slot == Some(slot_id) {
            registry.current_slot = None;
        }

        log::info!("Deleted slot {}", slot_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Quick save / auto-save
    // ------------------------------------------------------------------

    /// Save to the current slot, else the first free one, else per policy
    pub fn quick_save(&self, player: &PlayerSnapshot, world: &WorldSnapshot) -> bool {
        match self.try_quick_save(player, world, &Metadata::new()) {
            Ok(_) => true,
            Err(e) => {
                log::error!("Quick save failed: {}", e);
                false
            }
        }
    }

    pub fn try_quick_save(
        &self,
        player: &PlayerSnapshot,
        world: &WorldSnapshot,
        metadata: &Metadata,
    ) -> SaveResult<SaveSlot> {
        let mut registry = self.registry.lock();
        let slot_id = self.quick_save_target(&registry)?;
        self.write_slot(&mut registry, slot_id, player, world, metadata)
    }

    fn quick_save_target(&self, registry: &SlotRegistry) -> SaveResult<u32> {
        if let Some(current) = registry.current_slot {
            return Ok(current);
        }

        let free = (1..=self.config.max_slots).find(|id| {
            !registry.slots.contains_key(id) && !self.config.slot_path(*id).exists()
        });
        if let Some(slot_id) = free {
            return Ok(slot_id);
        }

        match self.config.quick_save_policy {
            QuickSavePolicy::OverwriteFirstSlot => {
                log::warn!("All {} slots are full; quick save overwrites slot 1", self.config.max_slots);
                Ok(1)
            }
            QuickSavePolicy::RequireFreeSlot => Err(SaveError::NoFreeSlot),
        }
    }

    /// Publish the state auto-save should write next
    ///
    /// The pair is swapped in as one immutable snapshot, so a concurrent
    /// auto-save sees either the previous pair or this one.
    pub fn set_current_game_state(&self, player: PlayerSnapshot, world: WorldSnapshot) {
        self.publish_game_state(GameSnapshot::new(player, world));
    }

    pub fn publish_game_state(&self, snapshot: GameSnapshot) {
        *self.game_state.write() = Some(Arc::new(snapshot));
    }

    pub fn current_game_state(&self) -> Option<Arc<GameSnapshot>> {
        self.game_state.read().clone()
    }

    /// Quick-save the latest published game state
    pub fn auto_save(&self) -> bool {
        match self.try_auto_save() {
            Ok(slot) => {
                log::debug!("Auto-saved to slot {}", slot.slot_id);
                true
            }
            Err(e) => {
                log::warn!("Auto-save skipped: {}", e);
                false
            }
        }
    }

    pub fn try_auto_save(&self) -> SaveResult<SaveSlot> {
        let snapshot = self.current_game_state().ok_or(SaveError::NoGameState)?;

        let mut metadata = snapshot.metadata.clone();
        metadata.insert("auto_save".to_string(), Value::Bool(true));
        self.try_quick_save(&snapshot.player, &snapshot.world, &metadata)
    }

    /// Callback for `AutoSaveManager` bound to this manager
    pub fn auto_save_callback(self: &Arc<Self>) -> impl Fn() -> bool + Send + Sync + 'static {
        let manager = Arc::clone(self);
        move || manager.auto_save()
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    /// Copy a slot's file to an external path
    pub fn export_save_slot<P: AsRef<Path>>(&self, slot_id: u32, destination: P) -> bool {
        match self.try_export_save_slot(slot_id, destination.as_ref()) {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to export slot {}: {}", slot_id, e);
                false
            }
        }
    }

    pub fn try_export_save_slot(&self, slot_id: u32, destination: &Path) -> SaveResult<u64> {
        self.check_slot(slot_id)?;
        let _registry = self.registry.lock();

        let path = self.config.slot_path(slot_id);
        if !path.is_file() {
            return Err(SaveError::SlotEmpty(slot_id));
        }

        let copied = atomic_copy(&path, destination)?;
        log::info!("Exported slot {} to {}", slot_id, destination.display());
        Ok(copied)
    }

    /// Validate an external save file and install it into a slot
    pub fn import_save_slot<P: AsRef<Path>>(&self, source: P, slot_id: u32) -> bool {
        match self.try_import_save_slot(source.as_ref(), slot_id) {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to import {} into slot {}: {}", source.as_ref().display(), slot_id, e);
                false
            }
        }
    }

    pub fn try_import_save_slot(&self, source: &Path, slot_id: u32) -> SaveResult<SaveSlot> {
        self.check_slot(slot_id)?;

        let bytes = fs::read(source)?;
        let envelope = self.serializer.parse_envelope(&bytes, true)?;

        let mut registry = self.registry.lock();
        let path = self.config.slot_path(slot_id);
        if path.exists() {
            if let Err(e) = self.backups.create_backup(&path, "import_overwrite") {
                log::error!("Could not back up slot {} before import: {}", slot_id, e);
            }
        }

        atomic_write(&path, &bytes)?;

        let slot = SaveSlot::new(
            slot_id,
            self.config.slot_filename(slot_id),
            SlotMetadata::from_envelope(&envelope, bytes.len() as u64),
        );
        registry.slots.insert(slot_id, slot.clone());

        log::info!("Imported {} into slot {}", source.display(), slot_id);
        Ok(slot)
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    pub fn get_save_statistics(&self) -> SaveStatistics {
        match self.try_get_save_statistics() {
            Ok(stats) => stats,
            Err(e) => {
                log::error!("Failed to collect save statistics: {}", e);
                SaveStatistics {
                    max_slots: self.config.max_slots,
                    ..Default::default()
                }
            }
        }
    }

    pub fn try_get_save_statistics(&self) -> SaveResult<SaveStatistics> {
        let (slots, current_slot) = {
            let registry = self.registry.lock();
            let slots: Vec<SlotStats> = registry
                .slots
                .values()
                .map(|slot| SlotStats {
                    slot_id: slot.slot_id,
                    filename: slot.filename.clone(),
                    size_bytes: fs::metadata(self.config.slot_path(slot.slot_id))
                        .map(|m| m.len())
                        .unwrap_or(slot.cached_metadata.size_bytes),
                    saved_at: slot
                        .cached_metadata
                        .saved_at
                        .as_deref()
                        .and_then(parse_rfc3339),
                    last_accessed: slot.last_accessed,
                    corrupted: slot.cached_metadata.corrupted,
                })
                .collect();
            (slots, registry.current_slot)
        };

        let backups = self.backups.statistics()?;
        Ok(SaveStatistics::new(self.config.max_slots, current_slot, slots, backups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_manager() -> (SaveManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = SaveConfig {
            max_slots: 3,
            ..SaveConfig::with_data_dir(temp_dir.path())
        };
        (SaveManager::new(config).unwrap(), temp_dir)
    }

    fn player(name: &str) -> PlayerSnapshot {
        PlayerSnapshot::new(name, 100, "Village").with_gold(100)
    }

    fn world() -> WorldSnapshot {
        WorldSnapshot::new("Village").with_location("Forest", json!({"danger": 2}))
    }

    #[test]
    fn test_slot_range_is_checked() {
        let (manager, _temp_dir) = create_test_manager();

        let err = manager
            .try_create_save_slot(0, &player("A"), &world(), &Metadata::new())
            .unwrap_err();
        assert!(matches!(err, SaveError::InvalidSlot { slot: 0, max: 3 }));
        assert!(!manager.create_save_slot(4, &player("A"), &world(), &Metadata::new()));
        assert!(manager.list_slots().is_empty());
    }

    #[test]
    fn test_create_sets_current_slot_and_metadata() {
        let (manager, _temp_dir) = create_test_manager();
        let mut metadata = Metadata::new();
        metadata.insert("play_time".to_string(), json!(3600));

        let slot = manager
            .try_create_save_slot(2, &player("Kevin"), &world(), &metadata)
            .unwrap();

        assert_eq!(slot.filename, "slot_02.sav");
        assert_eq!(slot.cached_metadata.player_name, "Kevin");
        assert_eq!(slot.cached_metadata.extra.get("play_time"), Some(&json!(3600)));
        assert_eq!(manager.current_slot(), Some(2));
    }

    #[test]
    fn test_quick_save_target_order() {
        let (manager, _temp_dir) = create_test_manager();

        // No current slot: first free slot
        assert!(manager.quick_save(&player("A"), &world()));
        assert_eq!(manager.current_slot(), Some(1));

        // Current slot is reused
        assert!(manager.quick_save(&player("B"), &world()));
        assert_eq!(manager.list_slots().len(), 1);
        assert_eq!(manager.slot_info(1).unwrap().cached_metadata.player_name, "B");
    }

    #[test]
    fn test_quick_save_skips_occupied_slots() {
        let (manager, _temp_dir) = create_test_manager();
        manager.try_create_save_slot(1, &player("A"), &world(), &Metadata::new()).unwrap();
        manager.try_create_save_slot(3, &player("B"), &world(), &Metadata::new()).unwrap();
        manager.try_delete_save_slot(3).unwrap();

        // Deleting the current slot clears it
        assert_eq!(manager.current_slot(), None);

        let slot = manager.try_quick_save(&player("C"), &world(), &Metadata::new()).unwrap();
        assert_eq!(slot.slot_id, 2);
        assert_eq!(manager.slot_info(1).unwrap().cached_metadata.player_name, "A");
    }

    #[test]
    fn test_quick_save_policy_when_full() {
        let temp_dir = TempDir::new().unwrap();
        let config = SaveConfig {
            max_slots: 2,
            quick_save_policy: QuickSavePolicy::RequireFreeSlot,
            ..SaveConfig::with_data_dir(temp_dir.path())
        };
        let manager = SaveManager::new(config).unwrap();
        manager.try_create_save_slot(1, &player("A"), &world(), &Metadata::new()).unwrap();
        manager.try_create_save_slot(2, &player("B"), &world(), &Metadata::new()).unwrap();
        manager.registry.lock().current_slot = None;

        let err = manager
            .try_quick_save(&player("C"), &world(), &Metadata::new())
            .unwrap_err();
        assert!(matches!(err, SaveError::NoFreeSlot));
    }

    #[test]
    fn test_quick_save_overwrites_first_slot_when_full() {
        let temp_dir = TempDir::new().unwrap();
        let config = SaveConfig {
            max_slots: 2,
            ..SaveConfig::with_data_dir(temp_dir.path())
        };
        let manager = SaveManager::new(config).unwrap();
        manager.try_create_save_slot(1, &player("A"), &world(), &Metadata::new()).unwrap();
        manager.try_create_save_slot(2, &player("B"), &world(), &Metadata::new()).unwrap();
        manager.registry.lock().current_slot = None;

        let slot = manager.try_quick_save(&player("C"), &world(), &Metadata::new()).unwrap();
        assert_eq!(slot.slot_id, 1);

        // The overwritten save was backed up
        let backups = manager.backup_manager().list_backups(Some("slot_01.sav")).unwrap();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_auto_save_uses_published_state() {
        let (manager, _temp_dir) = create_test_manager();
        assert!(!manager.auto_save());

        manager.set_current_game_state(player("Published"), world());
        assert!(manager.auto_save());

        let slot = manager.slot_info(1).unwrap();
        assert_eq!(slot.cached_metadata.player_name, "Published");
        assert_eq!(slot.cached_metadata.extra.get("auto_save"), Some(&json!(true)));
    }

    #[test]
    fn test_published_state_is_replaced_atomically() {
        let (manager, _temp_dir) = create_test_manager();
        manager.set_current_game_state(player("First"), world());
        let held = manager.current_game_state().unwrap();

        manager.set_current_game_state(player("Second"), WorldSnapshot::new("Castle"));

        // An earlier reader keeps a consistent pair
        assert_eq!(held.player.name, "First");
        assert_eq!(held.world.current_location, "Village");

        let latest = manager.current_game_state().unwrap();
        assert_eq!(latest.player.name, "Second");
        assert_eq!(latest.world.current_location, "Castle");
    }

    #[test]
    fn test_refresh_flags_checksum_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let config = SaveConfig {
            max_slots: 3,
            compress: false,
            ..SaveConfig::with_data_dir(temp_dir.path())
        };
        let manager = SaveManager::new(config.clone()).unwrap();
        manager.try_create_save_slot(1, &player("A"), &world(), &Metadata::new()).unwrap();

        let path = config.slot_path(1);
        let mut document: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        document["player"]["gold"] = json!(5000);
        fs::write(&path, serde_json::to_vec(&document).unwrap()).unwrap();

        manager.refresh_slots().unwrap();
        assert!(manager.slot_info(1).unwrap().cached_metadata.corrupted);

        // Without verification the same file loads, so it is listed as healthy
        let lenient = SaveManager::new(SaveConfig {
            verify_integrity: false,
            ..config
        })
        .unwrap();
        assert!(!lenient.slot_info(1).unwrap().cached_metadata.corrupted);
    }

    #[test]
    fn test_failed_load_keeps_current_slot() {
        let (manager, temp_dir) = create_test_manager();
        manager.try_create_save_slot(2, &player("A"), &world(), &Metadata::new()).unwrap();
        fs::write(temp_dir.path().join("slot_03.sav"), b"garbage").unwrap();

        assert!(manager.try_load_save_slot(3).is_err());
        assert_eq!(manager.current_slot(), Some(2));
    }

    #[test]
    fn test_refresh_marks_unreadable_slots() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("slot_02.sav"), b"garbage").unwrap();
        fs::write(temp_dir.path().join("slot_03.sav.tmp"), b"partial").unwrap();

        let config = SaveConfig {
            max_slots: 3,
            ..SaveConfig::with_data_dir(temp_dir.path())
        };
        let manager = SaveManager::new(config).unwrap();

        let slots = manager.list_slots();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].slot_id, 2);
        assert!(slots[0].cached_metadata.corrupted);
        assert!(!temp_dir.path().join("slot_03.sav.tmp").exists());
    }
}
