//! Backup management
//!
//! Provides functionality for:
//! - Copying a file to a timestamped backup with a `.meta.json` sidecar
//! - Listing backups newest-first, optionally per source file
//! - Restoring a backup (backing up the file it replaces first)
//! - Retention: a per-file count limit and a maximum age, applied after
//!   every new backup of that file
//!
//! Backup names are `<stem>_backup_<YYYYmmdd_HHMMSS_micros>[_<reason>].<ext>`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::{BackupRecord, BackupSidecar, BackupStats};
use crate::utils::{
    age_days, atomic_copy, atomic_write, backup_timestamp, decode_payload, parse_backup_timestamp,
};

use super::config::SaveConfig;
use super::error::{BackupError, BackupResult};

const BACKUP_MARKER: &str = "_backup_";
const SIDECAR_SUFFIX: &str = ".meta.json";
/// Length of a rendered backup timestamp, e.g. `20240309_140559_000123`
const TIMESTAMP_LEN: usize = 22;
/// Fields a backup must carry to count as restorable
const REQUIRED_TOP_LEVEL: &[&str] = &["version", "timestamp", "checksum", "player", "world"];

/// Where backups live and how long they are kept
#[derive(Debug, Clone, PartialEq)]
pub struct BackupPolicy {
    pub backup_dir: PathBuf,
    /// Directory originals are restored into when a sidecar has no full path
    pub source_dir: PathBuf,
    pub max_backups_per_file: usize,
    pub max_age_days: u32,
}

impl BackupPolicy {
    pub fn from_config(config: &SaveConfig) -> Self {
        Self {
            backup_dir: config.backup_dir(),
            source_dir: config.save_dir.clone(),
            max_backups_per_file: config.max_backups_per_file,
            max_age_days: config.max_backup_age_days,
        }
    }
}

/// Creates, lists, restores and prunes backups in one directory
pub struct BackupManager {
    policy: BackupPolicy,
}

impl BackupManager {
    pub fn new(policy: BackupPolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &SaveConfig) -> Self {
        Self::new(BackupPolicy::from_config(config))
    }

    pub fn policy(&self) -> &BackupPolicy {
        &self.policy
    }

    pub fn backup_dir(&self) -> &Path {
        &self.policy.backup_dir
    }

    /// Copy `source` into the backup directory and record why
    ///
    /// Returns the path of the new backup. Retention for `source` runs
    /// afterwards; its failures are logged, never returned.
    pub fn create_backup<P: AsRef<Path>>(&self, source: P, reason: &str) -> BackupResult<PathBuf> {
        self.create_backup_protecting(source.as_ref(), reason, None)
    }

    fn create_backup_protecting(
        &self,
        source: &Path,
        reason: &str,
        protect: Option<&Path>,
    ) -> BackupResult<PathBuf> {
        if !source.is_file() {
            return Err(BackupError::SourceMissing(source.to_path_buf()));
        }
        fs::create_dir_all(&self.policy.backup_dir)?;

        let original_file = file_name_of(source);
        let now = Utc::now();
        let backup_path = self.unique_backup_path(source, &now, reason);

        let original_size = fs::metadata(source)?.len();
        let backup_size = atomic_copy(source, &backup_path)?;

        let sidecar = BackupSidecar {
            original_file: original_file.clone(),
            original_path: Some(source.to_path_buf()),
            backup_time: now,
            backup_reason: reason.to_string(),
            original_size,
            backup_size,
        };
        atomic_write(sidecar_path(&backup_path), &serde_json::to_vec_pretty(&sidecar)?)?;

        log::info!(
            "Backed up {} to {} ({})",
            original_file,
            backup_path.display(),
            reason
        );

        if let Err(e) = self.enforce_retention(&original_file, protect) {
            log::warn!("Backup retention for {} failed: {}", original_file, e);
        }

        Ok(backup_path)
    }

    fn unique_backup_path(&self, source: &Path, now: &DateTime<Utc>, reason: &str) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let reason = sanitize_reason(reason);
        let reason_tag = if reason.is_empty() {
            String::new()
        } else {
            format!("_{}", reason)
        };
        let timestamp = backup_timestamp(now);

        let mut counter = 0u32;
        loop {
            let stamp = if counter == 0 {
                timestamp.clone()
            } else {
                format!("{}-{}", timestamp, counter)
            };
            let candidate = self.policy.backup_dir.join(format!(
                "{}{}{}{}{}",
                stem, BACKUP_MARKER, stamp, reason_tag, extension
            ));
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    /// List backups newest-first, optionally only those of one original file
    pub fn list_backups(&self, original_file: Option<&str>) -> BackupResult<Vec<BackupRecord>> {
        let dir = &self.policy.backup_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut records = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = file_name_of(&path);

            if !path.is_file()
                || name.ends_with(SIDECAR_SUFFIX)
                || name.ends_with(".tmp")
                || !name.contains(BACKUP_MARKER)
            {
                continue;
            }

            let Some(record) = self.read_record(&path, &name, &now) else {
                log::debug!("Skipping unrecognized file in backup dir: {}", name);
                continue;
            };

            if original_file.map_or(true, |f| record.original_file == f) {
                records.push(record);
            }
        }

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.backup_filename.cmp(&a.backup_filename))
        });

        Ok(records)
    }

    fn read_record(&self, path: &Path, name: &str, now: &DateTime<Utc>) -> Option<BackupRecord> {
        let size_bytes = fs::metadata(path).ok()?.len();

        let (original_file, reason, created_at, has_sidecar) = match read_sidecar(path) {
            Some(sidecar) => (
                sidecar.original_file,
                sidecar.backup_reason,
                sidecar.backup_time,
                true,
            ),
            None => {
                let parsed = parse_backup_name(name)?;
                let created_at = parsed
                    .timestamp
                    .or_else(|| modified_time(path))
                    .unwrap_or(*now);
                (
                    parsed.original_file,
                    parsed.reason.unwrap_or_else(|| "unknown".to_string()),
                    created_at,
                    false,
                )
            }
        };

        Some(BackupRecord {
            backup_filename: name.to_string(),
            backup_path: path.to_path_buf(),
            original_file,
            reason,
            created_at,
            size_bytes,
            age_days: age_days(&created_at, now),
            has_sidecar,
        })
    }

    /// Most recent backup of `original_file`
    pub fn latest_backup_for(&self, original_file: &str) -> BackupResult<Option<BackupRecord>> {
        Ok(self.list_backups(Some(original_file))?.into_iter().next())
    }

    /// Apply the count and age limits to the backups of `original_file`
    ///
    /// Returns the number of backups deleted. `protect` is never deleted.
    pub fn enforce_retention(
        &self,
        original_file: &str,
        protect: Option<&Path>,
    ) -> BackupResult<usize> {
        let records = self.list_backups(Some(original_file))?;
        let max_age = f64::from(self.policy.max_age_days);
        let mut deleted = 0;

        for (index, record) in records.iter().enumerate() {
            let over_count = index >= self.policy.max_backups_per_file;
            let too_old = record.age_days > max_age;
            if !(over_count || too_old) {
                continue;
            }
            if protect.map_or(false, |p| same_file(p, &record.backup_path)) {
                continue;
            }

            self.delete_backup(&record.backup_path)?;
            deleted += 1;
            log::info!(
                "Pruned backup {} ({})",
                record.backup_filename,
                if too_old { "expired" } else { "over limit" }
            );
        }

        Ok(deleted)
    }

    /// Delete a backup and its sidecar
    pub fn delete_backup<P: AsRef<Path>>(&self, backup: P) -> BackupResult<()> {
        let path = self.resolve_backup_path(backup.as_ref());
        if !path.exists() {
            return Err(BackupError::BackupMissing(path));
        }
        fs::remove_file(&path)?;

        let sidecar = sidecar_path(&path);
        if sidecar.exists() {
            fs::remove_file(sidecar)?;
        }
        Ok(())
    }

    /// Restore a backup over its original file
    ///
    /// Returns `Ok(false)` if the original exists and `overwrite_existing` is
    /// not set. An existing original is itself backed up (`pre_restore`)
    /// before it is replaced; if that fails, nothing is restored.
    pub fn restore_backup<P: AsRef<Path>>(
        &self,
        backup: P,
        overwrite_existing: bool,
    ) -> BackupResult<bool> {
        let backup_path = self.resolve_backup_path(backup.as_ref());
        if !backup_path.is_file() {
            return Err(BackupError::BackupMissing(backup_path));
        }

        let target = self.restore_target(&backup_path)?;
        self.restore_backup_to(&backup_path, &target, overwrite_existing)
    }

    /// Restore a backup onto an explicit target path
    ///
    /// Same rules as [`restore_backup`](Self::restore_backup), without
    /// consulting the sidecar for where the original lived.
    pub fn restore_backup_to<P, Q>(
        &self,
        backup: P,
        target: Q,
        overwrite_existing: bool,
    ) -> BackupResult<bool>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let backup_path = self.resolve_backup_path(backup.as_ref());
        if !backup_path.is_file() {
            return Err(BackupError::BackupMissing(backup_path));
        }
        let target = target.as_ref();

        if target.exists() {
            if !overwrite_existing {
                log::warn!(
                    "Refusing to restore {} over existing {}",
                    backup_path.display(),
                    target.display()
                );
                return Ok(false);
            }
            self.create_backup_protecting(target, "pre_restore", Some(&backup_path))?;
        }

        atomic_copy(&backup_path, target)?;
        log::info!(
            "Restored {} to {}",
            file_name_of(&backup_path),
            target.display()
        );
        Ok(true)
    }

    /// Path a backup would be restored to
    ///
    /// The sidecar's recorded path is used only while its directory still
    /// exists; otherwise the original file name resolves in the source
    /// directory.
    pub fn restore_target(&self, backup_path: &Path) -> BackupResult<PathBuf> {
        if let Some(sidecar) = read_sidecar(backup_path) {
            let recorded = sidecar
                .original_path
                .filter(|path| path.parent().map_or(false, Path::is_dir));
            return Ok(match recorded {
                Some(path) => path,
                None => self.policy.source_dir.join(sidecar.original_file),
            });
        }

        let name = file_name_of(backup_path);
        parse_backup_name(&name)
            .map(|parsed| self.policy.source_dir.join(parsed.original_file))
            .ok_or_else(|| BackupError::UnknownOriginal(backup_path.to_path_buf()))
    }

    /// Check that a backup decodes and carries the top-level envelope fields
    ///
    /// Checksums are not verified here; that happens when the restored file
    /// is loaded.
    pub fn verify_backup_integrity<P: AsRef<Path>>(&self, backup: P) -> bool {
        let path = self.resolve_backup_path(backup.as_ref());
        let Ok(bytes) = fs::read(&path) else {
            return false;
        };

        let payload = decode_payload(&bytes);
        match serde_json::from_slice::<Value>(&payload) {
            Ok(Value::Object(fields)) => REQUIRED_TOP_LEVEL.iter().all(|f| fields.contains_key(*f)),
            _ => false,
        }
    }

    /// Totals over every backup in the directory
    pub fn statistics(&self) -> BackupResult<BackupStats> {
        let records = self.list_backups(None)?;
        Ok(BackupStats {
            total_backups: records.len(),
            total_size_bytes: records.iter().map(|r| r.size_bytes).sum(),
            oldest: records.iter().map(|r| r.created_at).min(),
            newest: records.iter().map(|r| r.created_at).max(),
        })
    }

    /// Bare file names resolve inside the backup directory
    fn resolve_backup_path(&self, backup: &Path) -> PathBuf {
        let bare = backup
            .parent()
            .map_or(true, |p| p.as_os_str().is_empty());
        if bare {
            self.policy.backup_dir.join(backup)
        } else {
            backup.to_path_buf()
        }
    }
}

/// Sidecar path for a backup: extension replaced by `.meta.json`
pub fn sidecar_path(backup_path: &Path) -> PathBuf {
    backup_path.with_extension("meta.json")
}

fn read_sidecar(backup_path: &Path) -> Option<BackupSidecar> {
    let content = fs::read(sidecar_path(backup_path)).ok()?;
    match serde_json::from_slice(&content) {
        Ok(sidecar) => Some(sidecar),
        Err(e) => {
            log::warn!(
                "Unreadable sidecar for {}: {}",
                backup_path.display(),
                e
            );
            None
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn modified_time(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Reduce a free-form reason to `[a-z0-9_]`
fn sanitize_reason(reason: &str) -> String {
    let mapped: String = reason
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    mapped.trim_matches('_').to_string()
}

/// Pieces recovered from a backup filename
#[derive(Debug, Clone, PartialEq)]
struct ParsedBackupName {
    original_file: String,
    timestamp: Option<DateTime<Utc>>,
    reason: Option<String>,
}

fn parse_backup_name(name: &str) -> Option<ParsedBackupName> {
    let marker = name.find(BACKUP_MARKER)?;
    let stem = &name[..marker];
    let rest = &name[marker + BACKUP_MARKER.len()..];

    let (body, extension) = match Path::new(rest).extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().into_owned();
            (&rest[..rest.len() - ext.len() - 1], Some(ext))
        }
        None => (rest, None),
    };

    let original_file = match &extension {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem.to_string(),
    };

    let timestamp = body
        .get(..TIMESTAMP_LEN)
        .and_then(parse_backup_timestamp);

    let reason = body.get(TIMESTAMP_LEN..).and_then(|tail| {
        // Skip an optional "-<n>" collision counter
        let tail = tail.trim_start_matches(|c: char| c == '-' || c.is_ascii_digit());
        let tail = tail.trim_start_matches('_');
        (!tail.is_empty()).then(|| tail.to_string())
    });

    Some(ParsedBackupName {
        original_file,
        timestamp,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    const ENVELOPE: &str = r#"{"version":"2.0","timestamp":"t","checksum":"c","player":{},"world":{}}"#;

    fn create_test_manager(max_backups: usize) -> (BackupManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let policy = BackupPolicy {
            backup_dir: temp_dir.path().join("backups"),
            source_dir: temp_dir.path().to_path_buf(),
            max_backups_per_file: max_backups,
            max_age_days: 30,
        };
        (BackupManager::new(policy), temp_dir)
    }

    fn write_source(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn age_sidecar(backup: &Path, days: i64) {
        let path = sidecar_path(backup);
        let mut sidecar: BackupSidecar = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        sidecar.backup_time = sidecar.backup_time - Duration::days(days);
        fs::write(&path, serde_json::to_vec(&sidecar).unwrap()).unwrap();
    }

    #[test]
    fn test_create_backup_names_and_sidecar() {
        let (manager, temp_dir) = create_test_manager(5);
        let source = write_source(&temp_dir, "slot_01.sav", ENVELOPE);

        let backup = manager.create_backup(&source, "slot_overwrite").unwrap();

        let name = file_name_of(&backup);
        assert!(name.starts_with("slot_01_backup_"), "{}", name);
        assert!(name.ends_with("_slot_overwrite.sav"), "{}", name);
        assert_eq!(fs::read_to_string(&backup).unwrap(), ENVELOPE);

        let sidecar = read_sidecar(&backup).unwrap();
        assert_eq!(sidecar.original_file, "slot_01.sav");
        assert_eq!(sidecar.backup_reason, "slot_overwrite");
        assert_eq!(sidecar.original_size, ENVELOPE.len() as u64);
        assert_eq!(sidecar.backup_size, ENVELOPE.len() as u64);
        assert!(file_name_of(&sidecar_path(&backup)).ends_with("_slot_overwrite.meta.json"));
    }

    #[test]
    fn test_create_backup_of_missing_source() {
        let (manager, temp_dir) = create_test_manager(5);
        let err = manager
            .create_backup(temp_dir.path().join("nope.sav"), "manual")
            .unwrap_err();
        assert!(matches!(err, BackupError::SourceMissing(_)));
    }

    #[test]
    fn test_list_backups_newest_first_and_filtered() {
        let (manager, temp_dir) = create_test_manager(10);
        let slot1 = write_source(&temp_dir, "slot_01.sav", ENVELOPE);
        let slot2 = write_source(&temp_dir, "slot_02.sav", ENVELOPE);

        let first = manager.create_backup(&slot1, "one").unwrap();
        let second = manager.create_backup(&slot1, "two").unwrap();
        manager.create_backup(&slot2, "other").unwrap();

        let all = manager.list_backups(None).unwrap();
        assert_eq!(all.len(), 3);

        let slot1_backups = manager.list_backups(Some("slot_01.sav")).unwrap();
        assert_eq!(slot1_backups.len(), 2);
        assert_eq!(slot1_backups[0].backup_path, second);
        assert_eq!(slot1_backups[1].backup_path, first);
        assert_eq!(slot1_backups[0].reason, "two");
        assert!(slot1_backups.iter().all(|r| r.has_sidecar));
    }

    #[test]
    fn test_retention_keeps_most_recent() {
        let (manager, temp_dir) = create_test_manager(3);
        let source = write_source(&temp_dir, "slot_01.sav", ENVELOPE);

        let mut created = Vec::new();
        for i in 0..5 {
            created.push(manager.create_backup(&source, &format!("save {}", i)).unwrap());
        }

        let remaining = manager.list_backups(Some("slot_01.sav")).unwrap();
        let remaining: Vec<PathBuf> = remaining.into_iter().map(|r| r.backup_path).collect();
        assert_eq!(remaining, vec![created[4].clone(), created[3].clone(), created[2].clone()]);

        // Sidecars of pruned backups are gone too
        assert!(!sidecar_path(&created[0]).exists());
    }

    #[test]
    fn test_retention_purges_old_backups_regardless_of_count() {
        let (manager, temp_dir) = create_test_manager(10);
        let source = write_source(&temp_dir, "slot_01.sav", ENVELOPE);

        let old = manager.create_backup(&source, "old").unwrap();
        age_sidecar(&old, 45);
        let recent = manager.create_backup(&source, "recent").unwrap();

        assert!(!old.exists());
        let remaining = manager.list_backups(Some("slot_01.sav")).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].backup_path, recent);
    }

    #[test]
    fn test_retention_is_per_source_file() {
        let (manager, temp_dir) = create_test_manager(1);
        let slot1 = write_source(&temp_dir, "slot_01.sav", ENVELOPE);
        let slot2 = write_source(&temp_dir, "slot_02.sav", ENVELOPE);

        manager.create_backup(&slot1, "a").unwrap();
        manager.create_backup(&slot2, "b").unwrap();

        assert_eq!(manager.list_backups(None).unwrap().len(), 2);
    }

    #[test]
    fn test_restore_refuses_to_clobber_without_flag() {
        let (manager, temp_dir) = create_test_manager(5);
        let source = write_source(&temp_dir, "slot_01.sav", "good");
        let backup = manager.create_backup(&source, "manual").unwrap();
        fs::write(&source, "changed").unwrap();

        assert!(!manager.restore_backup(&backup, false).unwrap());
        assert_eq!(fs::read_to_string(&source).unwrap(), "changed");
    }

    #[test]
    fn test_restore_backs_up_target_first() {
        let (manager, temp_dir) = create_test_manager(5);
        let source = write_source(&temp_dir, "slot_01.sav", "good");
        let backup = manager.create_backup(&source, "manual").unwrap();
        fs::write(&source, "bad").unwrap();

        assert!(manager.restore_backup(&backup, true).unwrap());
        assert_eq!(fs::read_to_string(&source).unwrap(), "good");

        let backups = manager.list_backups(Some("slot_01.sav")).unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(backups[0].reason, "pre_restore");
        assert_eq!(fs::read_to_string(&backups[0].backup_path).unwrap(), "bad");
    }

    #[test]
    fn test_restore_never_prunes_the_backup_being_restored() {
        let (manager, temp_dir) = create_test_manager(1);
        let source = write_source(&temp_dir, "slot_01.sav", "good");
        let backup = manager.create_backup(&source, "manual").unwrap();
        fs::write(&source, "bad").unwrap();

        assert!(manager.restore_backup(&backup, true).unwrap());
        assert_eq!(fs::read_to_string(&source).unwrap(), "good");
    }

    #[test]
    fn test_restore_missing_original_by_bare_name() {
        let (manager, temp_dir) = create_test_manager(5);
        let source = write_source(&temp_dir, "slot_03.sav", "data");
        let backup = manager.create_backup(&source, "slot_deletion").unwrap();
        fs::remove_file(&source).unwrap();

        let bare = PathBuf::from(file_name_of(&backup));
        assert!(manager.restore_backup(&bare, false).unwrap());
        assert_eq!(fs::read_to_string(&source).unwrap(), "data");
    }

    #[test]
    fn test_restore_without_sidecar_derives_original() {
        let (manager, temp_dir) = create_test_manager(5);
        let source = write_source(&temp_dir, "slot_04.sav", "data");
        let backup = manager.create_backup(&source, "manual").unwrap();
        fs::remove_file(sidecar_path(&backup)).unwrap();
        fs::remove_file(&source).unwrap();

        assert_eq!(manager.restore_target(&backup).unwrap(), source);
        assert!(manager.restore_backup(&backup, false).unwrap());

        let listed = manager.list_backups(Some("slot_04.sav")).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].has_sidecar);
        assert_eq!(listed[0].reason, "manual");
    }

    #[test]
    fn test_restore_to_explicit_target() {
        let (manager, temp_dir) = create_test_manager(5);
        let source = write_source(&temp_dir, "slot_01.sav", "good");
        let backup = manager.create_backup(&source, "manual").unwrap();

        let elsewhere = write_source(&temp_dir, "copy.sav", "bad");
        assert!(manager.restore_backup_to(&backup, &elsewhere, true).unwrap());

        assert_eq!(fs::read_to_string(&elsewhere).unwrap(), "good");
        assert_eq!(fs::read_to_string(&source).unwrap(), "good");

        let reasons: Vec<String> = manager
            .list_backups(Some("copy.sav"))
            .unwrap()
            .into_iter()
            .map(|b| b.reason)
            .collect();
        assert_eq!(reasons, vec!["pre_restore"]);
    }

    #[test]
    fn test_restore_target_ignores_vanished_directory() {
        let (manager, temp_dir) = create_test_manager(5);
        let old_dir = temp_dir.path().join("old_saves");
        fs::create_dir_all(&old_dir).unwrap();
        let source = old_dir.join("slot_02.sav");
        fs::write(&source, "data").unwrap();

        let backup = manager.create_backup(&source, "manual").unwrap();
        assert_eq!(manager.restore_target(&backup).unwrap(), source);

        fs::remove_dir_all(&old_dir).unwrap();
        assert_eq!(
            manager.restore_target(&backup).unwrap(),
            temp_dir.path().join("slot_02.sav")
        );
        assert!(manager.restore_backup(&backup, false).unwrap());
        assert!(!old_dir.exists());
    }

    #[test]
    fn test_same_file_resolves_equivalent_paths() {
        let (_manager, temp_dir) = create_test_manager(5);
        let source = write_source(&temp_dir, "slot_01.sav", "data");
        let dotted = temp_dir.path().join(".").join("slot_01.sav");

        assert!(same_file(&source, &dotted));
        assert!(!same_file(&source, &temp_dir.path().join("slot_02.sav")));
    }

    #[test]
    fn test_restore_missing_backup() {
        let (manager, _temp_dir) = create_test_manager(5);
        let err = manager.restore_backup("ghost_backup_x.sav", true).unwrap_err();
        assert!(matches!(err, BackupError::BackupMissing(_)));
    }

    #[test]
    fn test_verify_backup_integrity() {
        let (manager, temp_dir) = create_test_manager(5);
        let good = write_source(&temp_dir, "slot_01.sav", ENVELOPE);
        let bad = write_source(&temp_dir, "slot_02.sav", r#"{"version":"2.0"}"#);
        let gz = temp_dir.path().join("slot_03.sav");
        fs::write(&gz, crate::utils::gzip(ENVELOPE.as_bytes()).unwrap()).unwrap();

        let good_backup = manager.create_backup(&good, "a").unwrap();
        let bad_backup = manager.create_backup(&bad, "b").unwrap();
        let gz_backup = manager.create_backup(&gz, "c").unwrap();

        assert!(manager.verify_backup_integrity(&good_backup));
        assert!(!manager.verify_backup_integrity(&bad_backup));
        assert!(manager.verify_backup_integrity(&gz_backup));
        assert!(!manager.verify_backup_integrity("missing_backup_x.sav"));
    }

    #[test]
    fn test_statistics() {
        let (manager, temp_dir) = create_test_manager(5);
        assert_eq!(manager.statistics().unwrap(), BackupStats::default());

        let source = write_source(&temp_dir, "slot_01.sav", "12345");
        manager.create_backup(&source, "a").unwrap();
        manager.create_backup(&source, "b").unwrap();

        let stats = manager.statistics().unwrap();
        assert_eq!(stats.total_backups, 2);
        assert_eq!(stats.total_size_bytes, 10);
        assert!(stats.oldest.unwrap() <= stats.newest.unwrap());
    }

    #[test]
    fn test_parse_backup_name() {
        let parsed = parse_backup_name("slot_01_backup_20240309_140559_000123_slot_overwrite.sav").unwrap();
        assert_eq!(parsed.original_file, "slot_01.sav");
        assert_eq!(parsed.reason.as_deref(), Some("slot_overwrite"));
        assert!(parsed.timestamp.is_some());

        let parsed = parse_backup_name("slot_01_backup_20240309_140559_000123-2.sav").unwrap();
        assert_eq!(parsed.original_file, "slot_01.sav");
        assert_eq!(parsed.reason, None);

        assert!(parse_backup_name("slot_01.sav").is_none());
    }

    #[test]
    fn test_sanitize_reason() {
        assert_eq!(sanitize_reason("Slot Overwrite!"), "slot_overwrite");
        assert_eq!(sanitize_reason("  pre-restore "), "pre_restore");
        assert_eq!(sanitize_reason("***"), "");
    }
}
