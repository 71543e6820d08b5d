//! Backup sidecar and listing types

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata written next to every backup copy as `<backup stem>.meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSidecar {
    /// File name of the source, e.g. `slot_01.sav`
    pub original_file: String,
    /// Full path of the source at backup time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<PathBuf>,
    pub backup_time: DateTime<Utc>,
    pub backup_reason: String,
    pub original_size: u64,
    pub backup_size: u64,
}

/// One backup as reported by `BackupManager::list_backups`
#[derive(Debug, Clone, PartialEq)]
pub struct BackupRecord {
    pub backup_filename: String,
    pub backup_path: PathBuf,
    pub original_file: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub age_days: f64,
    /// False when the sidecar was missing or unreadable and fields were derived
    pub has_sidecar: bool,
}

/// Aggregate figures over the backup directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupStats {
    pub total_backups: usize,
    pub total_size_bytes: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}
