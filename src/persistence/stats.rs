//! Save directory statistics
//!
//! Aggregates per-slot sizes and timestamps together with the backup
//! manager's totals.

use chrono::{DateTime, Utc};

use crate::types::BackupStats;

/// Figures for one occupied slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotStats {
    pub slot_id: u32,
    pub filename: String,
    pub size_bytes: u64,
    /// Envelope timestamp of the save, if it could be read
    pub saved_at: Option<DateTime<Utc>>,
    pub last_accessed: DateTime<Utc>,
    pub corrupted: bool,
}

/// Statistics about a save directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveStatistics {
    pub max_slots: u32,
    pub current_slot: Option<u32>,
    /// Occupied slots, ordered by slot id
    pub slots: Vec<SlotStats>,
    /// Total size of all slot files in bytes
    pub total_size_bytes: u64,
    pub oldest_save: Option<DateTime<Utc>>,
    pub newest_save: Option<DateTime<Utc>>,
    pub backups: BackupStats,
}

impl SaveStatistics {
    pub fn new(
        max_slots: u32,
        current_slot: Option<u32>,
        slots: Vec<SlotStats>,
        backups: BackupStats,
    ) -> Self {
        let total_size_bytes = slots.iter().map(|s| s.size_bytes).sum();
        let oldest_save = slots.iter().filter_map(|s| s.saved_at).min();
        let newest_save = slots.iter().filter_map(|s| s.saved_at).max();

        Self {
            max_slots,
            current_slot,
            slots,
            total_size_bytes,
            oldest_save,
            newest_save,
            backups,
        }
    }

    pub fn used_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn free_slots(&self) -> usize {
        (self.max_slots as usize).saturating_sub(self.slots.len())
    }

    /// Calculate total storage size including backups
    pub fn total_size_with_backups(&self) -> u64 {
        self.total_size_bytes + self.backups.total_size_bytes
    }

    /// Format size in human-readable format
    pub fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.2} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.2} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.2} KB", bytes as f64 / KB as f64)
        } else {
            format!("{} B", bytes)
        }
    }
}
