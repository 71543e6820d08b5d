//! Save engine configuration

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Slot files use this extension
pub const SLOT_EXTENSION: &str = "sav";

/// What `quick_save` does when every slot is occupied and none is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickSavePolicy {
    /// Overwrite slot 1 (after backing it up)
    #[default]
    OverwriteFirstSlot,
    /// Fail with `SaveError::NoFreeSlot`
    RequireFreeSlot,
}

/// Configuration for the SaveManager and its collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Directory holding the slot files
    pub save_dir: PathBuf,
    /// Backup directory; `<save_dir>/backups` when unset
    pub backup_dir: Option<PathBuf>,
    /// Highest valid slot id (slots are numbered from 1)
    pub max_slots: u32,
    /// Gzip slot files on write
    pub compress: bool,
    /// Verify checksums on load
    pub verify_integrity: bool,
    /// Backups kept per source file
    pub max_backups_per_file: usize,
    /// Backups older than this are purged regardless of count
    pub max_backup_age_days: u32,
    pub auto_save_interval_secs: u64,
    /// How long `AutoSaveManager::stop` waits for the worker to finish
    pub auto_save_stop_timeout_secs: u64,
    pub quick_save_policy: QuickSavePolicy,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("saves"),
            backup_dir: None,
            max_slots: 10,
            compress: true,
            verify_integrity: true,
            max_backups_per_file: 5,
            max_backup_age_days: 30,
            auto_save_interval_secs: 300,
            auto_save_stop_timeout_secs: 5,
            quick_save_policy: QuickSavePolicy::default(),
        }
    }
}

impl SaveConfig {
    /// Create config with custom save directory
    pub fn new<P: AsRef<Path>>(save_dir: P) -> Self {
        Self {
            save_dir: save_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Create config with custom save directory (alias for new)
    pub fn with_data_dir<P: AsRef<Path>>(save_dir: P) -> Self {
        Self::new(save_dir)
    }

    /// Load a JSON config file; missing keys take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SaveConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `SAVEKEEPER_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply `SAVEKEEPER_DIR`, `SAVEKEEPER_MAX_SLOTS` and `SAVEKEEPER_COMPRESS`
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(dir) = env::var("SAVEKEEPER_DIR") {
            self.save_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = env::var("SAVEKEEPER_MAX_SLOTS") {
            self.max_slots = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "SAVEKEEPER_MAX_SLOTS",
                value: raw.clone(),
            })?;
        }
        if let Ok(raw) = env::var("SAVEKEEPER_COMPRESS") {
            self.compress = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "SAVEKEEPER_COMPRESS",
                        value: raw,
                    })
                }
            };
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_slots == 0 {
            return Err(ConfigError::Invalid {
                key: "max_slots",
                value: "0".to_string(),
            });
        }
        if self.max_backups_per_file == 0 {
            return Err(ConfigError::Invalid {
                key: "max_backups_per_file",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Get path to the backup directory
    pub fn backup_dir(&self) -> PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| self.save_dir.join("backups"))
    }

    /// File name of a slot, e.g. `slot_01.sav`
    pub fn slot_filename(&self, slot_id: u32) -> String {
        format!("slot_{:02}.{}", slot_id, SLOT_EXTENSION)
    }

    /// Get path to a slot file
    pub fn slot_path(&self, slot_id: u32) -> PathBuf {
        self.save_dir.join(self.slot_filename(slot_id))
    }

    pub fn auto_save_interval(&self) -> Duration {
        Duration::from_secs(self.auto_save_interval_secs)
    }

    pub fn auto_save_stop_timeout(&self) -> Duration {
        Duration::from_secs(self.auto_save_stop_timeout_secs)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_slot_paths() {
        let config = SaveConfig::new("/tmp/game");
        assert_eq!(config.slot_filename(1), "slot_01.sav");
        assert_eq!(config.slot_filename(12), "slot_12.sav");
        assert_eq!(config.slot_path(3), PathBuf::from("/tmp/game/slot_03.sav"));
        assert_eq!(config.backup_dir(), PathBuf::from("/tmp/game/backups"));
    }

    #[test]
    fn test_explicit_backup_dir() {
        let config = SaveConfig {
            backup_dir: Some(PathBuf::from("/elsewhere")),
            ..SaveConfig::new("/tmp/game")
        };
        assert_eq!(config.backup_dir(), PathBuf::from("/elsewhere"));
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("savekeeper.json");
        fs::write(
            &path,
            r#"{"save_dir": "my_saves", "max_slots": 3, "quick_save_policy": "require_free_slot"}"#,
        )
        .unwrap();

        let config = SaveConfig::from_file(&path).unwrap();

        assert_eq!(config.save_dir, PathBuf::from("my_saves"));
        assert_eq!(config.max_slots, 3);
        assert_eq!(config.quick_save_policy, QuickSavePolicy::RequireFreeSlot);
        assert!(config.compress);
        assert_eq!(config.max_backups_per_file, 5);
    }

    #[test]
    fn test_from_file_rejects_zero_slots() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("savekeeper.json");
        fs::write(&path, r#"{"max_slots": 0}"#).unwrap();

        assert!(matches!(
            SaveConfig::from_file(&path),
            Err(ConfigError::Invalid { key: "max_slots", .. })
        ));
    }
}
