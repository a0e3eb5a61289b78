//! Per-project settings for stowaway
//!
//! Settings are read from `stowaway.json` in the project root when present.
//! Every field has a default, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};

use super::paths::ProjectPaths;
use crate::error::StowawayError;

/// Per-project settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Backup directory name, relative to the project root
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// Directory names never descended into during discovery
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    /// Files whose size, mtime and hash make up the project-state fingerprint
    #[serde(default = "default_key_files")]
    pub key_files: Vec<String>,

    /// Multiplier applied to the candidate size when checking free space
    #[serde(default = "default_space_safety_factor")]
    pub space_safety_factor: f64,

    /// Dependency manifest declaring the autoload roots
    #[serde(default = "default_autoload_config")]
    pub autoload_config: String,

    /// Files larger than this are classified by path only
    #[serde(default = "default_max_scan_bytes")]
    pub max_scan_bytes: u64,
}

fn default_schema_version() -> u32 {
    1
}

fn default_backup_dir() -> String {
    "stowaway-backup".to_string()
}

fn default_excluded_dirs() -> Vec<String> {
    [".git", "vendor", "node_modules", ".idea", ".vscode"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_key_files() -> Vec<String> {
    [
        "composer.json",
        "composer.lock",
        "package.json",
        "index.php",
        "public/index.php",
        ".htaccess",
        "public/.htaccess",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_space_safety_factor() -> f64 {
    1.2
}

fn default_autoload_config() -> String {
    "composer.json".to_string()
}

fn default_max_scan_bytes() -> u64 {
    1024 * 1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup_dir: default_backup_dir(),
            excluded_dirs: default_excluded_dirs(),
            key_files: default_key_files(),
            space_safety_factor: default_space_safety_factor(),
            autoload_config: default_autoload_config(),
            max_scan_bytes: default_max_scan_bytes(),
        }
    }
}

impl Settings {
    /// Load settings from the project, or fall back to defaults if the file doesn't exist
    pub fn load_or_default(paths: &ProjectPaths) -> Result<Self, StowawayError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| StowawayError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| StowawayError::Config(format!("Failed to parse settings file: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to the project root
    pub fn save(&self, paths: &ProjectPaths) -> Result<(), StowawayError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| StowawayError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| StowawayError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Reject values that would make the disk-space check meaningless
    pub fn validate(&self) -> Result<(), StowawayError> {
        if !self.space_safety_factor.is_finite() || self.space_safety_factor < 1.0 {
            return Err(StowawayError::Config(format!(
                "space_safety_factor must be at least 1.0, got {}",
                self.space_safety_factor
            )));
        }

        if self.backup_dir.trim().is_empty() {
            return Err(StowawayError::Config("backup_dir cannot be empty".into()));
        }

        Ok(())
    }

    /// Check whether a directory name is excluded from discovery
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|d| d == name) || name == self.backup_dir
    }
}
