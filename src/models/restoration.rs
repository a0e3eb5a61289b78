//! Restore options and outcome records
//!
//! These records live only for the duration of one restore call; they are
//! never persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::StowawayError;

/// What to do when the restore target already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Copy the existing file aside, then restore
    #[default]
    BackupExisting,
    /// Restore without preserving the existing file
    Overwrite,
    /// Leave the existing file in place
    Skip,
    /// Skip identical or newer files, otherwise behave like `BackupExisting`
    Compare,
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackupExisting => write!(f, "backup_existing"),
            Self::Overwrite => write!(f, "overwrite"),
            Self::Skip => write!(f, "skip"),
            Self::Compare => write!(f, "compare"),
        }
    }
}

impl FromStr for ConflictStrategy {
    type Err = StowawayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "backup_existing" | "backup" => Ok(Self::BackupExisting),
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            "compare" => Ok(Self::Compare),
            other => Err(StowawayError::Config(format!(
                "Unknown conflict strategy '{}' (expected backup_existing, overwrite, skip or compare)",
                other
            ))),
        }
    }
}

/// How the file is put back at its original location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMethod {
    /// Copy, leaving the backup in place
    #[default]
    Copy,
    /// Rename out of the backup store
    Move,
    /// Hard link to the backup copy
    Hardlink,
    /// Symbolic link to the backup copy
    Symlink,
}

impl fmt::Display for RestoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "copy"),
            Self::Move => write!(f, "move"),
            Self::Hardlink => write!(f, "hardlink"),
            Self::Symlink => write!(f, "symlink"),
        }
    }
}

/// Options for a restore call
#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    pub conflict_resolution: ConflictStrategy,
    pub method: RestoreMethod,
    /// Stop a batch at the first hard failure
    pub fail_fast: bool,
    /// Required for a complete rollback
    pub confirm_rollback: bool,
}

impl RestoreOptions {
    pub fn with_conflict(mut self, strategy: ConflictStrategy) -> Self {
        self.conflict_resolution = strategy;
        self
    }

    pub fn with_method(mut self, method: RestoreMethod) -> Self {
        self.method = method;
        self
    }

    pub fn fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.confirm_rollback = true;
        self
    }
}

/// What conflict handling actually did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictAction {
    /// Target did not exist
    NoConflict,
    /// Existing file was copied aside
    PreservedExisting,
    /// Existing file will be replaced
    Overwrite,
    /// Strategy was `Skip`
    Skipped,
    /// Existing file already matches the backup
    Identical,
    /// Existing file is newer than the backup
    ExistingNewer,
}

/// Outcome of resolving a restore conflict
#[derive(Debug, Clone)]
pub struct ConflictResolution {
    pub strategy: ConflictStrategy,
    pub action: ConflictAction,
    /// Whether the restore should go ahead
    pub proceed: bool,
    /// Where the pre-existing file was preserved
    pub preserved_path: Option<PathBuf>,
    pub message: String,
}

impl ConflictResolution {
    pub fn no_conflict(strategy: ConflictStrategy) -> Self {
        Self {
            strategy,
            action: ConflictAction::NoConflict,
            proceed: true,
            preserved_path: None,
            message: "No conflict".to_string(),
        }
    }
}

/// Outcome of comparing a restored file with its backup
#[derive(Debug, Clone, Default)]
pub struct VerificationResult {
    pub verified: bool,
    pub exists: bool,
    pub size_matches: bool,
    pub hash_matches: bool,
    pub expected_size: u64,
    pub actual_size: Option<u64>,
    pub expected_hash: String,
    pub actual_hash: Option<String>,
    pub message: String,
}

/// Outcome of restoring a single file
#[derive(Debug, Clone)]
pub struct RestorationResult {
    pub original_path: String,
    pub backup_path: String,
    pub success: bool,
    /// A deliberate no-op, not a failure
    pub skipped: bool,
    pub method: RestoreMethod,
    pub conflict: ConflictResolution,
    pub verification: Option<VerificationResult>,
    pub message: String,
}

/// Outcome of restoring several files
#[derive(Debug, Clone, Default)]
pub struct BatchRestorationResult {
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
    pub results: Vec<RestorationResult>,
    /// Path → error message for hard failures
    pub errors: BTreeMap<String, String>,
    /// Set when `fail_fast` ended the batch
    pub stopped_early: bool,
}

impl BatchRestorationResult {
    /// True when no file failed
    pub fn is_success(&self) -> bool {
        self.error_count == 0 && !self.stopped_early
    }

    /// One-line summary for terminal output
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} of {} restored, {} skipped, {} failed",
            self.success_count, self.total, self.skipped_count, self.error_count
        );
        if self.stopped_early {
            summary.push_str(" (stopped at first failure)");
        }
        summary
    }
}

/// Outcome of checking whether a backup can be restored
#[derive(Debug, Clone, Default)]
pub struct PrerequisiteReport {
    pub backup_exists: bool,
    /// Manifest entries whose backup file is gone
    pub missing_backups: Vec<String>,
    /// Manifest entries whose original path is already occupied
    pub already_present: Vec<String>,
    pub required_bytes: u64,
    pub available_bytes: u64,
    /// Key project files changed since the backup was taken
    pub drifted_files: Vec<String>,
}

impl PrerequisiteReport {
    pub fn disk_space_ok(&self) -> bool {
        self.available_bytes >= self.required_bytes
    }

    /// True when nothing blocks a restore; drift only warns
    pub fn is_ok(&self) -> bool {
        self.backup_exists
            && self.missing_backups.is_empty()
            && self.already_present.is_empty()
            && self.disk_space_ok()
    }

    /// Human-readable blocking problems
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.backup_exists {
            issues.push("no backup found".to_string());
        }
        for path in &self.missing_backups {
            issues.push(format!("backup file missing for {}", path));
        }
        for path in &self.already_present {
            issues.push(format!("{} already exists at its original location", path));
        }
        if !self.disk_space_ok() {
            issues.push(format!(
                "insufficient disk space: required {} bytes, available {} bytes",
                self.required_bytes, self.available_bytes
            ));
        }
        issues
    }

    /// Convert blocking problems into a `Prerequisites` error
    pub fn into_result(self) -> Result<Self, StowawayError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(StowawayError::Prerequisites(self.issues().join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prerequisite_issues() {
        let report = PrerequisiteReport {
            backup_exists: true,
            missing_backups: vec!["debug.php".into()],
            required_bytes: 10,
            available_bytes: 100,
            drifted_files: vec!["composer.json".into()],
            ..Default::default()
        };
        assert!(!report.is_ok());
        assert_eq!(report.issues(), vec!["backup file missing for debug.php"]);
        let err = report.into_result().unwrap_err();
        assert!(err.is_precondition());

        let clean = PrerequisiteReport {
            backup_exists: true,
            drifted_files: vec!["composer.json".into()],
            ..Default::default()
        };
        assert!(clean.into_result().is_ok());
    }

    #[test]
    fn test_defaults() {
        let options = RestoreOptions::default();
        assert_eq!(options.conflict_resolution, ConflictStrategy::BackupExisting);
        assert_eq!(options.method, RestoreMethod::Copy);
        assert!(!options.fail_fast);
        assert!(!options.confirm_rollback);
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!(
            "backup-existing".parse::<ConflictStrategy>().unwrap(),
            ConflictStrategy::BackupExisting
        );
        assert_eq!("Compare".parse::<ConflictStrategy>().unwrap(), ConflictStrategy::Compare);
        assert!("merge".parse::<ConflictStrategy>().is_err());
    }

    #[test]
    fn test_batch_summary() {
        let batch = BatchRestorationResult {
            total: 4,
            success_count: 2,
            error_count: 1,
            skipped_count: 1,
            stopped_early: true,
            ..Default::default()
        };
        assert!(!batch.is_success());
        assert_eq!(
            batch.summary(),
            "2 of 4 restored, 1 skipped, 1 failed (stopped at first failure)"
        );
    }
}
