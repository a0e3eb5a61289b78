//! Backup manifest
//!
//! The manifest is the durable record of one backup run: which files moved
//! where, the classification snapshot that justified it, a fingerprint of the
//! project at backup time, derived statistics, and per-file errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::analysis::{FileAnalysisResult, FileCategory, RecommendedAction};
use crate::config::paths::{checked_relative, MOVED_FILES_DIR};
use crate::error::{StowawayError, StowawayResult};

/// Current manifest schema version
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Size, modification time and hash of one key project file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFileState {
    pub size: u64,
    /// Seconds since the Unix epoch
    pub modified: i64,
    pub hash: String,
}

/// Fingerprint of the project's key files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    /// SHA-256 over the sorted per-file lines
    pub fingerprint: String,
    #[serde(default)]
    pub files: BTreeMap<String, KeyFileState>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

impl ProjectState {
    /// Key files whose state differs between two fingerprints
    pub fn drifted_files(&self, current: &ProjectState) -> Vec<String> {
        let mut drifted: Vec<String> = self
            .files
            .iter()
            .filter(|(path, state)| current.files.get(*path) != Some(*state))
            .map(|(path, _)| path.clone())
            .collect();

        drifted.extend(
            current
                .files
                .keys()
                .filter(|path| !self.files.contains_key(*path))
                .cloned(),
        );
        drifted.sort();
        drifted
    }
}

/// Confidence distribution buckets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBuckets {
    /// 80 and above
    pub high: usize,
    /// 50 to 79
    pub medium: usize,
    /// Below 50
    pub low: usize,
}

impl ConfidenceBuckets {
    fn record(&mut self, score: u8) {
        match score {
            80..=100 => self.high += 1,
            50..=79 => self.medium += 1,
            _ => self.low += 1,
        }
    }
}

/// Aggregate counts derived from a manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupStatistics {
    pub total_files_analyzed: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_action: BTreeMap<String, usize>,
    pub by_confidence: ConfidenceBuckets,
    pub candidate_count: usize,
    pub moved_count: usize,
    pub error_count: usize,
    pub total_candidate_bytes: u64,
    pub moved_bytes: u64,
    /// Percentage of candidates that were moved
    pub success_rate: f64,
}

/// Record of a single backup run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default = "Uuid::new_v4")]
    pub backup_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub project_root: String,
    #[serde(default)]
    moved_files: BTreeMap<String, String>,
    #[serde(default)]
    analysis_results: BTreeMap<String, FileAnalysisResult>,
    #[serde(default)]
    pub project_state: ProjectState,
    #[serde(default)]
    statistics: BackupStatistics,
    #[serde(default)]
    errors: BTreeMap<String, String>,
    #[serde(default)]
    file_sizes: BTreeMap<String, u64>,
}

fn default_schema_version() -> u32 {
    MANIFEST_SCHEMA_VERSION
}

impl BackupManifest {
    /// Create a manifest for a classification snapshot
    pub fn new(
        project_root: impl Into<String>,
        analysis_results: BTreeMap<String, FileAnalysisResult>,
    ) -> Self {
        let mut manifest = Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            backup_id: Uuid::new_v4(),
            created_at: Utc::now(),
            project_root: project_root.into(),
            moved_files: BTreeMap::new(),
            analysis_results,
            project_state: ProjectState::default(),
            statistics: BackupStatistics::default(),
            errors: BTreeMap::new(),
            file_sizes: BTreeMap::new(),
        };
        manifest.recompute_statistics();
        manifest
    }

    /// Original path → backup-relative path
    pub fn moved_files(&self) -> &BTreeMap<String, String> {
        &self.moved_files
    }

    pub fn analysis_results(&self) -> &BTreeMap<String, FileAnalysisResult> {
        &self.analysis_results
    }

    pub fn statistics(&self) -> &BackupStatistics {
        &self.statistics
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn file_sizes(&self) -> &BTreeMap<String, u64> {
        &self.file_sizes
    }

    /// Paths recommended for moving, in sorted order
    pub fn candidates(&self) -> Vec<&str> {
        self.analysis_results
            .values()
            .filter(|r| r.is_move_candidate())
            .map(|r| r.file_path())
            .collect()
    }

    /// Backup-relative path for an original path
    pub fn backup_path_for(&self, original: &str) -> Option<&str> {
        self.moved_files.get(original).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.moved_files.is_empty()
    }

    /// Remember a candidate's size for statistics
    pub fn record_size(&mut self, path: impl Into<String>, size: u64) {
        self.file_sizes.insert(path.into(), size);
    }

    /// Record a verified move
    ///
    /// Only move candidates can be recorded; a successful move clears any
    /// earlier error for the path.
    pub fn record_move(
        &mut self,
        original: impl Into<String>,
        backup_relative: impl Into<String>,
    ) -> StowawayResult<()> {
        let original = original.into();
        let is_candidate = self
            .analysis_results
            .get(&original)
            .map(|r| r.is_move_candidate())
            .unwrap_or(false);

        if !is_candidate {
            return Err(StowawayError::Manifest(format!(
                "{} is not a move candidate",
                original
            )));
        }

        self.errors.remove(&original);
        self.moved_files.insert(original, backup_relative.into());
        Ok(())
    }

    /// Record a failed move; ignored for paths already moved
    pub fn record_error(&mut self, original: impl Into<String>, message: impl Into<String>) {
        let original = original.into();
        if !self.moved_files.contains_key(&original) {
            self.errors.insert(original, message.into());
        }
    }

    /// Drop a moved entry after it has been taken back out of the backup
    pub fn remove_moved(&mut self, original: &str) -> Option<String> {
        let removed = self.moved_files.remove(original);
        if removed.is_some() {
            self.recompute_statistics();
        }
        removed
    }

    /// Recompute derived statistics from the current state
    pub fn recompute_statistics(&mut self) {
        let mut stats = BackupStatistics {
            total_files_analyzed: self.analysis_results.len(),
            ..BackupStatistics::default()
        };

        for category in FileCategory::all() {
            stats.by_category.insert(category.as_str().to_string(), 0);
        }
        for action in RecommendedAction::all() {
            stats.by_action.insert(action.as_str().to_string(), 0);
        }

        for result in self.analysis_results.values() {
            *stats
                .by_category
                .entry(result.category().as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_action
                .entry(result.recommended_action().as_str().to_string())
                .or_insert(0) += 1;
            stats.by_confidence.record(result.confidence_score());

            if result.is_move_candidate() {
                stats.candidate_count += 1;
                stats.total_candidate_bytes += self
                    .file_sizes
                    .get(result.file_path())
                    .copied()
                    .unwrap_or(0);
            }
        }

        stats.moved_count = self.moved_files.len();
        stats.error_count = self.errors.len();
        stats.moved_bytes = self
            .moved_files
            .keys()
            .filter_map(|path| self.file_sizes.get(path))
            .sum();
        stats.success_rate = if stats.candidate_count == 0 {
            0.0
        } else {
            (stats.moved_count as f64 / stats.candidate_count as f64) * 100.0
        };

        self.statistics = stats;
    }

    /// Serialize to a JSON value
    pub fn to_value(&self) -> StowawayResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild from a JSON value, validating entries and recomputing statistics
    pub fn from_value(value: serde_json::Value) -> StowawayResult<Self> {
        let mut manifest: BackupManifest = serde_json::from_value(value)
            .map_err(|e| StowawayError::Manifest(format!("Invalid manifest: {}", e)))?;
        manifest.validate()?;
        manifest.recompute_statistics();
        Ok(manifest)
    }

    /// Check every moved entry against the manifest's own invariants
    ///
    /// Keys must be normalized project-relative paths of move candidates
    /// that are not also recorded as errors, and each must be stored at
    /// `moved-files/<key>`.
    pub fn validate(&self) -> StowawayResult<()> {
        for (original, backup_relative) in &self.moved_files {
            let corrupt = |reason: &str| {
                StowawayError::Manifest(format!("Corrupt entry {}: {}", original, reason))
            };

            if checked_relative(original).is_err() {
                return Err(corrupt("not a normalized project-relative path"));
            }
            if *backup_relative != format!("{}/{}", MOVED_FILES_DIR, original) {
                return Err(corrupt(&format!(
                    "unexpected backup location {}",
                    backup_relative
                )));
            }
            let is_candidate = self
                .analysis_results
                .get(original)
                .is_some_and(|r| r.is_move_candidate());
            if !is_candidate {
                return Err(corrupt("not a move candidate"));
            }
            if self.errors.contains_key(original) {
                return Err(corrupt("also recorded as a failed move"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(path: &str, category: FileCategory, confidence: u32) -> FileAnalysisResult {
        FileAnalysisResult::builder(path, "test")
            .category(category)
            .add_confidence(confidence)
            .build()
    }

    fn sample_manifest() -> BackupManifest {
        let mut results = BTreeMap::new();
        for r in [
            result("src/Domain/Pet/Pet.php", FileCategory::Essential, 90),
            result("tests/FooTest.php", FileCategory::NonEssential, 85),
            result("debug.php", FileCategory::NonEssential, 60),
            result("notes.txt", FileCategory::Uncertain, 20),
        ] {
            results.insert(r.file_path().to_string(), r);
        }

        let mut manifest = BackupManifest::new("/project", results);
        manifest.record_size("tests/FooTest.php", 100);
        manifest.record_size("debug.php", 50);
        manifest
    }

    #[test]
    fn test_candidates_are_move_actions() {
        let manifest = sample_manifest();
        assert_eq!(manifest.candidates(), vec!["debug.php", "tests/FooTest.php"]);
    }

    #[test]
    fn test_record_move_rejects_non_candidates() {
        let mut manifest = sample_manifest();
        assert!(manifest
            .record_move("src/Domain/Pet/Pet.php", "moved-files/src/Domain/Pet/Pet.php")
            .is_err());
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_path_never_in_both_moved_and_errors() {
        let mut manifest = sample_manifest();
        manifest.record_error("debug.php", "permission denied");
        manifest
            .record_move("debug.php", "moved-files/debug.php")
            .unwrap();
        assert!(!manifest.errors().contains_key("debug.php"));

        manifest.record_error("debug.php", "late failure");
        assert!(!manifest.errors().contains_key("debug.php"));
    }

    #[test]
    fn test_statistics() {
        let mut manifest = sample_manifest();
        manifest
            .record_move("tests/FooTest.php", "moved-files/tests/FooTest.php")
            .unwrap();
        manifest.record_error("debug.php", "boom");
        manifest.recompute_statistics();

        let stats = manifest.statistics();
        assert_eq!(stats.total_files_analyzed, 4);
        assert_eq!(stats.by_category["non_essential"], 2);
        assert_eq!(stats.by_action["keep"], 1);
        assert_eq!(stats.by_confidence.high, 2);
        assert_eq!(stats.by_confidence.medium, 1);
        assert_eq!(stats.by_confidence.low, 1);
        assert_eq!(stats.candidate_count, 2);
        assert_eq!(stats.total_candidate_bytes, 150);
        assert_eq!(stats.moved_bytes, 100);
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.success_rate, 50.0);
    }

    #[test]
    fn test_value_round_trip() {
        let mut manifest = sample_manifest();
        manifest
            .record_move("tests/FooTest.php", "moved-files/tests/FooTest.php")
            .unwrap();
        manifest.recompute_statistics();

        let restored = BackupManifest::from_value(manifest.to_value().unwrap()).unwrap();
        assert_eq!(restored.moved_files(), manifest.moved_files());
        assert_eq!(restored.statistics(), manifest.statistics());
        assert_eq!(restored.backup_id, manifest.backup_id);
        assert_eq!(restored.analysis_results(), manifest.analysis_results());
    }

    #[test]
    fn test_remove_moved_updates_statistics() {
        let mut manifest = sample_manifest();
        manifest
            .record_move("debug.php", "moved-files/debug.php")
            .unwrap();
        manifest.recompute_statistics();
        assert_eq!(manifest.statistics().moved_count, 1);

        assert_eq!(
            manifest.remove_moved("debug.php").as_deref(),
            Some("moved-files/debug.php")
        );
        assert_eq!(manifest.statistics().moved_count, 0);
    }

    #[test]
    fn test_drifted_files() {
        let state = |hash: &str| KeyFileState {
            size: 1,
            modified: 0,
            hash: hash.to_string(),
        };
        let mut before = ProjectState::default();
        before.files.insert("composer.json".into(), state("a"));
        before.files.insert("index.php".into(), state("b"));

        let mut after = before.clone();
        after.files.insert("index.php".into(), state("c"));
        after.files.insert("package.json".into(), state("d"));

        assert_eq!(before.drifted_files(&after), vec!["index.php", "package.json"]);
    }

    fn tampered(edit: impl FnOnce(&mut serde_json::Value)) -> StowawayResult<BackupManifest> {
        let mut manifest = sample_manifest();
        manifest
            .record_move("debug.php", "moved-files/debug.php")
            .unwrap();
        let mut value = manifest.to_value().unwrap();
        edit(&mut value);
        BackupManifest::from_value(value)
    }

    #[test]
    fn test_valid_manifest_loads() {
        assert!(tampered(|_| {}).is_ok());
    }

    #[test]
    fn test_escaping_original_is_rejected() {
        for key in ["../escaped.txt", "/etc/passwd", "src/../debug.php"] {
            let err = tampered(|v| {
                let mut moved = serde_json::Map::new();
                moved.insert(key.to_string(), format!("moved-files/{}", key).into());
                v["moved_files"] = moved.into();
            })
            .unwrap_err();
            assert!(matches!(err, StowawayError::Manifest(_)), "{} accepted", key);
        }
    }

    #[test]
    fn test_backup_location_must_match_key() {
        let err = tampered(|v| {
            v["moved_files"]["debug.php"] = serde_json::json!("moved-files/../../y");
        })
        .unwrap_err();
        assert!(err.is_precondition());

        assert!(tampered(|v| {
            v["moved_files"]["debug.php"] = serde_json::json!("moved-files/other.php");
        })
        .is_err());
    }

    #[test]
    fn test_non_candidate_entry_is_rejected() {
        let err = tampered(|v| {
            v["analysis_results"] = serde_json::json!({});
        })
        .unwrap_err();
        assert!(err.to_string().contains("not a move candidate"));

        assert!(tampered(|v| {
            v["moved_files"]["src/Domain/Pet/Pet.php"] =
                serde_json::json!("moved-files/src/Domain/Pet/Pet.php");
        })
        .is_err());
    }

    #[test]
    fn test_entry_also_in_errors_is_rejected() {
        let err = tampered(|v| {
            v["errors"] = serde_json::json!({ "debug.php": "permission denied" });
        })
        .unwrap_err();
        assert!(err.to_string().contains("failed move"));
    }
}
