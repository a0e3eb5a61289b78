//! Backup manager
//!
//! Moves move-candidates out of the project into `<backup>/moved-files`,
//! records what happened in the manifest, and provides the basic copy-back
//! restore primitives.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::report;
use super::unique_sibling;
use crate::config::{ProjectPaths, Settings};
use crate::error::{StowawayError, StowawayResult};
use crate::models::{
    BackupManifest, BackupStatistics, FileAnalysisResult, KeyFileState, ProjectState,
};
use crate::storage::disk::required_space;
use crate::storage::hashing::hash_str;
use crate::storage::{
    file_digest, hash_file, read_json_required, write_json_atomic, write_text_atomic, SpaceProbe,
    SystemSpace,
};

/// Performs backups and basic restores for one project
pub struct BackupManager {
    paths: ProjectPaths,
    settings: Settings,
    space: Box<dyn SpaceProbe>,
    manifest: Option<BackupManifest>,
}

impl BackupManager {
    pub fn new(paths: ProjectPaths, settings: Settings) -> Self {
        Self {
            paths,
            settings,
            space: Box::new(SystemSpace),
            manifest: None,
        }
    }

    /// Replace the free-space probe
    pub fn with_space_probe(mut self, probe: Box<dyn SpaceProbe>) -> Self {
        self.space = probe;
        self
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Move every move candidate into the backup store
    ///
    /// With no candidates an empty manifest is returned and nothing is
    /// written. A disk-space shortfall or an unrestored earlier backup fails
    /// before any file is touched. Per-file failures are recorded in the
    /// manifest's errors and do not stop the batch.
    pub fn create_backup(
        &mut self,
        analysis_results: BTreeMap<String, FileAnalysisResult>,
        dry_run: bool,
    ) -> StowawayResult<BackupManifest> {
        let project_root = self.paths.project_root().display().to_string();
        let mut manifest = BackupManifest::new(project_root, analysis_results);
        manifest.project_state = self.capture_project_state();

        let candidates: Vec<String> = manifest
            .candidates()
            .into_iter()
            .map(str::to_string)
            .collect();

        if candidates.is_empty() {
            info!("No files recommended for moving; nothing to back up");
            return Ok(manifest);
        }

        let mut total_bytes = 0u64;
        for path in &candidates {
            let metadata = self
                .paths
                .resolve_original(path)
                .and_then(|p| Ok(fs::metadata(p)?));
            match metadata {
                Ok(meta) => {
                    total_bytes += meta.len();
                    manifest.record_size(path.as_str(), meta.len());
                }
                Err(e) => debug!("Cannot stat candidate {}: {}", path, e),
            }
        }
        manifest.recompute_statistics();

        let required = self.validate_disk_space(total_bytes)?;
        info!(
            "{} candidates, {} bytes ({} bytes required with safety margin)",
            candidates.len(),
            total_bytes,
            required
        );

        if dry_run {
            info!("Dry run: no files moved");
            return Ok(manifest);
        }

        self.ensure_no_pending_backup()?;
        self.paths.ensure_directories()?;

        for path in &candidates {
            match self.move_file(path) {
                Ok(backup_relative) => {
                    debug!("Moved {} -> {}", path, backup_relative);
                    manifest.record_move(path.as_str(), backup_relative)?;
                }
                Err(e) => {
                    warn!("{}", e);
                    manifest.record_error(path.as_str(), e.to_string());
                }
            }
        }

        manifest.recompute_statistics();
        self.persist(&manifest)?;

        let stats = manifest.statistics();
        info!(
            "Backup {} complete: {} moved, {} failed",
            manifest.backup_id, stats.moved_count, stats.error_count
        );

        self.manifest = Some(manifest.clone());
        Ok(manifest)
    }

    /// Check free space at the backup root, returning the bytes required
    pub fn validate_disk_space(&self, total_bytes: u64) -> StowawayResult<u64> {
        let required = required_space(total_bytes, self.settings.space_safety_factor);
        let available = self.available_space(self.paths.backup_root())?;

        if available < required {
            return Err(StowawayError::InsufficientDiskSpace {
                required,
                available,
            });
        }
        Ok(required)
    }

    /// Free bytes at a path, as reported by the configured probe
    pub fn available_space(&self, path: &Path) -> StowawayResult<u64> {
        self.space
            .available_space(path)
            .map_err(|e| StowawayError::Io(format!("Failed to query free space: {}", e)))
    }

    /// Refuse to overwrite a manifest that still tracks moved files
    fn ensure_no_pending_backup(&self) -> StowawayResult<()> {
        if !self.has_backup() {
            return Ok(());
        }
        let existing = self.load_manifest()?;
        if existing.is_empty() {
            return Ok(());
        }
        Err(StowawayError::BackupExists {
            path: self.paths.backup_root().display().to_string(),
            moved: existing.moved_files().len(),
        })
    }

    /// Rename one file into the backup store and verify the result
    fn move_file(&self, original: &str) -> StowawayResult<String> {
        let source = self.paths.resolve_original(original)?;
        let backup_relative = self.paths.backup_relative(original);
        let destination = self.paths.resolve_backup(&backup_relative)?;

        if !source.is_file() {
            return Err(StowawayError::move_failed(original, "source file no longer exists"));
        }
        if destination.exists() {
            return Err(StowawayError::move_failed(
                original,
                format!("backup destination {} is already occupied", destination.display()),
            ));
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StowawayError::move_failed(original, format!("cannot create backup directory: {}", e))
            })?;
        }

        fs::rename(&source, &destination)
            .map_err(|e| StowawayError::move_failed(original, e.to_string()))?;

        if !destination.is_file() || source.exists() {
            return Err(StowawayError::move_failed(
                original,
                "post-move verification failed",
            ));
        }

        Ok(backup_relative)
    }

    /// Fingerprint the configured key project files
    pub fn capture_project_state(&self) -> ProjectState {
        let mut files = BTreeMap::new();
        for key in &self.settings.key_files {
            let path = match self.paths.resolve_original(key) {
                Ok(path) if path.is_file() => path,
                _ => continue,
            };
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            match file_digest(&path) {
                Ok(digest) => {
                    files.insert(
                        key.clone(),
                        KeyFileState {
                            size: digest.size,
                            modified,
                            hash: digest.hash,
                        },
                    );
                }
                Err(e) => debug!("Skipping key file {}: {}", key, e),
            }
        }

        let lines: Vec<String> = files
            .iter()
            .map(|(path, state)| format!("{}:{}:{}:{}", path, state.size, state.modified, state.hash))
            .collect();

        ProjectState {
            fingerprint: hash_str(&lines.join("\n")),
            files,
            captured_at: Some(Utc::now()),
        }
    }

    /// Copy one file back out of the backup store
    ///
    /// An existing file at the original location is renamed aside to
    /// `<path>.conflict.<timestamp>` first; that path is returned. The copy
    /// is deleted again if its hash differs from the backup's.
    pub fn restore_file(
        &self,
        backup_relative: &str,
        original: &str,
    ) -> StowawayResult<Option<PathBuf>> {
        let backup = self.paths.resolve_backup(backup_relative)?;
        if !backup.is_file() {
            return Err(StowawayError::BackupFileMissing {
                path: original.to_string(),
                backup_path: backup.display().to_string(),
            });
        }

        let target = self.paths.resolve_original(original)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let aside = if target.exists() {
            let aside = unique_sibling(&target, "conflict");
            fs::rename(&target, &aside)?;
            info!("Existing {} moved aside to {}", original, aside.display());
            Some(aside)
        } else {
            None
        };

        fs::copy(&backup, &target)?;
        keep_matching_copy(&backup, &target, aside.as_deref(), original)?;

        Ok(aside)
    }

    /// Copy every manifest entry back; true only if all succeeded
    pub fn restore_all(&mut self) -> StowawayResult<bool> {
        let entries = self.manifest()?.moved_files().clone();
        let mut restored = 0;

        for (original, backup_relative) in &entries {
            match self.restore_file(backup_relative, original) {
                Ok(_) => restored += 1,
                Err(e) => warn!("{}", e),
            }
        }

        info!("Restored {} of {} files", restored, entries.len());
        Ok(restored == entries.len())
    }

    pub fn has_backup(&self) -> bool {
        self.paths.manifest_file().is_file()
    }

    /// The manifest, loaded from disk on first use
    pub fn manifest(&mut self) -> StowawayResult<&BackupManifest> {
        Ok(&*self.manifest_mut()?)
    }

    /// Mutable access for logged manifest updates; persist with `save_manifest`
    pub fn manifest_mut(&mut self) -> StowawayResult<&mut BackupManifest> {
        if self.manifest.is_none() {
            self.manifest = Some(self.load_manifest()?);
        }
        self.manifest
            .as_mut()
            .ok_or_else(|| StowawayError::Manifest("manifest not loaded".into()))
    }

    /// Drop the cached manifest so the next access reads from disk
    pub fn reload(&mut self) {
        self.manifest = None;
    }

    pub fn backup_statistics(&mut self) -> StowawayResult<BackupStatistics> {
        Ok(self.manifest()?.statistics().clone())
    }

    /// Persist the cached manifest and regenerate the report
    pub fn save_manifest(&mut self) -> StowawayResult<()> {
        let manifest = self
            .manifest
            .take()
            .ok_or_else(|| StowawayError::Manifest("no manifest loaded".into()))?;
        let result = self.persist(&manifest);
        self.manifest = Some(manifest);
        result
    }

    fn load_manifest(&self) -> StowawayResult<BackupManifest> {
        if !self.has_backup() {
            return Err(StowawayError::NoBackup(
                self.paths.backup_root().display().to_string(),
            ));
        }
        let value: serde_json::Value = read_json_required(self.paths.manifest_file())?;
        BackupManifest::from_value(value)
    }

    fn persist(&self, manifest: &BackupManifest) -> StowawayResult<()> {
        fs::create_dir_all(self.paths.reports_dir())?;
        write_json_atomic(self.paths.manifest_file(), manifest)?;
        write_text_atomic(self.paths.report_file(), &report::render(manifest))?;
        debug!("Manifest written to {}", self.paths.manifest_file().display());
        Ok(())
    }
}

/// Keep a restored copy only if it hashes like the backup
///
/// On a mismatch the copy is deleted and a file moved aside is put back.
fn keep_matching_copy(
    backup: &Path,
    target: &Path,
    aside: Option<&Path>,
    original: &str,
) -> StowawayResult<()> {
    if hash_file(backup)? == hash_file(target)? {
        return Ok(());
    }

    if let Err(e) = fs::remove_file(target) {
        warn!("Cannot remove mismatched copy {}: {}", target.display(), e);
    }
    if let Some(aside) = aside {
        fs::rename(aside, target)?;
        info!("Put the existing {} back in place", original);
    }
    Err(StowawayError::integrity(
        original,
        "restored copy does not match backup hash",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileCategory;
    use crate::storage::FixedSpace;
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, contents: &str) {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, contents).unwrap();
    }

    fn verdict(path: &str, category: FileCategory) -> (String, FileAnalysisResult) {
        (
            path.to_string(),
            FileAnalysisResult::builder(path, "classifier")
                .category(category)
                .add_confidence(85)
                .build(),
        )
    }

    fn setup() -> (TempDir, BackupManager, BTreeMap<String, FileAnalysisResult>) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "composer.json", "{}");
        write(root, "index.php", "<?php");
        write(root, "tests/FooTest.php", "<?php // test");
        write(root, "debug.php", "<?php phpinfo();");

        let results: BTreeMap<_, _> = [
            verdict("index.php", FileCategory::Essential),
            verdict("tests/FooTest.php", FileCategory::NonEssential),
            verdict("debug.php", FileCategory::NonEssential),
            verdict("composer.json", FileCategory::Uncertain),
        ]
        .into_iter()
        .collect();

        let settings = Settings::default();
        let paths = ProjectPaths::with_backup_root(root, root.join(&settings.backup_dir));
        let manager = BackupManager::new(paths, settings);
        (temp_dir, manager, results)
    }

    #[test]
    fn test_create_backup_moves_candidates() {
        let (temp, mut manager, results) = setup();
        let root = temp.path();

        let manifest = manager.create_backup(results, false).unwrap();
        assert_eq!(manifest.moved_files().len(), 2);
        assert!(manifest.errors().is_empty());

        for (original, backup_relative) in manifest.moved_files() {
            assert!(!root.join(original).exists());
            assert!(manager.paths().resolve_backup(backup_relative).unwrap().is_file());
        }
        assert!(root.join("index.php").exists());
        assert!(manager.paths().manifest_file().is_file());
        assert!(manager.paths().report_file().is_file());

        let stats = manifest.statistics();
        assert_eq!(stats.moved_count, 2);
        assert_eq!(stats.success_rate, 100.0);
        assert!(manifest.project_state.files.contains_key("composer.json"));
    }

    #[test]
    fn test_insufficient_space_moves_nothing() {
        let (temp, manager, results) = setup();
        let total = ("<?php // test".len() + "<?php phpinfo();".len()) as u64;
        let mut manager = manager.with_space_probe(Box::new(FixedSpace(total)));

        let err = manager.create_backup(results, false).unwrap_err();
        match err {
            StowawayError::InsufficientDiskSpace {
                required,
                available,
            } => {
                assert_eq!(available, total);
                assert!(required > available);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(temp.path().join("tests/FooTest.php").exists());
        assert!(temp.path().join("debug.php").exists());
        assert!(!manager.paths().backup_root().exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let (temp, mut manager, results) = setup();
        let manifest = manager.create_backup(results, true).unwrap();
        assert!(manifest.moved_files().is_empty());
        assert_eq!(manifest.statistics().candidate_count, 2);
        assert!(manifest.statistics().total_candidate_bytes > 0);
        assert!(temp.path().join("debug.php").exists());
        assert!(!manager.has_backup());
    }

    #[test]
    fn test_no_candidates_returns_empty_manifest() {
        let (_temp, mut manager, _) = setup();
        let results: BTreeMap<_, _> = [verdict("index.php", FileCategory::Essential)]
            .into_iter()
            .collect();
        let manifest = manager.create_backup(results, false).unwrap();
        assert!(manifest.is_empty());
        assert!(!manager.has_backup());
    }

    #[test]
    fn test_missing_candidate_is_recorded_and_batch_continues() {
        let (temp, mut manager, results) = setup();
        fs::remove_file(temp.path().join("debug.php")).unwrap();

        let manifest = manager.create_backup(results, false).unwrap();
        assert_eq!(manifest.moved_files().len(), 1);
        assert!(manifest.errors().contains_key("debug.php"));
        assert!(manifest.moved_files().contains_key("tests/FooTest.php"));
    }

    #[test]
    fn test_second_backup_is_refused_while_files_are_held() {
        let (temp, mut manager, results) = setup();
        manager.create_backup(results.clone(), false).unwrap();

        write(temp.path(), "debug.php", "<?php // again");
        let err = manager.create_backup(results, false).unwrap_err();
        assert!(matches!(err, StowawayError::BackupExists { moved: 2, .. }));
        assert!(temp.path().join("debug.php").exists());
    }

    #[test]
    fn test_restore_file_and_conflict_rename() {
        let (temp, mut manager, results) = setup();
        let root = temp.path();
        manager.create_backup(results, false).unwrap();

        write(root, "debug.php", "<?php // newer local copy");
        let aside = manager
            .restore_file("moved-files/debug.php", "debug.php")
            .unwrap()
            .expect("existing file moved aside");

        assert_eq!(fs::read_to_string(root.join("debug.php")).unwrap(), "<?php phpinfo();");
        assert_eq!(fs::read_to_string(&aside).unwrap(), "<?php // newer local copy");
        assert!(aside.to_string_lossy().contains("debug.php.conflict."));
        // copy, not move
        assert!(manager
            .paths()
            .resolve_backup("moved-files/debug.php")
            .unwrap()
            .exists());
    }

    #[test]
    fn test_restore_all() {
        let (temp, mut manager, results) = setup();
        manager.create_backup(results, false).unwrap();
        manager.reload();

        assert!(manager.restore_all().unwrap());
        assert!(temp.path().join("tests/FooTest.php").exists());
        assert!(temp.path().join("debug.php").exists());
        assert_eq!(manager.backup_statistics().unwrap().moved_count, 2);
    }

    #[test]
    fn test_missing_backup_file() {
        let (_temp, manager, _) = setup();
        let err = manager
            .restore_file("moved-files/nope.php", "nope.php")
            .unwrap_err();
        assert!(matches!(err, StowawayError::BackupFileMissing { .. }));
    }

    #[test]
    fn test_manifest_without_backup() {
        let (_temp, mut manager, _) = setup();
        assert!(matches!(manager.manifest(), Err(StowawayError::NoBackup(_))));
    }

    #[test]
    fn test_mismatched_copy_is_removed() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "backup.php", "<?php // backup");
        write(root, "debug.php", "<?php // truncated");

        let err = keep_matching_copy(
            &root.join("backup.php"),
            &root.join("debug.php"),
            None,
            "debug.php",
        )
        .unwrap_err();

        assert!(matches!(err, StowawayError::IntegrityMismatch { .. }));
        assert!(!root.join("debug.php").exists());
    }

    #[test]
    fn test_mismatched_copy_puts_existing_file_back() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "backup.php", "<?php // backup");
        write(root, "debug.php", "<?php // truncated");
        write(root, "debug.php.conflict.20260101-000000", "<?php // local");

        let aside = root.join("debug.php.conflict.20260101-000000");
        let err = keep_matching_copy(
            &root.join("backup.php"),
            &root.join("debug.php"),
            Some(&aside),
            "debug.php",
        )
        .unwrap_err();

        assert!(matches!(err, StowawayError::IntegrityMismatch { .. }));
        assert_eq!(fs::read_to_string(root.join("debug.php")).unwrap(), "<?php // local");
        assert!(!aside.exists());
    }

    #[test]
    fn test_matching_copy_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "backup.php", "<?php");
        write(root, "debug.php", "<?php");

        keep_matching_copy(&root.join("backup.php"), &root.join("debug.php"), None, "debug.php")
            .unwrap();
        assert!(root.join("debug.php").exists());
    }

    #[test]
    fn test_tampered_manifest_is_refused_before_any_restore() {
        let (temp, mut manager, _) = setup();
        let root = temp.path();
        write(root, "stowaway-backup/moved-files/x.txt", "outside");
        write(
            root,
            "stowaway-backup/manifest.json",
            r#"{"created_at": "2026-01-01T00:00:00Z", "project_root": "/p",
                "moved_files": {"../escaped.txt": "moved-files/x.txt"}}"#,
        );

        let err = manager.manifest().unwrap_err();
        assert!(matches!(err, StowawayError::Manifest(_)));
        assert!(err.is_precondition());
        assert!(manager.restore_all().is_err());
        assert!(!root.parent().unwrap().join("escaped.txt").exists());
    }

    #[test]
    fn test_unsafe_candidate_is_a_per_file_error() {
        let (temp, mut manager, mut results) = setup();
        results.insert(
            "../outside.php".to_string(),
            FileAnalysisResult::builder("../outside.php", "classifier")
                .category(FileCategory::NonEssential)
                .add_confidence(85)
                .build(),
        );

        let manifest = manager.create_backup(results, false).unwrap();
        assert!(manifest.errors().contains_key("../outside.php"));
        assert!(manifest.moved_files().contains_key("debug.php"));
        assert!(!temp.path().join("debug.php").exists());
    }
}
