//! Restoration service
//!
//! Configurable restores on top of `BackupManager`: conflict strategies,
//! restore methods, post-restore verification with cleanup, batch and
//! directory restores, and the confirmed complete rollback. Every outcome is
//! appended to the audit log.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::manager::BackupManager;
use super::unique_sibling;
use crate::audit::{AuditEntry, AuditLogger, Operation};
use crate::config::paths::normalize_relative;
use crate::error::{StowawayError, StowawayResult};
use crate::models::{
    BatchRestorationResult, ConflictAction, ConflictResolution, ConflictStrategy,
    PrerequisiteReport, RestorationResult, RestoreMethod, RestoreOptions, VerificationResult,
};
use crate::storage::{file_digest, hash_file, FileDigest};

/// Handles restoring files out of a backup
pub struct RestorationService {
    manager: BackupManager,
    audit: AuditLogger,
}

impl RestorationService {
    pub fn new(manager: BackupManager) -> Self {
        let audit = AuditLogger::new(manager.paths().audit_log());
        Self { manager, audit }
    }

    pub fn manager(&self) -> &BackupManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut BackupManager {
        &mut self.manager
    }

    pub fn audit_log(&self) -> &AuditLogger {
        &self.audit
    }

    /// Restore one file to its original location
    ///
    /// Skips (strategy `Skip`, identical content, newer existing file) come
    /// back as `Ok` with `skipped` set. Hard failures are audited and
    /// returned as errors.
    pub fn restore_file(
        &mut self,
        original: &str,
        options: RestoreOptions,
    ) -> StowawayResult<RestorationResult> {
        let original = normalize_relative(original).unwrap_or_else(|| original.to_string());

        match self.restore_one(&original, options) {
            Ok(result) => Ok(result),
            Err(e) => {
                if !e.is_not_in_backup() && !e.is_precondition() {
                    self.audit_entry(
                        AuditEntry::new(Operation::Failure, original.as_str())
                            .with_method(options.method)
                            .with_detail(e.to_string()),
                    );
                }
                Err(e)
            }
        }
    }

    fn restore_one(
        &mut self,
        original: &str,
        options: RestoreOptions,
    ) -> StowawayResult<RestorationResult> {
        let backup_relative = self
            .manager
            .manifest()?
            .backup_path_for(original)
            .map(str::to_string)
            .ok_or_else(|| StowawayError::NotInBackup(original.to_string()))?;

        let backup = self.manager.paths().resolve_backup(&backup_relative)?;
        if !backup.is_file() {
            return Err(StowawayError::BackupFileMissing {
                path: original.to_string(),
                backup_path: backup.display().to_string(),
            });
        }

        // Measured before restoring so a Move can still be verified
        let expected = file_digest(&backup)?;
        let target = self.manager.paths().resolve_original(original)?;

        let conflict =
            resolve_conflict(&target, &backup, &expected, options.conflict_resolution)?;

        if !conflict.proceed {
            debug!("Skipping {}: {}", original, conflict.message);
            self.audit_entry(
                AuditEntry::new(Operation::Skip, original)
                    .with_method(options.method)
                    .with_detail(conflict.message.clone()),
            );
            return Ok(RestorationResult {
                original_path: original.to_string(),
                backup_path: backup_relative,
                success: false,
                skipped: true,
                method: options.method,
                message: conflict.message.clone(),
                conflict,
                verification: None,
            });
        }

        if let Some(preserved) = &conflict.preserved_path {
            self.audit_entry(
                AuditEntry::new(Operation::PreserveConflict, original)
                    .with_preserved_path(preserved.display().to_string()),
            );
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        if target.symlink_metadata().is_ok() {
            fs::remove_file(&target)?;
        }

        place_file(&backup, &target, options.method)
            .map_err(|e| StowawayError::Io(format!("Failed to restore {}: {}", original, e)))?;

        let verification = verify_restored(&target, &expected);
        if !verification.verified {
            self.roll_back(&backup, &target, options.method);
            return Err(StowawayError::integrity(original, verification.message));
        }

        if options.method == RestoreMethod::Move {
            self.forget(original, &backup_relative)?;
        }

        let mut entry = AuditEntry::new(Operation::Restore, original).with_method(options.method);
        if let Some(preserved) = &conflict.preserved_path {
            entry = entry.with_preserved_path(preserved.display().to_string());
        }
        self.audit_entry(entry);
        info!("Restored {} ({})", original, options.method);

        Ok(RestorationResult {
            original_path: original.to_string(),
            backup_path: backup_relative,
            success: true,
            skipped: false,
            method: options.method,
            message: format!("Restored via {}", options.method),
            conflict,
            verification: Some(verification),
        })
    }

    /// Undo a restore that failed verification
    fn roll_back(&self, backup: &Path, target: &Path, method: RestoreMethod) {
        let outcome = if method == RestoreMethod::Move && !backup.exists() {
            fs::rename(target, backup)
        } else {
            fs::remove_file(target)
        };
        if let Err(e) = outcome {
            warn!("Cleanup after failed restore of {} failed: {}", target.display(), e);
        }
    }

    /// Drop a moved-back file from the manifest and persist it
    fn forget(&mut self, original: &str, backup_relative: &str) -> StowawayResult<()> {
        let backup_id = {
            let manifest = self.manager.manifest_mut()?;
            manifest.remove_moved(original);
            manifest.backup_id
        };
        self.manager.save_manifest()?;
        self.audit_entry(
            AuditEntry::new(Operation::ManifestUpdate, original)
                .with_backup_id(backup_id)
                .with_detail(format!("removed {}", backup_relative)),
        );
        Ok(())
    }

    /// Restore several files in order
    ///
    /// Paths missing from the manifest count as skipped. With `fail_fast`
    /// the batch ends at the first hard failure; skips never end it.
    pub fn restore_files(
        &mut self,
        paths: &[String],
        options: RestoreOptions,
    ) -> StowawayResult<BatchRestorationResult> {
        let mut batch = BatchRestorationResult {
            total: paths.len(),
            ..Default::default()
        };

        for path in paths {
            match self.restore_file(path, options) {
                Ok(result) => {
                    if result.success {
                        batch.success_count += 1;
                    } else {
                        batch.skipped_count += 1;
                    }
                    batch.results.push(result);
                }
                Err(e) if e.is_not_in_backup() => {
                    warn!("{}", e);
                    batch.skipped_count += 1;
                }
                Err(e) if e.is_precondition() => return Err(e),
                Err(e) => {
                    warn!("{}", e);
                    batch.error_count += 1;
                    batch.errors.insert(path.clone(), e.to_string());
                    if options.fail_fast {
                        batch.stopped_early = true;
                        break;
                    }
                }
            }
        }

        info!("{}", batch.summary());
        Ok(batch)
    }

    /// Restore every manifest entry under a directory prefix
    pub fn restore_directory(
        &mut self,
        directory: &str,
        options: RestoreOptions,
    ) -> StowawayResult<BatchRestorationResult> {
        let prefix = normalize_relative(directory).unwrap_or_default();
        let paths: Vec<String> = self
            .manager
            .manifest()?
            .moved_files()
            .keys()
            .filter(|path| is_within(path, &prefix))
            .cloned()
            .collect();

        if paths.is_empty() {
            info!("No backed-up files under {}", directory);
        }
        self.restore_files(&paths, options)
    }

    /// Move every file back out of the backup store
    ///
    /// Refuses unless `confirm_rollback` is set, before touching anything.
    pub fn perform_complete_rollback(
        &mut self,
        options: RestoreOptions,
    ) -> StowawayResult<BatchRestorationResult> {
        if !options.confirm_rollback {
            return Err(StowawayError::RollbackNotConfirmed);
        }

        let options = options.with_method(RestoreMethod::Move);
        let (backup_id, paths) = {
            let manifest = self.manager.manifest()?;
            let paths: Vec<String> = manifest.moved_files().keys().cloned().collect();
            (manifest.backup_id, paths)
        };

        info!("Rolling back {} files", paths.len());
        self.audit_entry(
            AuditEntry::new(Operation::Rollback, "*")
                .with_backup_id(backup_id)
                .with_detail(format!("started: {} files", paths.len())),
        );

        let batch = self.restore_files(&paths, options)?;
        prune_empty_dirs(&self.manager.paths().moved_files_dir());

        self.audit_entry(
            AuditEntry::new(Operation::Rollback, "*")
                .with_backup_id(backup_id)
                .with_detail(batch.summary()),
        );
        Ok(batch)
    }

    /// Check that the backup can be restored
    ///
    /// Returns `NoBackup` when there is nothing to check. Drift of the key
    /// project files is reported but never blocks.
    pub fn validate_restoration_prerequisites(&mut self) -> StowawayResult<PrerequisiteReport> {
        if !self.manager.has_backup() {
            return Err(StowawayError::NoBackup(
                self.manager.paths().backup_root().display().to_string(),
            ));
        }

        let current_state = self.manager.capture_project_state();
        let manifest = self.manager.manifest()?.clone();
        let paths = self.manager.paths();

        let mut report = PrerequisiteReport {
            backup_exists: true,
            required_bytes: manifest.statistics().moved_bytes,
            ..Default::default()
        };

        for (original, backup_relative) in manifest.moved_files() {
            if !paths.resolve_backup(backup_relative)?.is_file() {
                report.missing_backups.push(original.clone());
            }
            if paths.resolve_original(original)?.exists() {
                report.already_present.push(original.clone());
            }
        }

        report.available_bytes = self.manager.available_space(paths.project_root())?;

        if !manifest.project_state.files.is_empty() {
            report.drifted_files = manifest.project_state.drifted_files(&current_state);
            if !report.drifted_files.is_empty() {
                warn!(
                    "Project changed since backup: {}",
                    report.drifted_files.join(", ")
                );
            }
        }

        Ok(report)
    }

    fn audit_entry(&self, entry: AuditEntry) {
        if let Err(e) = self.audit.log(&entry) {
            warn!("Failed to write audit entry: {}", e);
        }
    }
}

/// Decide what to do about an existing file at the restore target
fn resolve_conflict(
    target: &Path,
    backup: &Path,
    expected: &FileDigest,
    strategy: ConflictStrategy,
) -> StowawayResult<ConflictResolution> {
    if target.symlink_metadata().is_err() {
        return Ok(ConflictResolution::no_conflict(strategy));
    }

    let resolution = |action, proceed, message: &str| ConflictResolution {
        strategy,
        action,
        proceed,
        preserved_path: None,
        message: message.to_string(),
    };

    match strategy {
        ConflictStrategy::Skip => Ok(resolution(
            ConflictAction::Skipped,
            false,
            "Target exists; skipped",
        )),
        ConflictStrategy::Overwrite => Ok(resolution(
            ConflictAction::Overwrite,
            true,
            "Existing file overwritten",
        )),
        ConflictStrategy::BackupExisting => preserve_existing(target, strategy),
        ConflictStrategy::Compare => {
            if hash_file(target)? == expected.hash {
                return Ok(resolution(
                    ConflictAction::Identical,
                    false,
                    "Existing file is identical to the backup",
                ));
            }
            if modified(target)? > modified(backup)? {
                return Ok(resolution(
                    ConflictAction::ExistingNewer,
                    false,
                    "Existing file is newer than the backup",
                ));
            }
            preserve_existing(target, strategy)
        }
    }
}

/// Copy the existing file to `<path>.conflict-backup.<timestamp>`
fn preserve_existing(
    target: &Path,
    strategy: ConflictStrategy,
) -> StowawayResult<ConflictResolution> {
    let preserved = unique_sibling(target, "conflict-backup");
    fs::copy(target, &preserved)?;
    Ok(ConflictResolution {
        strategy,
        action: ConflictAction::PreservedExisting,
        proceed: true,
        message: format!("Existing file preserved at {}", preserved.display()),
        preserved_path: Some(preserved),
    })
}

fn modified(path: &Path) -> io::Result<std::time::SystemTime> {
    fs::metadata(path)?.modified()
}

fn place_file(backup: &Path, target: &Path, method: RestoreMethod) -> io::Result<()> {
    match method {
        RestoreMethod::Copy => fs::copy(backup, target).map(|_| ()),
        RestoreMethod::Move => fs::rename(backup, target),
        RestoreMethod::Hardlink => fs::hard_link(backup, target),
        RestoreMethod::Symlink => symlink(backup, target),
    }
}

#[cfg(unix)]
fn symlink(backup: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(backup, target)
}

#[cfg(windows)]
fn symlink(backup: &Path, target: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(backup, target)
}

#[cfg(not(any(unix, windows)))]
fn symlink(_backup: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

/// Compare a restored file against the backup digest
fn verify_restored(target: &Path, expected: &FileDigest) -> VerificationResult {
    let mut result = VerificationResult {
        expected_size: expected.size,
        expected_hash: expected.hash.clone(),
        ..Default::default()
    };

    let actual = match file_digest(target) {
        Ok(digest) => digest,
        Err(e) => {
            result.message = format!("restored file unreadable: {}", e);
            return result;
        }
    };

    result.exists = true;
    result.size_matches = actual.size == expected.size;
    result.hash_matches = actual.hash == expected.hash;
    result.actual_size = Some(actual.size);
    result.actual_hash = Some(actual.hash);
    result.verified = result.size_matches && result.hash_matches;
    result.message = if result.verified {
        "Verified".to_string()
    } else if !result.size_matches {
        format!(
            "size mismatch: expected {} bytes, found {}",
            expected.size, actual.size
        )
    } else {
        "content hash mismatch".to_string()
    };
    result
}

fn is_within(path: &str, prefix: &str) -> bool {
    prefix.is_empty()
        || path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Remove directories left empty under the moved-files tree
fn prune_empty_dirs(root: &Path) {
    let dirs: Vec<_> = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();

    for dir in dirs {
        // Fails harmlessly on directories that still hold files
        if fs::remove_dir(&dir).is_ok() {
            debug!("Removed empty directory {}", dir.display());
        }
    }
}
