//! Custom error types for stowaway
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. Errors fall into three groups: precondition
//! failures that abort an operation before anything is touched, per-file
//! failures that are recorded against a single path, and general I/O or
//! serialization failures.

use thiserror::Error;

/// The main error type for stowaway operations
#[derive(Error, Debug)]
pub enum StowawayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// A classification pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// No backup exists at the configured backup root
    #[error("No backup found at {0}")]
    NoBackup(String),

    /// The manifest is missing, cannot be parsed, or breaks its invariants
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Not enough free space for the candidate files
    #[error("Insufficient disk space: required {required} bytes, available {available} bytes")]
    InsufficientDiskSpace { required: u64, available: u64 },

    /// An earlier backup still holds moved files
    #[error("A backup at {path} still holds {moved} moved file(s); restore it before backing up again")]
    BackupExists { path: String, moved: usize },

    /// Complete rollback was requested without explicit confirmation
    #[error("Complete rollback requires confirm_rollback = true")]
    RollbackNotConfirmed,

    /// The restoration prerequisites did not hold
    #[error("Restoration prerequisites failed: {0}")]
    Prerequisites(String),

    /// A single file could not be moved into the backup
    #[error("Failed to move {path}: {reason}")]
    MoveFailed { path: String, reason: String },

    /// The manifest has no entry for the requested path
    #[error("File not found in backup manifest: {0}")]
    NotInBackup(String),

    /// The manifest lists a backup file that is not on disk
    #[error("Backup file missing for {path}: {backup_path}")]
    BackupFileMissing { path: String, backup_path: String },

    /// A restored file does not match its backup
    #[error("Integrity check failed for {path}: {reason}")]
    IntegrityMismatch { path: String, reason: String },

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),
}

impl StowawayError {
    /// Create a move failure for a path
    pub fn move_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MoveFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an integrity failure for a path
    pub fn integrity(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IntegrityMismatch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a "not in backup" error
    ///
    /// Batch restores count these as skipped rather than failed.
    pub fn is_not_in_backup(&self) -> bool {
        matches!(self, Self::NotInBackup(_))
    }

    /// Check if this error is raised before any filesystem mutation
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NoBackup(_)
                | Self::Manifest(_)
                | Self::InsufficientDiskSpace { .. }
                | Self::BackupExists { .. }
                | Self::RollbackNotConfirmed
                | Self::Prerequisites(_)
        )
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for StowawayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StowawayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<regex::Error> for StowawayError {
    fn from(err: regex::Error) -> Self {
        Self::Pattern(err.to_string())
    }
}

impl From<csv::Error> for StowawayError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

/// Result type alias for stowaway operations
pub type StowawayResult<T> = Result<T, StowawayError>;
