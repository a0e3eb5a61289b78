//! Audit entry data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Restore-side operations that are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// A file was put back at its original location
    Restore,
    /// A restore was deliberately not performed
    Skip,
    /// An existing file was copied aside before being replaced
    PreserveConflict,
    /// A restore failed and was cleaned up
    Failure,
    /// An entry was removed from the manifest
    ManifestUpdate,
    /// A complete rollback started or finished
    Rollback,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Restore => write!(f, "RESTORE"),
            Operation::Skip => write!(f, "SKIP"),
            Operation::PreserveConflict => write!(f, "PRESERVE"),
            Operation::Failure => write!(f, "FAILURE"),
            Operation::ManifestUpdate => write!(f, "MANIFEST"),
            Operation::Rollback => write!(f, "ROLLBACK"),
        }
    }
}

/// A single audit log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the operation occurred (UTC)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    /// Project-relative original path, or `*` for whole-backup operations
    pub path: String,

    /// Backup run the operation applied to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<Uuid>,

    /// Restore method used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Where a pre-existing file was copied to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserved_path: Option<String>,

    /// Human-readable detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    pub fn new(operation: Operation, path: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            path: path.into(),
            backup_id: None,
            method: None,
            preserved_path: None,
            detail: None,
        }
    }

    pub fn with_backup_id(mut self, backup_id: Uuid) -> Self {
        self.backup_id = Some(backup_id);
        self
    }

    pub fn with_method(mut self, method: impl ToString) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn with_preserved_path(mut self, path: impl Into<String>) -> Self {
        self.preserved_path = Some(path.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// One-line rendering for terminal output
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.operation,
            self.path
        );
        if let Some(detail) = &self.detail {
            line.push_str(" - ");
            line.push_str(detail);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_are_omitted() {
        let entry = AuditEntry::new(Operation::Skip, "a.php");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["operation"], "skip");
        assert!(json.get("method").is_none());
        assert!(json.get("preserved_path").is_none());
    }

    #[test]
    fn test_summary() {
        let entry = AuditEntry::new(Operation::Restore, "tests/FooTest.php")
            .with_method("copy")
            .with_detail("verified");
        assert!(entry.summary().ends_with("RESTORE tests/FooTest.php - verified"));
        assert_eq!(entry.method.as_deref(), Some("copy"));
    }
}
