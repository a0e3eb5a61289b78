//! Path management for stowaway
//!
//! Every path the tool touches is derived from two roots: the project being
//! cleaned up and the backup root that receives moved files.
//!
//! ## Backup Root Resolution Order
//!
//! 1. `STOWAWAY_BACKUP_DIR` environment variable (if set)
//! 2. `<project>/<settings.backup_dir>`

use std::path::{Component, Path, PathBuf};

use crate::error::StowawayError;

/// Subdirectory of the backup root holding the moved files
pub const MOVED_FILES_DIR: &str = "moved-files";

/// Subdirectory of the backup root holding generated reports
pub const REPORTS_DIR: &str = "reports";

/// Manages all paths used by stowaway
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    /// Root of the project being analyzed
    project_root: PathBuf,
    /// Root of the backup store
    backup_root: PathBuf,
}

impl ProjectPaths {
    /// Create paths for a project, honoring `STOWAWAY_BACKUP_DIR`
    pub fn new(project_root: impl Into<PathBuf>, backup_dir: &str) -> Self {
        let project_root = project_root.into();
        let backup_root = match std::env::var("STOWAWAY_BACKUP_DIR") {
            Ok(custom) if !custom.trim().is_empty() => PathBuf::from(custom),
            _ => project_root.join(backup_dir),
        };

        Self {
            project_root,
            backup_root,
        }
    }

    /// Create paths with an explicit backup root (useful for testing)
    pub fn with_backup_root(project_root: impl Into<PathBuf>, backup_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            backup_root: backup_root.into(),
        }
    }

    /// Get the project root
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the backup root
    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Get the directory holding moved files (<backup>/moved-files/)
    pub fn moved_files_dir(&self) -> PathBuf {
        self.backup_root.join(MOVED_FILES_DIR)
    }

    /// Get the reports directory (<backup>/reports/)
    pub fn reports_dir(&self) -> PathBuf {
        self.backup_root.join(REPORTS_DIR)
    }

    /// Get the path to manifest.json
    pub fn manifest_file(&self) -> PathBuf {
        self.backup_root.join("manifest.json")
    }

    /// Get the path to the Markdown backup report
    pub fn report_file(&self) -> PathBuf {
        self.reports_dir().join("backup-report.md")
    }

    /// Get the path to the restore audit log
    pub fn audit_log(&self) -> PathBuf {
        self.backup_root.join("restore-log.jsonl")
    }

    /// Get the path to the per-project settings file
    pub fn settings_file(&self) -> PathBuf {
        self.project_root.join("stowaway.json")
    }

    /// Backup-relative location for an original project-relative path
    pub fn backup_relative(&self, original: &str) -> String {
        format!("{}/{}", MOVED_FILES_DIR, original.trim_start_matches('/'))
    }

    /// Absolute location of a backup-relative path
    ///
    /// Fails for anything but a normalized relative path, so a tampered
    /// manifest cannot point outside the backup root.
    pub fn resolve_backup(&self, backup_relative: &str) -> Result<PathBuf, StowawayError> {
        Ok(self.backup_root.join(checked_relative(backup_relative)?))
    }

    /// Absolute location of a project-relative path
    pub fn resolve_original(&self, original: &str) -> Result<PathBuf, StowawayError> {
        Ok(self.project_root.join(checked_relative(original)?))
    }

    /// Project-relative name of the backup root, if it lives inside the project
    pub fn backup_dir_in_project(&self) -> Option<String> {
        self.backup_root
            .strip_prefix(&self.project_root)
            .ok()
            .map(to_relative_string)
    }

    /// Ensure the backup directory tree exists
    ///
    /// Creates:
    /// - Backup root
    /// - Moved files directory (<backup>/moved-files/)
    /// - Reports directory (<backup>/reports/)
    pub fn ensure_directories(&self) -> Result<(), StowawayError> {
        std::fs::create_dir_all(&self.backup_root)
            .map_err(|e| StowawayError::Io(format!("Failed to create backup directory: {}", e)))?;

        std::fs::create_dir_all(self.moved_files_dir()).map_err(|e| {
            StowawayError::Io(format!("Failed to create moved-files directory: {}", e))
        })?;

        std::fs::create_dir_all(self.reports_dir())
            .map_err(|e| StowawayError::Io(format!("Failed to create reports directory: {}", e)))?;

        Ok(())
    }
}

/// Render a relative path with `/` separators regardless of platform
pub fn to_relative_string(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Accept only a non-empty path that is already normalized and relative
pub fn checked_relative(path: &str) -> Result<&str, StowawayError> {
    let plain = Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    match normalize_relative(path) {
        Some(normal) if plain && !normal.is_empty() && normal == path => Ok(path),
        _ => Err(StowawayError::Manifest(format!(
            "Path escapes its root or is not normalized: {}",
            path
        ))),
    }
}

/// Normalize a `/`-separated relative path, resolving `.` and `..`
///
/// Returns `None` when `..` would climb above the project root.
pub fn normalize_relative(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(&['/', '\\'][..]) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_layout() {
        let temp_dir = TempDir::new().unwrap();
        let backup = temp_dir.path().join("stowaway-backup");
        let paths = ProjectPaths::with_backup_root(temp_dir.path(), &backup);

        assert_eq!(paths.moved_files_dir(), backup.join("moved-files"));
        assert_eq!(paths.manifest_file(), backup.join("manifest.json"));
        assert_eq!(
            paths.report_file(),
            backup.join("reports").join("backup-report.md")
        );
        assert_eq!(
            paths.backup_dir_in_project().as_deref(),
            Some("stowaway-backup")
        );
    }

    #[test]
    fn test_backup_relative() {
        let paths = ProjectPaths::with_backup_root("/p", "/p/b");
        assert_eq!(paths.backup_relative("tests/FooTest.php"), "moved-files/tests/FooTest.php");
        assert_eq!(
            paths.resolve_backup("moved-files/a.txt").unwrap(),
            PathBuf::from("/p/b/moved-files/a.txt")
        );
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ProjectPaths::with_backup_root(temp_dir.path(), temp_dir.path().join("bk"));

        paths.ensure_directories().unwrap();

        assert!(paths.moved_files_dir().exists());
        assert!(paths.reports_dir().exists());
    }

    #[test]
    fn test_normalize_relative() {
        assert_eq!(normalize_relative("src/./a/../b.php").as_deref(), Some("src/b.php"));
        assert_eq!(normalize_relative("a\\b.php").as_deref(), Some("a/b.php"));
        assert_eq!(normalize_relative("../outside.php"), None);
    }

    #[test]
    fn test_resolve_refuses_escaping_paths() {
        let paths = ProjectPaths::with_backup_root("/p", "/p/b");

        assert!(paths.resolve_original("src/a.php").is_ok());
        for bad in ["../x.txt", "/etc/passwd", "src/../a.php", "./a.php", "a\\b.php", ""] {
            assert!(paths.resolve_original(bad).is_err(), "{:?} accepted", bad);
        }
        assert!(paths.resolve_backup("moved-files/../../y").is_err());
        assert!(paths
            .resolve_backup("moved-files/../../y")
            .unwrap_err()
            .is_precondition());
    }
}
