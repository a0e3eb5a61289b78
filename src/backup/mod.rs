//! Backup and restore for stowaway
//!
//! Moves non-essential files out of the project into a backup store and puts
//! them back on request.
//!
//! # Architecture
//!
//! - `BackupManager`: moves candidates into `<backup>/moved-files`, writes the
//!   manifest and the Markdown report, and offers a simple copy-back restore
//! - `RestorationService`: configurable restores (conflict strategies, restore
//!   methods, verification, rollback) with an append-only audit log
//!
//! # Backup Layout
//!
//! ```text
//! <backup>/
//!   manifest.json
//!   restore-log.jsonl
//!   moved-files/<original relative path>
//!   reports/backup-report.md
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use stowaway::backup::{BackupManager, RestorationService};
//! use stowaway::models::RestoreOptions;
//!
//! let mut manager = BackupManager::new(paths, settings);
//! let manifest = manager.create_backup(results, false)?;
//!
//! // Later, put one file back
//! let mut service = RestorationService::new(manager);
//! let result = service.restore_file("tests/FooTest.php", RestoreOptions::default())?;
//! println!("{}", result.message);
//! ```

mod manager;
mod report;
mod restore;

use std::path::{Path, PathBuf};

use chrono::Local;

pub use manager::BackupManager;
pub use report::render as render_report;
pub use restore::RestorationService;

/// A free sibling path `<path>.<tag>.<timestamp>` for setting a file aside
pub(crate) fn unique_sibling(path: &Path, tag: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let base = format!("{}.{}.{}", path.display(), tag, stamp);

    let mut candidate = PathBuf::from(&base);
    let mut n = 1;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{}-{}", base, n));
        n += 1;
    }
    candidate
}
