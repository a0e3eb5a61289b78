//! CLI command handlers
//!
//! This module contains the implementation of the two binaries,
//! bridging the clap argument parsing with the analysis and backup layers.

pub mod analyze;
pub mod prompt;
pub mod restore;

use std::path::{Path, PathBuf};

pub use analyze::{run_analyze, AnalyzeArgs};
pub use restore::{run_restore, RestoreArgs};

use crate::config::{ProjectPaths, Settings};
use crate::error::{StowawayError, StowawayResult};

/// Resolve the project root and load its settings
///
/// The root defaults to the current directory. The backup root honors
/// `STOWAWAY_BACKUP_DIR`, else the configured backup directory name.
pub fn open_project(project: Option<&Path>) -> StowawayResult<(ProjectPaths, Settings)> {
    let root = match project {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let root: PathBuf = root.canonicalize().map_err(|e| {
        StowawayError::Config(format!("Cannot open project {}: {}", root.display(), e))
    })?;

    let defaults = Settings::default();
    let probe = ProjectPaths::new(&root, &defaults.backup_dir);
    let settings = Settings::load_or_default(&probe)?;
    let paths = ProjectPaths::new(&root, &settings.backup_dir);

    Ok((paths, settings))
}

/// Whether to emit ANSI colors on stdout
pub(crate) fn use_color() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}
