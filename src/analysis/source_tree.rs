//! Project file discovery and content access
//!
//! `SourceTree` is the only view of the project the analyzers get: the root
//! path, the list of analyzable files, the autoload map, and lazily-read text
//! contents shared across analyzers and threads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::autoload::AutoloadMap;
use crate::config::paths::to_relative_string;
use crate::config::Settings;
use crate::error::{StowawayError, StowawayResult};

/// The set of files under analysis
#[derive(Debug)]
pub struct SourceTree {
    root: PathBuf,
    files: Vec<String>,
    contents: HashMap<String, OnceCell<Option<String>>>,
    autoload: AutoloadMap,
    max_scan_bytes: u64,
}

impl SourceTree {
    /// Walk the project root, skipping excluded and backup directories
    pub fn discover(root: &Path, settings: &Settings) -> StowawayResult<Self> {
        if !root.is_dir() {
            return Err(StowawayError::Config(format!(
                "Project root is not a directory: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !settings.is_excluded_dir(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).display().to_string();
                    warn!("Skipping unreadable entry {}: {}", path, e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if let Ok(relative) = entry.path().strip_prefix(root) {
                files.push(to_relative_string(relative));
            }
        }

        info!("Discovered {} files under {}", files.len(), root.display());
        Ok(Self::from_files(root, files, settings))
    }

    /// Build a tree from an externally supplied file list
    pub fn from_files(root: &Path, files: Vec<String>, settings: &Settings) -> Self {
        let mut files = files;
        files.sort();
        files.dedup();

        let contents = files
            .iter()
            .map(|f| (f.clone(), OnceCell::new()))
            .collect();

        let autoload = AutoloadMap::load(root, &settings.autoload_config);
        debug!("Autoload roots: {:?}", autoload.psr4_roots());

        Self {
            root: root.to_path_buf(),
            files,
            contents,
            autoload,
            max_scan_bytes: settings.max_scan_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sorted project-relative paths
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn contains(&self, path: &str) -> bool {
        self.contents.contains_key(path)
    }

    pub fn autoload(&self) -> &AutoloadMap {
        &self.autoload
    }

    /// Text contents of a file, read once on first access
    ///
    /// Returns `None` for unknown paths, unreadable or oversized files, and
    /// content that is not valid UTF-8.
    pub fn content(&self, path: &str) -> Option<&str> {
        let cell = self.contents.get(path)?;
        cell.get_or_init(|| self.read_text(path)).as_deref()
    }

    fn read_text(&self, path: &str) -> Option<String> {
        let full = self.root.join(path);
        let size = std::fs::metadata(&full).ok()?.len();
        if size > self.max_scan_bytes {
            debug!("Skipping content scan of {} ({} bytes)", path, size);
            return None;
        }
        let bytes = std::fs::read(&full).ok()?;
        String::from_utf8(bytes).ok()
    }
}

/// Extension of a relative path as written, empty when there is none
pub fn extension(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &name[idx + 1..],
    }
}

/// Final path segment
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Directory part of a relative path, empty for top-level files
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|idx| &path[..idx]).unwrap_or("")
}
