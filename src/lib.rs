//! stowaway - reversible cleanup for PHP codebases
//!
//! This library classifies every file of a PHP project as essential,
//! non-essential or uncertain, moves the non-essential ones into a backup
//! store, and restores them on request.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `analysis`: Analyzers (dependency, usage, functional, pattern) and the classifier
//! - `audit`: Append-only restore audit log
//! - `backup`: Backup manager, restoration service and the Markdown report
//! - `cli`: Argument parsing and handlers for the two binaries
//! - `config`: Project paths and per-project settings
//! - `display`: Terminal formatting helpers
//! - `error`: Custom error types
//! - `export`: CSV and JSON classification export
//! - `logging`: Tracing subscriber setup
//! - `models`: Verdicts, the backup manifest, restore outcomes
//! - `storage`: Atomic writes, hashing, free-space probing
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stowaway::analysis::{Classifier, SourceTree};
//! use stowaway::backup::BackupManager;
//! use stowaway::config::{ProjectPaths, Settings};
//!
//! let settings = Settings::default();
//! let paths = ProjectPaths::new("/srv/app", &settings.backup_dir);
//! let tree = Arc::new(SourceTree::discover(paths.project_root(), &settings)?);
//! let results = Classifier::standard(Arc::clone(&tree))?.classify_all(tree.files());
//!
//! let mut manager = BackupManager::new(paths, settings);
//! let manifest = manager.create_backup(results, false)?;
//! ```

pub mod analysis;
pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod storage;

pub use error::{StowawayError, StowawayResult};
