//! Configuration module for stowaway
//!
//! This module provides configuration management including:
//! - Project and backup path resolution
//! - Per-project settings persistence

pub mod paths;
pub mod settings;

pub use paths::ProjectPaths;
pub use settings::Settings;
