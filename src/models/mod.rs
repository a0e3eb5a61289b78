//! Core data models for stowaway
//!
//! This module contains the data structures shared by the classification
//! pipeline and the backup subsystem: per-file verdicts, the backup manifest,
//! and the transient records produced by restores.

pub mod analysis;
pub mod manifest;
pub mod restoration;

pub use analysis::{
    AnalysisBuilder, FileAnalysisResult, FileCategory, MetadataValue, RecommendedAction,
};
pub use manifest::{BackupManifest, BackupStatistics, ConfidenceBuckets, KeyFileState, ProjectState};
pub use restoration::{
    BatchRestorationResult, ConflictAction, ConflictResolution, ConflictStrategy,
    PrerequisiteReport, RestorationResult, RestoreMethod, RestoreOptions, VerificationResult,
};
