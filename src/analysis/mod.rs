//! File classification
//!
//! Four independent analyzers each look at a file from one angle of
//! evidence; the `Classifier` runs them all and reconciles their verdicts.

pub mod autoload;
pub mod classifier;
pub mod dependency;
pub mod functional;
pub mod pattern;
pub mod source_tree;
pub mod tokens;
pub mod usage;

pub use autoload::AutoloadMap;
pub use classifier::Classifier;
pub use dependency::DependencyAnalyzer;
pub use functional::FunctionalAnalyzer;
pub use pattern::PatternAnalyzer;
pub use source_tree::SourceTree;
pub use usage::UsageAnalyzer;

use crate::models::FileAnalysisResult;

/// One classification strategy
///
/// Analyzers precompute whatever they need from the source tree at
/// construction and are read-only afterwards, so a single instance can
/// classify many files from several threads.
pub trait Analyzer: Send + Sync {
    /// Short name recorded on every verdict
    fn name(&self) -> &'static str;

    /// Classify one project-relative path
    fn analyze(&self, path: &str) -> FileAnalysisResult;

    fn can_analyze(&self, _path: &str) -> bool {
        true
    }

    /// Higher wins when verdicts disagree
    fn priority(&self) -> u8;
}
