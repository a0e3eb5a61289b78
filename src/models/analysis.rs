//! Per-file classification verdicts
//!
//! A `FileAnalysisResult` is produced once per analyzer per file and is never
//! mutated afterwards. Analyzers assemble one through `AnalysisBuilder`; the
//! recommended action is always derived from the category.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How load-bearing a file is for the running application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Essential,
    NonEssential,
    Uncertain,
}

impl FileCategory {
    /// All categories in report order
    pub fn all() -> &'static [Self] {
        &[Self::Essential, Self::NonEssential, Self::Uncertain]
    }

    /// The action implied by this category
    pub fn action(self) -> RecommendedAction {
        match self {
            Self::Essential => RecommendedAction::Keep,
            Self::NonEssential => RecommendedAction::Move,
            Self::Uncertain => RecommendedAction::Review,
        }
    }

    /// Serialized name, also used as a statistics key
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Essential => "essential",
            Self::NonEssential => "non_essential",
            Self::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Essential => write!(f, "Essential"),
            Self::NonEssential => write!(f, "Non-essential"),
            Self::Uncertain => write!(f, "Uncertain"),
        }
    }
}

/// What to do with a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Keep,
    Move,
    Review,
}

impl RecommendedAction {
    /// All actions in report order
    pub fn all() -> &'static [Self] {
        &[Self::Keep, Self::Move, Self::Review]
    }

    /// Serialized name, also used as a statistics key
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Move => "move",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => write!(f, "Keep"),
            Self::Move => write!(f, "Move"),
            Self::Review => write!(f, "Review"),
        }
    }
}

/// An analyzer-specific fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
            Self::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// One analyzer's verdict for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FileAnalysisRecord")]
pub struct FileAnalysisResult {
    file_path: String,
    category: FileCategory,
    confidence_score: u8,
    recommended_action: RecommendedAction,
    reasons: Vec<String>,
    dependencies: BTreeSet<String>,
    references: BTreeSet<String>,
    metadata: BTreeMap<String, MetadataValue>,
    analyzer: String,
}

/// Wire shape of a result; the action is re-derived on load
#[derive(Deserialize)]
struct FileAnalysisRecord {
    file_path: String,
    category: FileCategory,
    confidence_score: u8,
    #[serde(default)]
    reasons: Vec<String>,
    #[serde(default)]
    dependencies: BTreeSet<String>,
    #[serde(default)]
    references: BTreeSet<String>,
    #[serde(default)]
    metadata: BTreeMap<String, MetadataValue>,
    #[serde(default)]
    analyzer: String,
}

impl From<FileAnalysisRecord> for FileAnalysisResult {
    fn from(record: FileAnalysisRecord) -> Self {
        Self {
            file_path: record.file_path,
            category: record.category,
            confidence_score: record.confidence_score.min(100),
            recommended_action: record.category.action(),
            reasons: record.reasons,
            dependencies: record.dependencies,
            references: record.references,
            metadata: record.metadata,
            analyzer: record.analyzer,
        }
    }
}

impl FileAnalysisResult {
    /// Start building a verdict for a file
    pub fn builder(file_path: impl Into<String>, analyzer: impl Into<String>) -> AnalysisBuilder {
        AnalysisBuilder::new(file_path, analyzer)
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn category(&self) -> FileCategory {
        self.category
    }

    pub fn confidence_score(&self) -> u8 {
        self.confidence_score
    }

    pub fn recommended_action(&self) -> RecommendedAction {
        self.recommended_action
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn references(&self) -> &BTreeSet<String> {
        &self.references
    }

    pub fn metadata(&self) -> &BTreeMap<String, MetadataValue> {
        &self.metadata
    }

    /// Name of the analyzer that produced this verdict
    pub fn analyzer(&self) -> &str {
        &self.analyzer
    }

    /// Whether this file should be moved into the backup
    pub fn is_move_candidate(&self) -> bool {
        self.recommended_action == RecommendedAction::Move
    }

    /// Read a boolean metadata flag, defaulting to false
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.metadata.get(key), Some(MetadataValue::Bool(true)))
    }
}

/// Accumulates evidence for one file, then freezes it into a result
#[derive(Debug, Clone)]
pub struct AnalysisBuilder {
    file_path: String,
    analyzer: String,
    category: FileCategory,
    confidence: u32,
    reasons: Vec<String>,
    dependencies: BTreeSet<String>,
    references: BTreeSet<String>,
    metadata: BTreeMap<String, MetadataValue>,
}

impl AnalysisBuilder {
    fn new(file_path: impl Into<String>, analyzer: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            analyzer: analyzer.into(),
            category: FileCategory::Uncertain,
            confidence: 0,
            reasons: Vec::new(),
            dependencies: BTreeSet::new(),
            references: BTreeSet::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn category(mut self, category: FileCategory) -> Self {
        self.category = category;
        self
    }

    /// Current category, for analyzers that decide in several steps
    pub fn current_category(&self) -> FileCategory {
        self.category
    }

    /// Add weighted evidence
    pub fn add_confidence(mut self, weight: u32) -> Self {
        self.confidence = self.confidence.saturating_add(weight);
        self
    }

    /// Raise confidence to at least `score`, never lowering it
    pub fn raise_confidence(mut self, score: u32) -> Self {
        self.confidence = self.confidence.max(score);
        self
    }

    /// Apply a lower bound to the accumulated confidence
    pub fn confidence_floor(mut self, floor: u32) -> Self {
        self.confidence = self.confidence.max(floor);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    pub fn dependency(mut self, path: impl Into<String>) -> Self {
        self.dependencies.insert(path.into());
        self
    }

    pub fn dependencies<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn references<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Insert metadata only when the key is not already present
    pub fn metadata_if_absent(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.entry(key.into()).or_insert(value);
        self
    }

    /// Freeze the verdict, clamping confidence into 0..=100
    pub fn build(self) -> FileAnalysisResult {
        FileAnalysisResult {
            file_path: self.file_path,
            category: self.category,
            confidence_score: self.confidence.min(100) as u8,
            recommended_action: self.category.action(),
            reasons: self.reasons,
            dependencies: self.dependencies,
            references: self.references,
            metadata: self.metadata,
            analyzer: self.analyzer,
        }
    }
}
