//! JSON export of classification results
//!
//! The full per-file results plus summary counts, with schema versioning.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StowawayError, StowawayResult};
use crate::models::FileAnalysisResult;

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Classification export structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationExport {
    pub schema_version: String,

    pub exported_at: DateTime<Utc>,

    /// Version of stowaway that created the export
    pub app_version: String,

    pub project_root: String,

    /// File count per category
    pub category_counts: BTreeMap<String, usize>,

    pub results: BTreeMap<String, FileAnalysisResult>,
}

impl ClassificationExport {
    pub fn new(
        project_root: impl Into<String>,
        results: &BTreeMap<String, FileAnalysisResult>,
    ) -> Self {
        let mut category_counts = BTreeMap::new();
        for result in results.values() {
            *category_counts
                .entry(result.category().as_str().to_string())
                .or_insert(0) += 1;
        }

        Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            project_root: project_root.into(),
            category_counts,
            results: results.clone(),
        }
    }
}

/// Write the results as pretty-printed JSON
pub fn export_classification_json<W: Write>(
    project_root: &str,
    results: &BTreeMap<String, FileAnalysisResult>,
    writer: W,
) -> StowawayResult<()> {
    let export = ClassificationExport::new(project_root, results);
    serde_json::to_writer_pretty(writer, &export)
        .map_err(|e| StowawayError::Export(e.to_string()))?;
    Ok(())
}
