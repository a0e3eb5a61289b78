//! Export module for stowaway
//!
//! Writes the classification results for review outside the tool:
//! - CSV: one row per file (spreadsheet-compatible)
//! - JSON: full per-file results with summary counts
//!
//! The format is chosen from the output file's extension.

pub mod csv;
pub mod json;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub use self::csv::export_classification_csv;
pub use self::json::{export_classification_json, ClassificationExport, EXPORT_SCHEMA_VERSION};

use crate::error::{StowawayError, StowawayResult};
use crate::models::FileAnalysisResult;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Pick a format from a file extension; anything but `.json` is CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }
}

/// Export classification results to a file
pub fn export_to_file(
    project_root: &str,
    results: &BTreeMap<String, FileAnalysisResult>,
    path: &Path,
) -> StowawayResult<ExportFormat> {
    let file = File::create(path).map_err(|e| {
        StowawayError::Export(format!("Failed to create {}: {}", path.display(), e))
    })?;
    let writer = BufWriter::new(file);

    let format = ExportFormat::from_path(path);
    match format {
        ExportFormat::Csv => export_classification_csv(results, writer)?,
        ExportFormat::Json => export_classification_json(project_root, results, writer)?,
    }
    Ok(format)
}
