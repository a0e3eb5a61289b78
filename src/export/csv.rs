//! CSV export of classification results
//!
//! One row per analyzed file, spreadsheet-friendly.

use std::collections::BTreeMap;
use std::io::Write;

use crate::error::{StowawayError, StowawayResult};
use crate::models::FileAnalysisResult;

const HEADER: [&str; 8] = [
    "Path",
    "Category",
    "Confidence",
    "Action",
    "Analyzer",
    "Reasons",
    "Dependencies",
    "References",
];

/// Write every result as a CSV row, in path order
pub fn export_classification_csv<W: Write>(
    results: &BTreeMap<String, FileAnalysisResult>,
    writer: W,
) -> StowawayResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;

    for result in results.values() {
        let confidence = result.confidence_score().to_string();
        let dependencies: Vec<&str> = result.dependencies().iter().map(String::as_str).collect();
        let references: Vec<&str> = result.references().iter().map(String::as_str).collect();

        csv.write_record([
            result.file_path(),
            result.category().as_str(),
            confidence.as_str(),
            result.recommended_action().as_str(),
            result.analyzer(),
            result.reasons().join("; ").as_str(),
            dependencies.join("; ").as_str(),
            references.join("; ").as_str(),
        ])?;
    }

    csv.flush()
        .map_err(|e| StowawayError::Export(format!("Failed to flush CSV: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileCategory;

    #[test]
    fn test_export_rows() {
        let mut results = BTreeMap::new();
        results.insert(
            "tests/FooTest.php".to_string(),
            FileAnalysisResult::builder("tests/FooTest.php", "classifier")
                .category(FileCategory::NonEssential)
                .add_confidence(85)
                .reason("[pattern] Matches test file pattern, \"Test\"")
                .reason("[usage] No references")
                .build(),
        );

        let mut buffer = Vec::new();
        export_classification_csv(&results, &mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let mut lines = output.lines();

        assert_eq!(
            lines.next(),
            Some("Path,Category,Confidence,Action,Analyzer,Reasons,Dependencies,References")
        );
        assert_eq!(
            lines.next(),
            Some("tests/FooTest.php,non_essential,85,move,classifier,\"[pattern] Matches test file pattern, \"\"Test\"\"; [usage] No references\",,")
        );
        assert_eq!(lines.next(), None);
    }
}
