//! Markdown backup report
//!
//! Rendered next to the manifest after every backup run and every manifest
//! update, for humans deciding whether the classification was right.

use std::fmt::Write;

use crate::display::{format_percentage, format_size};
use crate::models::{BackupManifest, FileAnalysisResult, FileCategory};

/// Render the full report for a manifest
pub fn render(manifest: &BackupManifest) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, manifest);
    out
}

fn write_report(out: &mut String, manifest: &BackupManifest) -> std::fmt::Result {
    let stats = manifest.statistics();

    writeln!(out, "# Stowaway Backup Report")?;
    writeln!(out)?;
    writeln!(out, "- **Backup ID:** `{}`", manifest.backup_id)?;
    writeln!(
        out,
        "- **Created:** {}",
        manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out, "- **Project root:** `{}`", manifest.project_root)?;
    if !manifest.project_state.fingerprint.is_empty() {
        writeln!(
            out,
            "- **Project fingerprint:** `{}`",
            manifest.project_state.fingerprint
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Summary")?;
    writeln!(out)?;
    writeln!(out, "| Metric | Value |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| Files analyzed | {} |", stats.total_files_analyzed)?;
    writeln!(out, "| Move candidates | {} |", stats.candidate_count)?;
    writeln!(out, "| Files moved | {} |", stats.moved_count)?;
    writeln!(out, "| Errors | {} |", stats.error_count)?;
    writeln!(
        out,
        "| Candidate size | {} |",
        format_size(stats.total_candidate_bytes)
    )?;
    writeln!(out, "| Moved size | {} |", format_size(stats.moved_bytes))?;
    writeln!(
        out,
        "| Success rate | {} |",
        format_percentage(stats.success_rate)
    )?;
    writeln!(out)?;

    writeln!(out, "## By Category")?;
    writeln!(out)?;
    writeln!(out, "| Category | Files |")?;
    writeln!(out, "|---|---|")?;
    for category in FileCategory::all() {
        let count = stats.by_category.get(category.as_str()).copied().unwrap_or(0);
        writeln!(out, "| {} | {} |", category, count)?;
    }
    writeln!(out)?;

    writeln!(out, "## By Recommended Action")?;
    writeln!(out)?;
    writeln!(out, "| Action | Files |")?;
    writeln!(out, "|---|---|")?;
    for (action, count) in &stats.by_action {
        writeln!(out, "| {} | {} |", action, count)?;
    }
    writeln!(out)?;

    writeln!(out, "## By Confidence")?;
    writeln!(out)?;
    writeln!(out, "| Bucket | Files |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| High (80-100) | {} |", stats.by_confidence.high)?;
    writeln!(out, "| Medium (50-79) | {} |", stats.by_confidence.medium)?;
    writeln!(out, "| Low (0-49) | {} |", stats.by_confidence.low)?;
    writeln!(out)?;

    writeln!(out, "## Moved Files")?;
    writeln!(out)?;
    if manifest.moved_files().is_empty() {
        writeln!(out, "No files were moved.")?;
    } else {
        writeln!(out, "| Original | Backup path | Category | Confidence |")?;
        writeln!(out, "|---|---|---|---|")?;
        for (original, backup) in manifest.moved_files() {
            let (category, confidence) = manifest
                .analysis_results()
                .get(original)
                .map(|r| (r.category().to_string(), format!("{}%", r.confidence_score())))
                .unwrap_or_else(|| ("-".to_string(), "-".to_string()));
            writeln!(
                out,
                "| `{}` | `{}` | {} | {} |",
                original, backup, category, confidence
            )?;
        }
    }
    writeln!(out)?;

    if !manifest.errors().is_empty() {
        writeln!(out, "## Errors")?;
        writeln!(out)?;
        for (path, message) in manifest.errors() {
            writeln!(out, "- `{}`: {}", path, message)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "## Restoration")?;
    writeln!(out)?;
    writeln!(out, "```sh")?;
    writeln!(out, "# list the backup contents")?;
    writeln!(out, "stowaway-restore")?;
    writeln!(out, "# restore a single file")?;
    writeln!(out, "stowaway-restore --file <original/path>")?;
    writeln!(out, "# restore everything under a directory")?;
    writeln!(out, "stowaway-restore --directory <original/dir>")?;
    writeln!(out, "# move every file back and empty the backup")?;
    writeln!(out, "stowaway-restore --all")?;
    writeln!(out, "```")?;
    writeln!(out)?;

    writeln!(out, "## Detailed Analysis")?;
    for category in FileCategory::all() {
        let results: Vec<&FileAnalysisResult> = manifest
            .analysis_results()
            .values()
            .filter(|r| r.category() == *category)
            .collect();
        writeln!(out)?;
        writeln!(out, "### {} ({})", category, results.len())?;
        for result in results {
            write_file_detail(out, result)?;
        }
    }

    Ok(())
}

fn write_file_detail(out: &mut String, result: &FileAnalysisResult) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "#### `{}`", result.file_path())?;
    writeln!(out)?;
    writeln!(
        out,
        "- Confidence: {}% ({})",
        result.confidence_score(),
        result.recommended_action()
    )?;
    if !result.reasons().is_empty() {
        writeln!(out, "- Reasons:")?;
        for reason in result.reasons() {
            writeln!(out, "  - {}", reason)?;
        }
    }
    if !result.dependencies().is_empty() {
        writeln!(out, "- Dependencies:")?;
        for dep in result.dependencies() {
            writeln!(out, "  - `{}`", dep)?;
        }
    }
    if !result.references().is_empty() {
        writeln!(out, "- Referenced by:")?;
        for reference in result.references() {
            writeln!(out, "  - `{}`", reference)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_report_sections() {
        let mut results = BTreeMap::new();
        results.insert(
            "tests/FooTest.php".to_string(),
            FileAnalysisResult::builder("tests/FooTest.php", "classifier")
                .category(FileCategory::NonEssential)
                .add_confidence(85)
                .reason("Matches test file pattern")
                .build(),
        );
        results.insert(
            "index.php".to_string(),
            FileAnalysisResult::builder("index.php", "classifier")
                .category(FileCategory::Essential)
                .add_confidence(90)
                .references(["about.php"])
                .build(),
        );

        let mut manifest = BackupManifest::new("/srv/app", results);
        manifest.record_size("tests/FooTest.php", 2048);
        manifest
            .record_move("tests/FooTest.php", "moved-files/tests/FooTest.php")
            .unwrap();
        manifest.recompute_statistics();

        let report = render(&manifest);
        assert!(report.starts_with("# Stowaway Backup Report"));
        assert!(report.contains("| Files moved | 1 |"));
        assert!(report.contains(
            "| `tests/FooTest.php` | `moved-files/tests/FooTest.php` | Non-essential | 85% |"
        ));
        assert!(report.contains("### Essential (1)"));
        assert!(report.contains("  - `about.php`"));
        assert!(report.contains("stowaway-restore --all"));
        assert!(!report.contains("## Errors"));
    }
}
