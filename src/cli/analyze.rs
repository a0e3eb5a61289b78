//! The `stowaway` command: classify a project and back up what is not needed

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use super::prompt::prompt_confirm;
use super::{open_project, use_color};
use crate::analysis::classifier::move_candidates;
use crate::analysis::{Classifier, SourceTree};
use crate::backup::BackupManager;
use crate::display::{
    format_bar, format_category_colored, format_percentage, format_size, separator, truncate_path,
};
use crate::error::StowawayResult;
use crate::export::export_to_file;
use crate::models::{BackupManifest, FileAnalysisResult, FileCategory};

const PATH_WIDTH: usize = 56;

/// Arguments of the `stowaway` binary
#[derive(Parser, Debug)]
#[command(
    name = "stowaway",
    version,
    about = "Classify a PHP project's files and move the non-essential ones into a reversible backup",
    long_about = "stowaway analyzes every file of a PHP project (dependencies, usage, \
                  role and naming patterns), decides which files the application does \
                  not need, and moves those into a backup directory from which \
                  stowaway-restore can put them back."
)]
pub struct AnalyzeArgs {
    /// Project root (defaults to the current directory)
    #[arg(short, long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Classify and estimate without moving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Move files without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Write the classification to a CSV file (or JSON for a .json name)
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

/// Run a full analysis and, unless cancelled, a backup
pub fn run_analyze(args: &AnalyzeArgs) -> StowawayResult<()> {
    let (paths, settings) = open_project(args.project.as_deref())?;
    let root = paths.project_root().to_path_buf();
    println!("Analyzing {}", root.display());

    let tree = Arc::new(SourceTree::discover(&root, &settings)?);
    let classifier = Classifier::standard(Arc::clone(&tree))?;
    info!("Analyzers: {}", classifier.analyzer_names().join(", "));

    let backup_prefix = paths.backup_dir_in_project();
    let files: Vec<String> = tree
        .files()
        .iter()
        .filter(|f| {
            backup_prefix
                .as_deref()
                .map_or(true, |prefix| !f.starts_with(&format!("{}/", prefix)))
        })
        .cloned()
        .collect();

    let results = classifier.classify_all(&files);
    print_summary(&results);

    if let Some(export) = &args.export {
        let format = export_to_file(&root.display().to_string(), &results, export)?;
        println!("Classification exported to {} ({:?})", export.display(), format);
    }

    let candidates = move_candidates(&results).len();
    if candidates == 0 {
        println!("No files recommended for moving.");
        return Ok(());
    }

    let mut manager = BackupManager::new(paths, settings);

    if args.dry_run {
        let manifest = manager.create_backup(results, true)?;
        let stats = manifest.statistics();
        println!(
            "Dry run: {} files ({}) would be moved to {}",
            stats.candidate_count,
            format_size(stats.total_candidate_bytes),
            manager.paths().backup_root().display()
        );
        return Ok(());
    }

    if !args.yes {
        let question = format!(
            "Move {} files to {}?",
            candidates,
            manager.paths().backup_root().display()
        );
        if !prompt_confirm(&question, Some(false))? {
            println!("Cancelled. No files were moved.");
            return Ok(());
        }
    }

    let manifest = manager.create_backup(results, false)?;
    print_backup_outcome(&manifest, &manager);
    Ok(())
}

fn print_summary(results: &BTreeMap<String, FileAnalysisResult>) {
    let total = results.len();
    let color = use_color();

    println!();
    println!("Classification ({} files)", total);
    println!("{}", separator(60));
    for category in FileCategory::all() {
        let count = results.values().filter(|r| r.category() == *category).count();
        let name = category.to_string();
        // Pad before coloring; escape codes would skew the width
        let padding = " ".repeat(14usize.saturating_sub(name.len()));
        let label = if color {
            format_category_colored(*category)
        } else {
            name
        };
        let pct = if total == 0 {
            0.0
        } else {
            count as f64 / total as f64 * 100.0
        };
        println!(
            "{}{} {:>6}  {} {}",
            label,
            padding,
            count,
            format_bar(count, total, 20),
            format_percentage(pct)
        );
    }

    let candidates = move_candidates(results);
    if candidates.is_empty() {
        println!();
        return;
    }

    println!();
    println!("Move candidates");
    println!("{}", separator(60));
    for result in candidates {
        let reason = result
            .reasons()
            .first()
            .map(String::as_str)
            .unwrap_or("");
        println!(
            "{:<width$} {:>3}%  {}",
            truncate_path(result.file_path(), PATH_WIDTH),
            result.confidence_score(),
            reason,
            width = PATH_WIDTH
        );
    }
    println!();
}

fn print_backup_outcome(manifest: &BackupManifest, manager: &BackupManager) {
    let stats = manifest.statistics();
    println!(
        "Moved {} of {} files ({})",
        stats.moved_count,
        stats.candidate_count,
        format_size(stats.moved_bytes)
    );

    if !manifest.errors().is_empty() {
        println!("{} files could not be moved:", manifest.errors().len());
        for (path, message) in manifest.errors() {
            println!("  {}: {}", path, message);
        }
    }

    println!("Manifest: {}", manager.paths().manifest_file().display());
    println!("Report:   {}", manager.paths().report_file().display());
    println!("Undo with: stowaway-restore --all");
}
