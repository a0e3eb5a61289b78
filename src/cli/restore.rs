//! The `stowaway-restore` command: put backed-up files back

use std::path::PathBuf;

use clap::Parser;

use super::open_project;
use super::prompt::prompt_confirm;
use crate::backup::{BackupManager, RestorationService};
use crate::display::{format_size, separator, truncate_path};
use crate::error::{StowawayError, StowawayResult};
use crate::models::{
    BatchRestorationResult, ConflictStrategy, RestorationResult, RestoreOptions,
};

const PATH_WIDTH: usize = 56;

const USAGE: &str = "\
Usage:
  stowaway-restore --file <path>        restore one file (copy)
  stowaway-restore --directory <path>   restore every file under a directory (copy)
  stowaway-restore --all                move every file back and empty the backup
  stowaway-restore --conflict <mode>    backup_existing (default), overwrite, skip, compare";

/// Arguments of the `stowaway-restore` binary
#[derive(Parser, Debug)]
#[command(
    name = "stowaway-restore",
    version,
    about = "Restore files moved aside by stowaway",
    long_about = "Without flags, lists what the backup holds. --file and --directory \
                  copy files back and leave the backup intact; --all moves every file \
                  back and empties the backup."
)]
pub struct RestoreArgs {
    /// Move every backed-up file back (asks for confirmation)
    #[arg(long, conflicts_with_all = ["file", "directory"])]
    pub all: bool,

    /// Restore a single file by its original project-relative path
    #[arg(long, value_name = "PATH", conflicts_with = "directory")]
    pub file: Option<String>,

    /// Restore every backed-up file under a project-relative directory
    #[arg(long, value_name = "PATH")]
    pub directory: Option<String>,

    /// What to do when a file already exists at its original location
    #[arg(long, value_name = "STRATEGY", default_value = "backup_existing")]
    pub conflict: ConflictStrategy,

    /// Project root (defaults to the current directory)
    #[arg(short, long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip the rollback confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Run the requested restore; `Ok(false)` when some files failed
pub fn run_restore(args: &RestoreArgs) -> StowawayResult<bool> {
    let (paths, settings) = open_project(args.project.as_deref())?;
    let manager = BackupManager::new(paths, settings);
    if !manager.has_backup() {
        return Err(StowawayError::NoBackup(
            manager.paths().backup_root().display().to_string(),
        ));
    }

    let mut service = RestorationService::new(manager);
    let options = RestoreOptions::default().with_conflict(args.conflict);

    if args.all {
        return rollback(&mut service, options, args.yes);
    }

    if let Some(file) = &args.file {
        match service.restore_file(file, options) {
            Ok(result) => print_result(&result),
            Err(e) if e.is_not_in_backup() => println!("Skipped {}: not in backup", file),
            Err(e) => return Err(e),
        }
        return Ok(true);
    }

    if let Some(directory) = &args.directory {
        let batch = service.restore_directory(directory, options)?;
        print_batch(&batch);
        return Ok(batch.is_success());
    }

    list_contents(&mut service)?;
    Ok(true)
}

fn rollback(
    service: &mut RestorationService,
    options: RestoreOptions,
    assume_yes: bool,
) -> StowawayResult<bool> {
    let report = service.validate_restoration_prerequisites()?;
    if !report.drifted_files.is_empty() {
        println!(
            "Warning: project files changed since the backup: {}",
            report.drifted_files.join(", ")
        );
    }
    report.into_result()?;

    let count = service.manager_mut().manifest()?.moved_files().len();
    if count == 0 {
        println!("The backup holds no files; nothing to restore.");
        return Ok(true);
    }

    if !assume_yes {
        let question = format!("Move all {} files back and empty the backup?", count);
        if !prompt_confirm(&question, Some(false))? {
            println!("Cancelled. Nothing was restored.");
            return Ok(true);
        }
    }

    let batch = service.perform_complete_rollback(options.confirmed())?;
    print_batch(&batch);
    Ok(batch.is_success())
}

fn print_result(result: &RestorationResult) {
    if result.success {
        println!("Restored {} ({})", result.original_path, result.method);
    } else {
        println!("Skipped {}: {}", result.original_path, result.message);
    }
    if let Some(preserved) = &result.conflict.preserved_path {
        println!("  existing file kept at {}", preserved.display());
    }
}

fn print_batch(batch: &BatchRestorationResult) {
    for result in &batch.results {
        print_result(result);
    }
    for (path, error) in &batch.errors {
        println!("Failed {}: {}", path, error);
    }
    println!("{}", batch.summary());
}

fn list_contents(service: &mut RestorationService) -> StowawayResult<()> {
    let manifest = service.manager_mut().manifest()?.clone();
    let stats = manifest.statistics();

    println!("Backup {}", manifest.backup_id);
    println!(
        "Created {} for {}",
        manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        manifest.project_root
    );
    println!(
        "{} files held ({})",
        manifest.moved_files().len(),
        format_size(stats.moved_bytes)
    );
    println!("{}", separator(72));

    if manifest.moved_files().is_empty() {
        println!("The backup holds no files.");
    } else {
        for original in manifest.moved_files().keys() {
            let size = manifest.file_sizes().get(original).copied().unwrap_or(0);
            println!(
                "{:<width$} {:>10}",
                truncate_path(original, PATH_WIDTH),
                format_size(size),
                width = PATH_WIDTH
            );
        }
    }

    println!();
    println!("{}", USAGE);
    Ok(())
}
