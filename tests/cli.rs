//! Command-line behavior of `stowaway` and `stowaway-restore`

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write(root: &Path, path: &str, contents: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, contents).unwrap();
}

fn fixture() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "composer.json", r#"{"autoload": {"psr-4": {"App\\": "src/"}}}"#);
    write(root, "index.php", "<?php\nuse App\\Domain\\Pet\\Pet;\n$pet = new Pet();\n");
    write(root, "src/Domain/Pet/Pet.php", "<?php\nnamespace App\\Domain\\Pet;\nclass Pet {}\n");
    write(root, "tests/FooTest.php", "<?php\nclass FooTest {}\n");
    write(root, "debug.php", "<?php\nphpinfo();\n");
    temp_dir
}

fn stowaway(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stowaway").unwrap();
    cmd.env_remove("STOWAWAY_BACKUP_DIR")
        .env_remove("STOWAWAY_LOG")
        .arg("--project")
        .arg(project);
    cmd
}

fn restore(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stowaway-restore").unwrap();
    cmd.env_remove("STOWAWAY_BACKUP_DIR")
        .env_remove("STOWAWAY_LOG")
        .arg("--project")
        .arg(project);
    cmd
}

#[test]
fn dry_run_moves_nothing() {
    let temp = fixture();

    stowaway(temp.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run:"))
        .stdout(predicate::str::contains("debug.php"));

    assert!(temp.path().join("debug.php").exists());
    assert!(!temp.path().join("stowaway-backup").exists());
}

#[test]
fn declining_the_prompt_cancels() {
    let temp = fixture();

    stowaway(temp.path())
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled"));

    assert!(temp.path().join("tests/FooTest.php").exists());
    assert!(!temp.path().join("stowaway-backup/manifest.json").exists());
}

#[test]
fn backup_list_and_rollback() {
    let temp = fixture();
    let root = temp.path();

    stowaway(root)
        .arg("--yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("stowaway-restore --all"));

    assert!(!root.join("debug.php").exists());
    assert!(!root.join("tests/FooTest.php").exists());
    assert!(root.join("index.php").exists());
    assert!(root.join("src/Domain/Pet/Pet.php").exists());
    assert!(root.join("stowaway-backup/manifest.json").is_file());
    assert!(root.join("stowaway-backup/reports/backup-report.md").is_file());

    restore(root)
        .assert()
        .success()
        .stdout(predicate::str::contains("debug.php"))
        .stdout(predicate::str::contains("Usage:"));

    restore(root)
        .args(["--all", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("failed"));

    assert!(root.join("debug.php").exists());
    assert!(root.join("tests/FooTest.php").exists());
    assert!(root.join("stowaway-backup/restore-log.jsonl").is_file());
}

#[test]
fn single_file_restore_copies() {
    let temp = fixture();
    let root = temp.path();

    stowaway(root).arg("--yes").assert().success();

    restore(root)
        .args(["--file", "debug.php"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored debug.php (copy)"));

    assert!(root.join("debug.php").exists());
    assert!(root.join("stowaway-backup/moved-files/debug.php").exists());

    restore(root)
        .args(["--file", "debug.php", "--conflict", "compare"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped debug.php"));
}

#[test]
fn export_writes_csv() {
    let temp = fixture();
    let export = temp.path().join("classification.csv");

    stowaway(temp.path())
        .arg("--dry-run")
        .arg("--export")
        .arg(&export)
        .assert()
        .success();

    let csv = fs::read_to_string(export).unwrap();
    assert!(csv.starts_with("Path,Category,Confidence"));
    assert!(csv.contains("debug.php,non_essential"));
}

#[test]
fn restore_without_backup_fails() {
    let temp = TempDir::new().unwrap();

    restore(temp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No backup found"));
}

#[test]
fn file_missing_from_backup_is_skipped() {
    let temp = fixture();
    stowaway(temp.path()).arg("--yes").assert().success();

    restore(temp.path())
        .args(["--file", "index.php"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped index.php: not in backup"));

    assert!(temp.path().join("index.php").exists());
}

#[test]
fn tampered_manifest_blocks_rollback() {
    let temp = fixture();
    let root = temp.path();
    stowaway(root).arg("--yes").assert().success();

    let manifest = root.join("stowaway-backup/manifest.json");
    let raw = fs::read_to_string(&manifest).unwrap();
    fs::write(&manifest, raw.replace("\"debug.php\":", "\"../debug.php\":")).unwrap();

    restore(root)
        .args(["--all", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manifest error"));

    assert!(!root.parent().unwrap().join("debug.php").exists());
    assert!(!root.join("debug.php").exists());
}

#[test]
fn invalid_conflict_strategy_is_rejected() {
    let temp = fixture();
    restore(temp.path())
        .args(["--conflict", "merge"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown conflict strategy"));
}
