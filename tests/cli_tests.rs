use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn create_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn apsync() -> Command {
    Command::cargo_bin("apsync").unwrap()
}

#[test]
fn test_help_output() {
    apsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Astrophotography Capture Backup Manager",
        ))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("rebuild-index"))
        .stdout(predicate::str::contains("pull"))
        .stdout(predicate::str::contains("push"))
        .stdout(predicate::str::contains("trash"));
}

#[test]
fn test_version_output() {
    apsync()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_status_requires_roots() {
    let tmp = TempDir::new().unwrap();

    apsync()
        .current_dir(tmp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("root not configured"));
}

#[test]
fn test_status_missing_local_root() {
    let tmp = TempDir::new().unwrap();

    apsync()
        .current_dir(tmp.path())
        .args(["--local-root", "does-not-exist", "--remote-root", "."])
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("local root does not exist"));
}

#[test]
fn test_status_empty_roots() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();

    apsync()
        .args(["--local-root"])
        .arg(local.path())
        .args(["--remote-root"])
        .arg(remote.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Targets: 0"));
}

#[test]
fn test_status_classifies_remote_target() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    create_file(remote.path(), "DATE_2026-02-12_M31/Light_000.fits", "frame");
    create_file(remote.path(), "DATE_2026-02-12_M31/Light_001.fits", "frame");

    apsync()
        .args(["--local-root"])
        .arg(local.path())
        .args(["--remote-root"])
        .arg(remote.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("DATE_2026-02-12_M31"))
        .stdout(predicate::str::contains("Not pulled"))
        .stdout(predicate::str::contains("Pull to local"));
}

#[test]
fn test_pull_end_to_end() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    create_file(remote.path(), "DATE_2026-02-12_M31/Light_000.fits", "frame");

    apsync()
        .args(["--local-root"])
        .arg(local.path())
        .args(["--remote-root"])
        .arg(remote.path())
        .args(["pull", "DATE_2026-02-12_M31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lights 1/0/0"))
        .stdout(predicate::str::contains("✓ Success"));

    assert!(local
        .path()
        .join("DATE_2026-02-12_M31/Light_000.fits")
        .exists());
}

#[test]
fn test_trash_without_checkpoint_reports_failure() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    create_file(remote.path(), "DATE_2026-02-12_M31/Light_000.fits", "frame");

    apsync()
        .args(["--local-root"])
        .arg(local.path())
        .args(["--remote-root"])
        .arg(remote.path())
        .args(["trash", "DATE_2026-02-12_M31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed"));

    // Nothing was moved
    assert!(remote
        .path()
        .join("DATE_2026-02-12_M31/Light_000.fits")
        .exists());
}

#[test]
fn test_compare_reports_safety() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    create_file(local.path(), "DATE_2026-02-12_M31/Light_000.fits", "frame");

    apsync()
        .args(["--local-root"])
        .arg(local.path())
        .args(["--remote-root"])
        .arg(remote.path())
        .arg("compare")
        .assert()
        .success()
        .stdout(predicate::str::contains("DATE_2026-02-12_M31"))
        .stdout(predicate::str::contains("No"));
}

#[test]
fn test_rebuild_index_counts_rows() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    create_file(remote.path(), "DATE_2026-02-12_M31/Light_000.fits", "frame");
    create_file(remote.path(), "DATE_2026-02-12_M31/WBPP/master.xisf", "wip");

    apsync()
        .args(["--local-root"])
        .arg(local.path())
        .args(["--remote-root"])
        .arg(remote.path())
        .arg("rebuild-index")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 file(s)"));

    assert!(remote.path().join(".apsync_index.json").exists());
}
