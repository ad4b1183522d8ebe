//! CLI integration tests for the Hutch command-line interface.
//!
//! Each test runs against a scratch data directory with an empty user
//! config directory, so the developer's own config never leaks in.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the hutch binary, isolated to `tmp`.
fn hutch(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hutch").unwrap();
    cmd.current_dir(tmp.path())
        .env("HUTCH_CONFIG_DIR", tmp.path().join("config"))
        .env_remove("HUTCH_CONFIG")
        .env_remove("HUTCH_DATA_DIR")
        .arg("--data-dir")
        .arg(tmp.path());
    cmd
}

fn write_record(dir: &Path, id: &str, body: &str, age: Duration) {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("sess_{id}"));
    fs::write(&path, body).unwrap();
    let file = fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("hutch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("gc"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version_displays() {
    Command::cargo_bin("hutch")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hutch"));
}

#[test]
fn test_unknown_subcommand_rejected() {
    Command::cargo_bin("hutch")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Gc Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_gc_removes_only_expired_records() {
    let tmp = TempDir::new().unwrap();
    let sessions = tmp.path().join("sessions");
    write_record(&sessions, "fresh", "a|i:1;", Duration::from_secs(10));
    write_record(&sessions, "stale", "a|i:1;", Duration::from_secs(86_400));

    hutch(&tmp)
        .arg("gc")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1"));

    assert!(sessions.join("sess_fresh").exists());
    assert!(!sessions.join("sess_stale").exists());
}

#[test]
fn test_gc_max_age_override_json() {
    let tmp = TempDir::new().unwrap();
    let sessions = tmp.path().join("sessions");
    write_record(&sessions, "a", "", Duration::from_secs(120));
    write_record(&sessions, "b", "", Duration::from_secs(120));

    let output = hutch(&tmp)
        .args(["--json", "gc", "--max-age", "60"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["removed"], 2);
    assert_eq!(json["max_age_secs"], 60);
}

#[test]
fn test_gc_rejects_zero_max_age() {
    let tmp = TempDir::new().unwrap();
    hutch(&tmp)
        .args(["gc", "--max-age", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be positive"));
}

#[test]
fn test_gc_creates_missing_directory() {
    let tmp = TempDir::new().unwrap();
    hutch(&tmp)
        .arg("gc")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0"));
    assert!(tmp.path().join("sessions").is_dir());
}

#[test]
fn test_project_config_sets_dirname_and_max_age() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("hutch.toml"),
        "[session]\ndirname = \"store\"\nmax_age = 60\n",
    )
    .unwrap();
    let store = tmp.path().join("store");
    write_record(&store, "old", "", Duration::from_secs(120));

    hutch(&tmp).arg("gc").assert().success();
    assert!(!store.join("sess_old").exists());
}

// ─────────────────────────────────────────────────────────────────────────────
// Show / Check Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_show_prints_payload() {
    let tmp = TempDir::new().unwrap();
    let sessions = tmp.path().join("sessions");
    write_record(
        &sessions,
        "1234567890abcdef",
        r#"hoge|i:123;fuga|s:4:"asdf";"#,
        Duration::from_secs(10),
    );

    hutch(&tmp)
        .args(["show", "1234567890abcdef"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hoge: 123"))
        .stdout(predicate::str::contains("fuga: \"asdf\""));
}

#[test]
fn test_show_json() {
    let tmp = TempDir::new().unwrap();
    let sessions = tmp.path().join("sessions");
    write_record(
        &sessions,
        "abc",
        r#"a|a:2:{i:0;s:1:"x";i:1;b:0;}"#,
        Duration::from_secs(10),
    );

    let output = hutch(&tmp).args(["--json", "show", "abc"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["a"]["0"], "x");
    assert_eq!(json["a"]["1"], false);
}

#[test]
fn test_show_missing_and_malformed() {
    let tmp = TempDir::new().unwrap();
    let sessions = tmp.path().join("sessions");
    write_record(&sessions, "broken", "not a session", Duration::from_secs(10));

    hutch(&tmp)
        .args(["show", "nothere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No session record"));

    hutch(&tmp)
        .args(["show", "broken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid session format"));

    hutch(&tmp)
        .args(["show", "../etc/passwd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid session ID"));
}

#[test]
fn test_inspection_does_not_create_directory() {
    let tmp = TempDir::new().unwrap();

    for sub in ["show", "check"] {
        hutch(&tmp)
            .args([sub, "abc"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Directory not found"));
    }
    assert!(!tmp.path().join("sessions").exists());
}

#[test]
fn test_check_live_and_expired() {
    let tmp = TempDir::new().unwrap();
    let sessions = tmp.path().join("sessions");
    write_record(&sessions, "live", "", Duration::from_secs(10));
    write_record(&sessions, "gone", "", Duration::from_secs(86_400));

    hutch(&tmp)
        .args(["check", "live"])
        .assert()
        .success()
        .stdout(predicate::str::contains("live"));

    let output = hutch(&tmp)
        .args(["--json", "check", "gone"])
        .output()
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["live"], false);
    assert_eq!(json["max_age_secs"], 1440);

    // Checking does not sweep.
    assert!(sessions.join("sess_gone").exists());
}
