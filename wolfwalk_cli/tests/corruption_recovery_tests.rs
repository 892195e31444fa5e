//! Corruption recovery tests for the wolfwalk binary.
//!
//! Broken or stale files must never stop a child from exercising; at worst
//! the saved session is forgotten.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("wolfwalk"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_corrupted_session_snapshot() {
    let temp_dir = setup_test_dir();
    let store_dir = temp_dir.path().join("store");
    fs::create_dir_all(&store_dir).unwrap();
    fs::write(store_dir.join("wolfwalk_session.json"), "{ invalid json }}}}").unwrap();

    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved session."));

    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--script")
        .arg("n,s,q")
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome back!").not());
}

#[test]
fn test_snapshot_outside_routine_is_dropped() {
    let temp_dir = setup_test_dir();
    let store_dir = temp_dir.path().join("store");
    fs::create_dir_all(&store_dir).unwrap();
    fs::write(
        store_dir.join("wolfwalk_session.json"),
        r#"{"step_index": 40, "set_index": 0, "side": "none", "started": true}"#,
    )
    .unwrap();

    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--script")
        .arg("q")
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome back!").not());

    assert!(!store_dir.join("wolfwalk_session.json").exists());
}

#[test]
fn test_corrupted_motivation_file() {
    let temp_dir = setup_test_dir();
    let store_dir = temp_dir.path().join("store");
    fs::create_dir_all(&store_dir).unwrap();
    fs::write(store_dir.join("wolfwalk_motivation.json"), "[1, 2").unwrap();

    cli()
        .arg("progress")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Chapter 1: Learning the Steps (0/20)"));
}

#[test]
fn test_corrupted_journal_lines_skipped() {
    let temp_dir = setup_test_dir();
    let journal_dir = temp_dir.path().join("journal");
    fs::create_dir_all(&journal_dir).unwrap();

    let mut file = fs::File::create(journal_dir.join("sessions.jsonl")).unwrap();
    writeln!(file, "{{ not a record").unwrap();
    writeln!(
        file,
        r#"{{"id":"7f1d3c52-5d8e-4a55-9a4c-0d4f8d7d0e11","workout_length":"long","started_at":"2026-03-01T09:00:00Z","completed_at":"2026-03-01T09:20:00Z","duration_seconds":1200,"exercise_count":8}}"#
    )
    .unwrap();
    drop(file);

    cli()
        .arg("export")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 sessions"));
}
