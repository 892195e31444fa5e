//! Integration tests for the wolfwalk binary.
//!
//! These tests drive whole sessions through `--script`, which runs the
//! commands against a simulated clock so timed exercises finish instantly.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Every unit of the short workout, with the rests in between.
const FULL_SHORT_SCRIPT: &str = "n,wait,n,r,n,r,n,n,r,n,n,r,n,r,n,r,n,n,wait";

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("wolfwalk"))
}

fn run_script(temp_dir: &TempDir, script: &str) -> assert_cmd::assert::Assert {
    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--length")
        .arg("short")
        .arg("--script")
        .arg(script)
        .assert()
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Guided step-by-step exercise routine for kids",
        ));
}

#[test]
fn test_full_short_workout_completes() {
    let temp_dir = setup_test_dir();

    run_script(&temp_dir, FULL_SHORT_SCRIPT)
        .success()
        .stdout(predicate::str::contains("Workout complete! 8 exercises"))
        .stdout(predicate::str::contains("New badge: First Steps"))
        .stdout(predicate::str::contains("Session logged"));

    let journal = fs::read_to_string(temp_dir.path().join("journal/sessions.jsonl"))
        .expect("Failed to read journal");
    let lines: Vec<_> = journal.lines().collect();
    assert_eq!(lines.len(), 1);

    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["workout_length"], "short");
    assert_eq!(record["exercise_count"], 8);

    // A finished session leaves nothing to resume.
    assert!(!temp_dir.path().join("store/wolfwalk_session.json").exists());
    assert!(temp_dir.path().join("store/wolfwalk_motivation.json").exists());
}

#[test]
fn test_rest_gate_shown_between_strength_sets() {
    let temp_dir = setup_test_dir();

    run_script(&temp_dir, "n,wait,n")
        .success()
        .stdout(predicate::str::contains("Heel Walking (forwards & backwards)"))
        .stdout(predicate::str::contains("Up next: Set 2"))
        .stdout(predicate::str::contains("Progress saved"));
}

#[test]
fn test_quit_then_resume() {
    let temp_dir = setup_test_dir();

    run_script(&temp_dir, "n,wait,n,q").success();
    assert!(temp_dir.path().join("store/wolfwalk_session.json").exists());

    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved short workout"))
        .stdout(predicate::str::contains("Step 3 of 8: Heel Walking"))
        .stdout(predicate::str::contains("Resting"));

    // The rest of the workout, starting from the open rest gate.
    run_script(&temp_dir, "r,n,r,n,n,r,n,n,r,n,r,n,r,n,n,wait")
        .success()
        .stdout(predicate::str::contains("Welcome back!"))
        .stdout(predicate::str::contains("Workout complete!"));
}

#[test]
fn test_fresh_discards_saved_session() {
    let temp_dir = setup_test_dir();

    run_script(&temp_dir, "n,s,s,q").success();

    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--fresh")
        .arg("--script")
        .arg("q")
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome back!").not());

    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved session."));
}

#[test]
fn test_unknown_script_command_fails() {
    let temp_dir = setup_test_dir();
    run_script(&temp_dir, "n,jump").failure();
}

#[test]
fn test_unknown_length_fails() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--length")
        .arg("medium")
        .arg("--script")
        .arg("q")
        .assert()
        .failure();
}

#[test]
fn test_progress_after_two_sessions() {
    let temp_dir = setup_test_dir();

    run_script(&temp_dir, FULL_SHORT_SCRIPT).success();
    run_script(&temp_dir, FULL_SHORT_SCRIPT).success();

    cli()
        .arg("progress")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Chapter 1: Learning the Steps (2/20)"))
        .stdout(predicate::str::contains("✓ First Steps"))
        .stdout(predicate::str::contains("Stickers: 1 of 8"));

    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Sessions completed: 2"))
        .stdout(predicate::str::contains("Journal entries: 2"));
}

#[test]
fn test_export_to_csv() {
    let temp_dir = setup_test_dir();
    let csv_path = temp_dir.path().join("out.csv");

    run_script(&temp_dir, FULL_SHORT_SCRIPT).success();

    cli()
        .arg("export")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--out")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 sessions"));

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("id,workout_length,"));
    assert_eq!(csv.lines().count(), 2);
}

#[test]
fn test_export_twice_does_not_repeat_sessions() {
    let temp_dir = setup_test_dir();
    let csv_path = temp_dir.path().join("out.csv");

    run_script(&temp_dir, FULL_SHORT_SCRIPT).success();

    for expected in ["Exported 1 sessions", "Exported 0 sessions"] {
        cli()
            .arg("export")
            .arg("--data-dir")
            .arg(temp_dir.path())
            .arg("--out")
            .arg(&csv_path)
            .assert()
            .success()
            .stdout(predicate::str::contains(expected));
    }

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 2);
}

#[test]
fn test_export_without_journal() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("export")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to export"));
}

#[test]
fn test_reset_progress_requires_yes() {
    let temp_dir = setup_test_dir();
    run_script(&temp_dir, FULL_SHORT_SCRIPT).success();

    cli()
        .arg("reset-progress")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .failure();

    cli()
        .arg("reset-progress")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--yes")
        .assert()
        .success();

    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Sessions completed: 0"))
        // The journal is history, not progress.
        .stdout(predicate::str::contains("Journal entries: 1"));
}
