//! Integration tests for the lift binary.
//!
//! These tests drive the CLI end to end against a temporary data
//! directory and inspect the JSON workout log it leaves behind.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory with an empty config file
fn setup_test_dir() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("config.toml"), "").expect("Failed to write config");
    temp_dir
}

/// Helper to get the CLI binary pointed at `dir`
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lift"));
    cmd.arg("--data-dir")
        .arg(dir)
        .arg("--config")
        .arg(dir.join("config.toml"));
    cmd
}

fn log_set(dir: &Path, exercise: &str, reps: u32, weight: f64, date: &str) {
    cli(dir)
        .args(["log", "--exercise", exercise])
        .args(["--reps", &reps.to_string()])
        .args(["--weight", &weight.to_string()])
        .args(["--date", date])
        .arg("--finished")
        .assert()
        .success();
}

fn read_log(dir: &Path) -> Value {
    let contents = fs::read_to_string(dir.join("workouts.json")).expect("Failed to read log");
    serde_json::from_str(&contents).expect("Log is not valid JSON")
}

fn sessions(log: &Value) -> &Vec<Value> {
    log["sessions"].as_array().expect("sessions array")
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("lift"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workout log"));
}

#[test]
fn test_log_creates_workout_log() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["log", "--exercise", "back squat", "--reps", "5", "--weight", "100"])
        .args(["--date", "2024-05-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Logged 5 x 100 kg Back Squat on 2024-05-01",
        ));

    let log = read_log(dir);
    assert_eq!(log["version"], 1);
    assert_eq!(sessions(&log).len(), 1);
}

#[test]
fn test_same_day_logs_merge_into_one_entry() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    log_set(dir, "Back Squat", 5, 100.0, "2024-05-01");
    log_set(dir, "Back Squat", 5, 105.0, "2024-05-01");

    let log = read_log(dir);
    let sessions = sessions(&log);
    assert_eq!(sessions.len(), 1);

    let entries = sessions[0]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);

    let sets = entries[0]["sets"].as_array().unwrap();
    assert_eq!(sets.len(), 2);
    let mut orders: Vec<u64> = sets.iter().map(|s| s["order"].as_u64().unwrap()).collect();
    orders.sort();
    assert_eq!(orders, vec![0, 1]);
}

#[test]
fn test_different_days_get_separate_sessions() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    log_set(dir, "Deadlift", 3, 140.0, "2024-05-01");
    log_set(dir, "Deadlift", 3, 145.0, "2024-05-03");

    let log = read_log(dir);
    assert_eq!(sessions(&log).len(), 2);
}

#[test]
fn test_show_lists_logged_sets() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    log_set(dir, "Bench Press", 8, 60.0, "2024-05-01");

    cli(dir)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-05-01"))
        .stdout(predicate::str::contains("Bench Press"))
        .stdout(predicate::str::contains("8 x 60 kg ✓"));
}

#[test]
fn test_show_empty_log() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions logged."));
}

#[test]
fn test_show_finished_only_hides_open_sets() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    log_set(dir, "Back Squat", 5, 100.0, "2024-05-01");
    cli(dir)
        .args(["log", "--exercise", "Back Squat", "--reps", "3", "--weight", "110"])
        .args(["--date", "2024-05-01"])
        .assert()
        .success();

    cli(dir)
        .args(["show", "--finished-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 x 100 kg"))
        .stdout(predicate::str::contains("3 x 110 kg").not());
}

#[test]
fn test_show_date_range() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    log_set(dir, "Plank", 1, 0.0, "2024-04-01");
    log_set(dir, "Plank", 1, 0.0, "2024-05-01");

    cli(dir)
        .args(["show", "--from", "2024-04-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-05-01"))
        .stdout(predicate::str::contains("2024-04-01").not());
}

#[test]
fn test_unknown_exercise_fails() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["log", "--exercise", "Underwater Basket Weaving", "--reps", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown exercise"));

    assert!(!dir.join("workouts.json").exists());
}

#[test]
fn test_move_entry_reorders_session() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    log_set(dir, "Back Squat", 5, 100.0, "2024-05-01");
    log_set(dir, "Bench Press", 5, 70.0, "2024-05-01");

    let log = read_log(dir);
    let session = &sessions(&log)[0];
    let session_id = session["id"].as_str().unwrap().to_string();
    let entries = session["entries"].as_array().unwrap();
    let moving = entries
        .iter()
        .find(|e| e["order"] == 1)
        .expect("second entry");
    let moving_id = moving["id"].as_str().unwrap().to_string();

    cli(dir)
        .args(["move-entry", "--session", &session_id, "--entry", &moving_id])
        .args(["--order", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved entry"));

    let log = read_log(dir);
    let entries = sessions(&log)[0]["entries"].as_array().unwrap().clone();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        let expected = if entry["id"] == moving_id.as_str() { 0 } else { 1 };
        assert_eq!(entry["order"], expected);
    }
}

#[test]
fn test_delete_exercise_removes_entries_and_catalog_item() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    log_set(dir, "Back Squat", 5, 100.0, "2024-05-01");
    log_set(dir, "Bench Press", 5, 70.0, "2024-05-01");
    log_set(dir, "Back Squat", 5, 100.0, "2024-05-03");

    cli(dir)
        .args(["delete-exercise", "--exercise", "Back Squat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("and 2 entries"));

    let log = read_log(dir);
    for session in sessions(&log) {
        for entry in session["entries"].as_array().unwrap() {
            assert_eq!(entry["order"], 0);
        }
    }
    let remaining: usize = sessions(&log)
        .iter()
        .map(|s| s["entries"].as_array().unwrap().len())
        .sum();
    assert_eq!(remaining, 1);

    // Removal survives restarts through the user exercise file
    assert!(dir.join("exercises.json").exists());
    cli(dir)
        .arg("exercises")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bench Press"))
        .stdout(predicate::str::contains("Back Squat").not());
}

#[test]
fn test_add_exercise_then_log_it() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["add-exercise", "--name", "Hip Thrust", "--category", "legs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added exercise Hip Thrust"));

    cli(dir)
        .arg("exercises")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hip Thrust"));

    log_set(dir, "hip thrust", 10, 80.0, "2024-05-01");
    assert_eq!(sessions(&read_log(dir)).len(), 1);
}

#[test]
fn test_add_duplicate_exercise_fails() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["add-exercise", "--name", "deadlift"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_export_writes_csv() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    log_set(dir, "Back Squat", 5, 100.0, "2024-05-01");
    log_set(dir, "Back Squat", 5, 105.0, "2024-05-01");

    let out = dir.join("export").join("sets.csv");
    cli(dir)
        .arg("export")
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 sets"));

    let csv = fs::read_to_string(&out).expect("Failed to read export");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("session_id,date,exercise_id,exercise"));
    assert!(lines[1].contains("Back Squat"));
}

#[test]
fn test_corrupt_log_is_not_overwritten() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    fs::write(dir.join("workouts.json"), "{ not json").unwrap();

    cli(dir)
        .args(["log", "--exercise", "Dip", "--reps", "8"])
        .assert()
        .failure();

    let contents = fs::read_to_string(dir.join("workouts.json")).unwrap();
    assert_eq!(contents, "{ not json");
}

#[test]
fn test_invalid_calendar_offset_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    fs::write(
        dir.join("config.toml"),
        "[calendar]\nutc_offset_minutes = 5000\n",
    )
    .unwrap();

    cli(dir).arg("exercises").assert().failure();
}

#[test]
fn test_calendar_offset_decides_the_day() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    fs::write(
        dir.join("config.toml"),
        "[calendar]\nutc_offset_minutes = -300\n",
    )
    .unwrap();

    log_set(dir, "Pull-Up", 8, 0.0, "2024-05-01");

    // Noon local on 2024-05-01 at UTC-5 is 17:00 UTC
    let log = read_log(dir);
    let date = sessions(&log)[0]["date"].as_str().unwrap().to_string();
    assert!(date.starts_with("2024-05-01T17:00:00"), "got {}", date);
}

#[test]
fn test_non_finite_weight_is_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    log_set(dir, "Back Squat", 5, 100.0, "2024-05-01");

    for weight in ["inf", "NaN", "-20"] {
        cli(dir)
            .args(["log", "--exercise", "Back Squat", "--reps", "5"])
            .arg(format!("--weight={}", weight))
            .args(["--date", "2024-05-01"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("weight must be"));
    }

    // The log is still readable and unchanged
    cli(dir)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("5 x 100 kg"));
    let log = read_log(dir);
    let sets = sessions(&log)[0]["entries"][0]["sets"].as_array().unwrap();
    assert_eq!(sets.len(), 1);
}
