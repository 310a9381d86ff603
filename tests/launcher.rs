//! End-to-end launcher scenarios against a fake Python interpreter.
//!
//! The fake interpreter is a shell script planted in a temp project; the
//! `ODDSRUNNER_PYTHON` override points the resolver at it, so every scenario
//! runs hermetically without a real pipeline.

#![cfg(unix)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};

/// Write an executable interpreter stand-in into the project dir.
fn plant_python(project: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = project.join("fake-python");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn runner(project: &Path, python: &Path) -> Command {
    let mut cmd = Command::cargo_bin("oddsrunner").unwrap();
    cmd.current_dir(project)
        .env("ODDSRUNNER_PYTHON", python)
        .env_remove("ODDSRUNNER_PATH");
    cmd
}

#[test]
fn test_invalid_backfill_mode_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(dir.path(), "exit 0");
    runner(dir.path(), &python)
        .args(["backfill", "tierX"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicates::str::contains("invalid mode"));
}

#[test]
fn test_failing_task_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(dir.path(), "echo scrape blew up >&2\nexit 1");
    runner(dir.path(), &python)
        .args(["run", "ingest"])
        .assert()
        .failure()
        .code(1);

    // The failure still left a durable log line behind.
    let log = std::fs::read_to_string(dir.path().join("logs/ingest.log")).unwrap();
    assert!(log.contains("scrape blew up"));
    assert!(log.contains("finished: failed (exit code 1)"));
}

#[test]
fn test_backfill_all_aborts_after_tier_b() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(
        dir.path(),
        "echo \"ARGS $*\"\ncase \"$*\" in *americanfootball_nfl*) exit 1;; esac\nexit 0",
    );
    runner(dir.path(), &python)
        .args(["backfill", "all"])
        .assert()
        .failure()
        .code(1);

    let log = std::fs::read_to_string(dir.path().join("logs/backfill.log")).unwrap();
    assert!(log.contains("basketball_nba"));
    assert!(log.contains("americanfootball_nfl"));
    // tierC never ran
    assert!(!log.contains("icehockey_nhl"));
}

#[test]
fn test_backfill_single_sport_invokes_once_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(dir.path(), "echo \"ARGS $*\"\nexit 0");
    runner(dir.path(), &python)
        .args(["backfill", "sport:icehockey_nhl"])
        .assert()
        .success();

    let log = std::fs::read_to_string(dir.path().join("logs/backfill.log")).unwrap();
    let arg_lines: Vec<&str> = log.lines().filter(|l| l.contains("ARGS")).collect();
    assert_eq!(arg_lines.len(), 1);
    assert!(
        arg_lines[0].contains("--sport icehockey_nhl --days 30 --interval 24"),
        "unexpected args: {}",
        arg_lines[0]
    );
}

#[test]
fn test_setup_creates_dirs_without_task_logs() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(dir.path(), "exit 0");
    runner(dir.path(), &python)
        .args(["setup", "--no-pip"])
        .assert()
        .success();

    assert!(dir.path().join("data").is_dir());
    assert!(dir.path().join("logs").is_dir());
    // Schema init logged to setup.log; no pipeline task ran.
    for task in ["ingest", "decision", "features", "backfill"] {
        assert!(
            !dir.path().join(format!("logs/{task}.log")).exists(),
            "{task}.log should not exist after setup without --run-now"
        );
    }
}

#[test]
fn test_setup_run_now_executes_ingest_and_features() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(dir.path(), "echo ok: \"$@\"\nexit 0");
    runner(dir.path(), &python)
        .args(["setup", "--no-pip", "--run-now"])
        .assert()
        .success();

    assert!(dir.path().join("logs/ingest.log").is_file());
    assert!(dir.path().join("logs/features.log").is_file());
}

#[test]
fn test_schedule_install_dry_run_renders_tagged_block() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(dir.path(), "exit 0");
    let output = runner(dir.path(), &python)
        .args(["schedule", "install", "--dry-run"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let rendered = String::from_utf8(output).unwrap();
    let tagged: Vec<&str> = rendered
        .lines()
        .filter(|l| l.contains("# oddsrunner"))
        .collect();
    assert_eq!(tagged.len(), 4, "one line per default entry:\n{rendered}");
    assert!(rendered.contains("*/5 * * * *"));
    assert!(rendered.contains("manage.py scrape"));
    assert!(rendered.contains("src.backfill"));
}

#[test]
fn test_schedule_install_windows_writes_helper() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(dir.path(), "exit 0");
    runner(dir.path(), &python)
        .args(["schedule", "install", "--platform", "windows"])
        .assert()
        .success();

    let helper = dir.path().join("install_schedules.cmd");
    let script = std::fs::read_to_string(&helper).unwrap();
    assert!(script.contains("schtasks /Create /F"));
    assert!(script.contains("oddsrunner\\ingest"));
}

#[test]
fn test_schedule_install_unknown_platform_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(dir.path(), "exit 0");
    runner(dir.path(), &python)
        .args(["schedule", "install", "--platform", "beos"])
        .assert()
        .code(2)
        .stderr(predicates::str::contains("unknown platform"));
}

#[test]
fn test_schedule_preview_huge_window_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(dir.path(), "exit 0");
    runner(dir.path(), &python)
        .args(["schedule", "preview", "--hours", &u64::MAX.to_string()])
        .assert()
        .code(2)
        .stderr(predicates::str::contains("preview window"));
}

#[test]
fn test_schedule_preview_lists_ingest_runs() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(dir.path(), "exit 0");
    runner(dir.path(), &python)
        .args(["schedule", "preview", "--hours", "1"])
        .assert()
        .success()
        .stdout(predicates::str::contains("ingest"));
}

#[test]
fn test_history_records_runs() {
    let dir = tempfile::tempdir().unwrap();
    let python = plant_python(dir.path(), "exit 0");

    runner(dir.path(), &python)
        .args(["history"])
        .assert()
        .success()
        .stdout(predicates::str::contains("No runs recorded yet."));

    runner(dir.path(), &python)
        .args(["run", "ingest"])
        .assert()
        .success();

    runner(dir.path(), &python)
        .args(["history"])
        .assert()
        .success()
        .stdout(predicates::str::contains("ingest"));
}

#[test]
fn test_missing_interpreter_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    // No override, no venv. Hide PATH so system interpreters vanish too.
    Command::cargo_bin("oddsrunner")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("ODDSRUNNER_PYTHON")
        .env("PATH", "")
        .args(["run", "ingest"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("no usable Python interpreter"));
}
