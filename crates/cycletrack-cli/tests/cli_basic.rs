//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify its JSON output.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_cycletrack-cli"))
        .env("CYCLETRACK_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Run a CLI command, expect success and parse its JSON output.
fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command {args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_date_add_creates_then_merges() {
    let dir = tempfile::tempdir().unwrap();

    let first = run_json(dir.path(), &["date", "add", "2024-07-20"]);
    assert_eq!(first["created"], true);

    let second = run_json(dir.path(), &["date", "add", "2024-07-23"]);
    assert_eq!(second["created"], false);
    assert_eq!(second["rule"], "backward");
    assert_eq!(second["episode_id"], first["episode_id"]);

    let third = run_json(dir.path(), &["date", "add", "2024-07-27"]);
    assert_eq!(third["created"], true);
}

#[test]
fn test_date_add_duplicate_fails() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["date", "add", "2024-07-20"]);
    let (_, stderr, code) = run_cli(dir.path(), &["date", "add", "2024-07-20"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already added"), "stderr: {stderr}");
}

#[test]
fn test_date_add_rejects_future_and_malformed_dates() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["date", "add", "2999-01-01"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("in the future"), "stderr: {stderr}");

    let (_, _, code) = run_cli(dir.path(), &["date", "add", "20/07/2024"]);
    assert_ne!(code, 0);
}

#[test]
fn test_date_remove_checks_owner() {
    let dir = tempfile::tempdir().unwrap();
    let added = run_json(dir.path(), &["--subject", "1", "date", "add", "2024-07-20"]);
    let id = added["date_entry_id"].to_string();

    let (_, stderr, code) = run_cli(dir.path(), &["--subject", "2", "date", "remove", &id]);
    assert_eq!(code, 1);
    assert!(stderr.contains("does not belong"), "stderr: {stderr}");

    let removed = run_json(dir.path(), &["--subject", "1", "date", "remove", &id]);
    assert_eq!(removed["code"], "success");

    let (_, stderr, code) = run_cli(dir.path(), &["--subject", "1", "date", "remove", &id]);
    assert_eq!(code, 1);
    assert!(stderr.contains("does not exist"), "stderr: {stderr}");
}

#[test]
fn test_episode_list_and_last() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["episode", "last"]);
    assert_eq!(code, 1);

    run_json(dir.path(), &["date", "add", "2024-06-02"]);
    run_json(dir.path(), &["date", "add", "2024-07-01"]);
    run_json(dir.path(), &["date", "add", "2024-07-02"]);

    let all = run_json(dir.path(), &["episode", "list"]);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let june = run_json(dir.path(), &["episode", "list", "--year", "2024", "--month", "6"]);
    assert_eq!(june.as_array().unwrap().len(), 1);
    assert_eq!(june[0]["started_at"], "2024-06-02");

    let last = run_json(dir.path(), &["episode", "last"]);
    assert_eq!(last["started_at"], "2024-07-01");
    assert_eq!(last["last_date"], "2024-07-02");
    assert_eq!(last["dates"].as_array().unwrap().len(), 2);
}

#[test]
fn test_forecast() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["forecast"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not enough data"), "stderr: {stderr}");

    run_json(dir.path(), &["date", "add", "2024-07-03"]);
    run_json(dir.path(), &["date", "add", "2024-08-01"]);

    let forecast = run_json(dir.path(), &["forecast"]);
    assert_eq!(forecast["cycle_length_days"], 28);
    assert_eq!(forecast["period_dates"].as_array().unwrap().len(), 12);
    assert_eq!(forecast["period_dates"][0], "2024-08-29");
    assert_eq!(forecast["ovulation_dates"][0], "2024-08-15");
}

#[test]
fn test_profile_set_and_regular_forecast() {
    let dir = tempfile::tempdir().unwrap();
    let profile = run_json(
        dir.path(),
        &[
            "profile",
            "set",
            "--initial-period-date",
            "2024-07-20",
            "--regular",
            "true",
        ],
    );
    assert_eq!(profile["isMenstrualCycleRegular"], true);
    assert_eq!(profile["initialPeriodDate"], "2024-07-20");

    let shown = run_json(dir.path(), &["profile", "show"]);
    assert_eq!(shown, profile);

    let forecast = run_json(dir.path(), &["forecast"]);
    assert_eq!(forecast["period_dates"][0], "2024-08-17");
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "forecast.horizon"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "12");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "forecast.horizon", "3"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "forecast.horizon"]);
    assert_eq!(stdout.trim(), "3");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "forecast.bogus", "3"]);
    assert_eq!(code, 1);
}
