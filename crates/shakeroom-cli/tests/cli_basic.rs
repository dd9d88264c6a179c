//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway HOME so the
//! real config file is never touched.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "shakeroom-cli", "--"])
        .args(args)
        .env("HOME", home)
        .env_remove("SHAKEROOM_ENV")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_config_get_default() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "session.duration_secs"]);
    assert_eq!(code, 0, "config get failed");
    assert_eq!(stdout.trim(), "70");
}

#[test]
fn test_config_set_then_get() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "set", "session.boss.required", "12"]);
    assert_eq!(code, 0, "config set failed");
    assert_eq!(stdout.trim(), "ok");

    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "session.boss.required"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "12");
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "session.boss.fallback", "0.99"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("boss.fallback"), "unexpected stderr: {stderr}");
}

#[test]
fn test_config_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "get", "session.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_and_path() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0, "config list failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["session"]["boss"]["required"], 10);

    let (code, stdout, _) = run_cli(home.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with("config.toml"));
    assert!(stdout.contains("shakeroom"));
}

#[test]
fn test_play_json_loses_without_enough_impulses() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &["play", "--duration", "2", "--rate", "1", "--seed", "7", "--json"],
    );
    assert_eq!(code, 2, "a lost session exits with 2");

    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(!events.is_empty());
    assert_eq!(events[0]["type"], "state_changed");
    let last = events.last().unwrap();
    assert_eq!(last["type"], "session_ended");
    assert_eq!(last["won"], false);
    assert_eq!(
        events.iter().filter(|e| e["type"] == "session_ended").count(),
        1
    );
}

#[test]
fn test_play_fast_shaking_wins() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &["play", "--duration", "6", "--rate", "40", "--seed", "3"],
    );
    assert_eq!(code, 0, "expected a win, got: {stdout}");
    assert!(stdout.contains("Won"));
}

#[test]
fn test_play_rejects_bad_rate() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["play", "--rate", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("--rate"));
}
