//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against the dev data directory
//! and verify outputs.

use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "daybook-cli", "--"])
        .args(args)
        .env("DAYBOOK_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_timer_status() {
    let (stdout, _, code) = run_cli(&["timer", "status"]);
    assert_eq!(code, 0, "Timer status failed");
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("status should print JSON");
    assert_eq!(parsed["type"], "StateSnapshot");
    assert_eq!(parsed["running"], true);
}

#[test]
fn test_timer_reset() {
    let (stdout, _, code) = run_cli(&["timer", "reset"]);
    assert_eq!(code, 0, "Timer reset failed");
    assert!(stdout.contains("TimerReset"));
}

#[test]
fn test_timer_tick() {
    let (stdout, _, code) = run_cli(&["timer", "tick", "--count", "3"]);
    assert_eq!(code, 0, "Timer tick failed");
    assert!(stdout.contains("StateSnapshot"));
}

#[test]
fn test_timer_toggle() {
    let (_, _, code) = run_cli(&["timer", "toggle"]);
    assert_eq!(code, 0, "Timer toggle failed");
}

#[test]
fn test_timer_skip_break_outside_break_prints_snapshot() {
    let _ = run_cli(&["timer", "reset"]);
    let (stdout, _, code) = run_cli(&["timer", "skip-break"]);
    assert_eq!(code, 0, "Timer skip-break failed");
    // Fresh sessions start in Writing, so the skip is invalid and the
    // current snapshot is printed instead.
    assert!(stdout.contains("StateSnapshot"));
}

#[test]
fn test_config_get() {
    let (stdout, _, code) = run_cli(&["config", "get", "timer.total_cycles"]);
    assert_eq!(code, 0, "Config get failed");
    assert!(!stdout.trim().is_empty());
}

#[test]
fn test_config_get_unknown_key_fails() {
    let (_, _, code) = run_cli(&["config", "get", "timer.nonexistent"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_set() {
    let (stdout, _, code) = run_cli(&["config", "set", "feedback.chime", "true"]);
    assert_eq!(code, 0, "Config set failed");
    assert!(stdout.contains("ok"));
}

#[test]
fn test_config_list() {
    let (stdout, _, code) = run_cli(&["config", "list"]);
    assert_eq!(code, 0, "Config list failed");
    assert!(stdout.contains("timer"));
}

#[test]
fn test_config_path() {
    let (stdout, _, code) = run_cli(&["config", "path"]);
    assert_eq!(code, 0, "Config path failed");
    assert!(stdout.contains("config.toml"));
}

#[test]
fn test_progress_show() {
    let (_, _, code) = run_cli(&["progress", "show"]);
    assert_eq!(code, 0, "Progress show failed");
}

#[test]
fn test_progress_clear() {
    let (stdout, _, code) = run_cli(&["progress", "clear"]);
    assert_eq!(code, 0, "Progress clear failed");
    assert!(stdout.contains("ok"));
}

#[test]
fn test_progress_show_with_date() {
    let (stdout, _, code) = run_cli(&["progress", "show", "--date", "1999-01-01"]);
    assert_eq!(code, 0, "Progress show with date failed");
    assert!(stdout.contains("no stored progress") || stdout.contains("remaining_secs"));
}

#[test]
fn test_progress_rejects_bad_date() {
    let (_, _, code) = run_cli(&["progress", "show", "--date", "not-a-date"]);
    assert_ne!(code, 0);
}

#[test]
fn test_completions() {
    let (stdout, _, code) = run_cli(&["completions", "bash"]);
    assert_eq!(code, 0, "Completions failed");
    assert!(stdout.contains("daybook"));
}
