//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary and verify outputs. Nothing here talks to
//! Google: every command either stays local or fails before authenticating.

use std::process::Command;

/// Run a CLI command against the dev data directory and return output.
fn run_cli(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_calmcp"))
        .env("CALMCP_ENV", "dev")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_help_lists_commands() {
    let (code, stdout, _) = run_cli(&["--help"]);
    assert_eq!(code, 0);
    for command in ["auth", "check", "create", "config"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_config_list_is_json() {
    let (code, stdout, _) = run_cli(&["config", "list"]);
    assert_eq!(code, 0, "config list failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["blocking"]["block_threshold"].is_number());
    assert!(parsed["conflicts"]["calendars_to_check"].is_array());
}

#[test]
fn test_config_get_unknown_key_fails() {
    let (code, _, stderr) = run_cli(&["config", "get", "conflicts.no_such_key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_set_rejects_out_of_range_threshold() {
    let (code, _, stderr) = run_cli(&["config", "set", "blocking.block_threshold", "1.5"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));
}

#[test]
fn test_check_rejects_malformed_start() {
    let (code, _, stderr) = run_cli(&[
        "check",
        "--title",
        "Lunch",
        "--start",
        "tomorrow at noon",
        "--end",
        "2025-03-14T13:00:00Z",
    ]);
    assert_eq!(code, 1);
    assert!(stderr.contains("invalid timestamp"));
}

#[test]
fn test_create_rejects_malformed_all_day_date() {
    let (code, _, stderr) = run_cli(&[
        "create",
        "--title",
        "Offsite",
        "--start",
        "2025-13-40",
        "--all-day",
    ]);
    assert_eq!(code, 1);
    assert!(stderr.contains("invalid date"));
}

#[test]
fn test_create_requires_title() {
    let (code, _, _) = run_cli(&["create", "--start", "2025-03-14T12:00:00Z"]);
    assert_ne!(code, 0);
}
