//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory,
//! so nothing touches the real config or stored login.

use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &TempDir, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_studyquest"))
        .args(args)
        .env("STUDYQUEST_DATA_DIR", data_dir.path())
        .env_remove("STUDYQUEST_PASSWORD")
        .output()
        .expect("failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_config_defaults() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&dir, &["config", "get", "timer.stale_after_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "180");

    let (stdout, _, code) = run_cli(&dir, &["config", "get", "api.base_url"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "http://localhost:5000/api");
}

#[test]
fn test_config_set_persists() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(&dir, &["config", "set", "timer.default_duration_minutes", "50"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_cli(&dir, &["config", "get", "timer.default_duration_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "50");
}

#[test]
fn test_config_rejects_bad_input() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&dir, &["config", "get", "timer.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown config key"), "stderr: {stderr}");

    let (_, _, code) = run_cli(&dir, &["config", "set", "timer.stale_after_minutes", "soon"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_list_is_json() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&dir, &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["timer"]["min_session_minutes"], 1);
}

#[test]
fn test_config_path_is_inside_data_dir() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&dir, &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().starts_with(dir.path().to_str().unwrap()));
}

#[test]
fn test_auth_status_logged_out() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&dir, &["auth", "status"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "not logged in");
}

#[test]
fn test_logout_without_login_is_ok() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&dir, &["auth", "logout"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "logged out");
}

#[test]
fn test_session_requires_login() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&dir, &["session", "start", "--subject", "Mathematics"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not logged in"), "stderr: {stderr}");

    let (_, stderr, code) = run_cli(&dir, &["achievements", "check"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not logged in"), "stderr: {stderr}");
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&dir, &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("studyquest"));
}
