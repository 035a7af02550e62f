//! Integration tests for the command-line interface.
//!
//! These run the compiled binary and inspect its exit status and output.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

/// Get the path to the compiled binary
fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_overlay-node-agent"))
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(binary_path())
        .args(args)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_check_config_accepts_defaults() {
    let output = run(&["--no-config", "--check-config"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Configuration is valid"));
}

#[test]
fn test_check_config_rejects_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agent.yaml");
    fs::write(&path, "port: 8088\nshutdown_delay_ms: 5\n").unwrap();

    let output = run(&["-c", path.to_str().unwrap(), "--check-config"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("shutdown_delay_ms"), "stderr: {stderr}");
}

#[test]
fn test_invalid_roster_address_flag_is_rejected() {
    let output = run(&["--no-config", "--roster-address", "not-an-ip", "--check-config"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("not-an-ip"), "stderr: {stderr}");
}

#[test]
fn test_show_config_merges_cli_overrides() {
    let output = run(&[
        "--no-config",
        "--show-config",
        "--config-format",
        "json",
        "-p",
        "9001",
        "--disable-shutdown",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["port"], 9001);
    assert_eq!(value["enable_shutdown"], false);
}

#[test]
fn test_access_subcommand_reports_decision() {
    let output = run(&["--no-config", "--log-level", "off", "access", "100.101.102.103:41641"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("allowed (overlay range)"), "stdout: {stdout}");

    let output = run(&["--no-config", "--log-level", "off", "access", "8.8.8.8:53"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("denied (not a network member)"), "stdout: {stdout}");
}

#[test]
fn test_access_subcommand_uses_roster_flag() {
    let output = run(&[
        "--no-config",
        "--log-level",
        "off",
        "--roster-address",
        "192.168.7.7",
        "access",
        "192.168.7.7:8088",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("allowed (known peer)"), "stdout: {stdout}");
    assert!(stdout.contains("Roster:   attached"));
}

#[test]
fn test_check_subcommand_collects_metrics() {
    let output = run(&["--no-config", "--log-level", "off", "check", "--interval-ms", "50"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("# TYPE system_cpu_usage_percent gauge"));
    assert!(stdout.contains("All checks passed"));
}

#[test]
fn test_config_subcommand_ignores_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("broken.yaml");
    fs::write(&config, "port: 0\n").unwrap();

    let output = run(&["-c", config.to_str().unwrap(), "config", "-o", "-", "--format", "json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("\"port\": 8088"));
}

#[test]
fn test_config_subcommand_writes_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("generated.toml");

    let output = run(&["config", "-o", path.to_str().unwrap(), "--format", "toml"]);
    assert!(output.status.success());

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("port = 8088"), "content: {content}");
}

#[test]
fn test_config_subcommand_yaml_to_stdout() {
    let output = run(&["config", "-o", "-"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.starts_with("# Overlay Node Agent Configuration"));
    assert!(stdout.contains("port: 8088"));
}
