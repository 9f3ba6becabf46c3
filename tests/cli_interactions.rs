//! CLI behaviour tests against the built binary

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "SPEED_SERVER_URL",
    "LATENCY_COUNT",
    "LATENCY_BYTES",
    "FULL_TEST",
    "REQUEST_TIMEOUT_SECONDS",
    "ENABLE_COLOR",
];

/// Binary with a clean environment, run from an empty directory
fn create_test_cmd(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nst").unwrap();
    cmd.current_dir(workdir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_options() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--server"))
        .stdout(predicate::str::contains("--latency-count"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_conflicting_color_flags() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--color", "--no-color"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--color"));
}

#[test]
fn test_invalid_values_are_config_errors() {
    let dir = TempDir::new().unwrap();

    create_test_cmd(&dir)
        .args(["--no-color", "--server", "ftp://example.com"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("CONFIG"));

    create_test_cmd(&dir)
        .args(["--no-color", "--latency-count", "0"])
        .assert()
        .code(1);

    create_test_cmd(&dir)
        .args(["--no-color", "--timeout", "0"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_env_file_value() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "LATENCY_COUNT=many\n").unwrap();

    create_test_cmd(&dir)
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("LATENCY_COUNT"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_json_report_against_mock_server() {
    let server = common::start_speed_server().await;
    let dir = TempDir::new().unwrap();
    let mut cmd = create_test_cmd(&dir);
    cmd.args(["--server", &server.uri(), "--latency-count", "3", "--json", "--timeout", "10"]);

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["server"]["city"], "Amsterdam");
    assert_eq!(report["latency"]["samples"], 3);
    assert!(report["download"]["p90"].as_f64().unwrap() > 0.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_console_report_against_mock_server() {
    let server = common::start_speed_server().await;
    let dir = TempDir::new().unwrap();
    let mut cmd = create_test_cmd(&dir);
    cmd.args(["--server", &server.uri(), "--latency-count", "3", "--no-color", "--verbose"]);

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Server location:  Amsterdam (AMS)"));
    assert!(stdout.contains("Your IP:          198.51.100.23 (NL)"));
    assert!(stdout.contains("Phases (mean):"));
}

#[test]
fn test_runtime_error_follows_env_color_setting() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let server = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
    drop(listener);

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "ENABLE_COLOR=false\n").unwrap();

    create_test_cmd(&dir)
        .env("CLICOLOR_FORCE", "1")
        .args(["--server", &server, "--latency-count", "1", "--timeout", "5"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error: [NETWORK]"))
        .stderr(predicate::str::contains("\x1b[").not());
}
