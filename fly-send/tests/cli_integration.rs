//! CLI integration tests for fly-send

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_test_env() -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();

    let config_dir = temp_dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let config_path = config_dir.join("config.toml");
    let db_path = data_dir.join("socialfly.db");

    let config_content = format!(
        r#"
[database]
path = "{}"

[scheduler]
poll_interval = 5
"#,
        db_path.to_string_lossy(),
    );

    fs::write(&config_path, config_content).unwrap();

    (temp_dir, config_path.to_string_lossy().to_string())
}

#[test]
fn test_help_documents_daemon_options() {
    Command::cargo_bin("fly-send")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--poll-interval"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_once_with_empty_queue_exits_cleanly() {
    let (_temp, config_path) = setup_test_env();

    Command::cargo_bin("fly-send")
        .unwrap()
        .env("SOCIALFLY_CONFIG", &config_path)
        .arg("--once")
        .assert()
        .success();
}

#[test]
fn test_missing_config_fails() {
    Command::cargo_bin("fly-send")
        .unwrap()
        .env("SOCIALFLY_CONFIG", "/nonexistent/config.toml")
        .arg("--once")
        .assert()
        .failure();
}
