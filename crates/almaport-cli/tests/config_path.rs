use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("almaport")
        .env("ALMAPORT_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("almaport")
        .env("ALMAPORT_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    assert!(config_path.exists());

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("base_url ="));
    assert!(contents.contains("timeout_secs ="));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(&config_path, "# existing config").unwrap();

    cargo_bin_cmd!("almaport")
        .env("ALMAPORT_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_set_url_updates_file_preserving_comments() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    cargo_bin_cmd!("almaport")
        .env("ALMAPORT_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success();

    cargo_bin_cmd!("almaport")
        .env("ALMAPORT_HOME", dir.path())
        .args(["config", "set-url", "https://portal.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Set base_url to https://portal.example.com",
        ));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("base_url = \"https://portal.example.com\""));
    assert!(
        contents.contains("# Request timeout"),
        "comments should survive the edit, got:\n{}",
        contents
    );
}

#[test]
fn test_config_set_url_rejects_invalid_url() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("almaport")
        .env("ALMAPORT_HOME", dir.path())
        .args(["config", "set-url", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid base URL"));
}
