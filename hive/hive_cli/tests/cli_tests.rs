use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn write_config(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write config");
    path
}

#[test]
fn test_run_pingpong_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("node.log");
    let config = write_config(
        &dir,
        "node.toml",
        &format!(
            "thread = 2\nbootstrap = \"pingpong 20 abort\"\nlogger = \"{}\"\nclock_interval_us = 1000\n",
            log.display()
        ),
    );

    Command::cargo_bin("hive")
        .unwrap()
        .args(["run", "--config", config.to_str().unwrap()])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("node stopped"));

    assert!(log.exists());
}

#[test]
fn test_run_overrides() {
    Command::cargo_bin("hive")
        .unwrap()
        .args(["run", "--threads", "1", "--bootstrap", "pingpong 3 abort"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("node stopped"));
}

#[test]
fn test_run_unknown_bootstrap_fails() {
    Command::cargo_bin("hive")
        .unwrap()
        .args(["run", "--threads", "1", "--bootstrap", "nosuchmodule"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Bootstrap error: nosuchmodule"));
}

#[test]
fn test_check_prints_effective_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "node.json", r#"{ "thread": 3, "harbor": 2 }"#);

    Command::cargo_bin("hive")
        .unwrap()
        .args(["check", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("thread = 3"))
        .stdout(predicate::str::contains("harbor = 2"))
        .stdout(predicate::str::contains("configuration ok"));
}

#[test]
fn test_check_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "bad.toml", "thread = 0\n");

    Command::cargo_bin("hive")
        .unwrap()
        .args(["check", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Thread count must be greater than zero"));
}

#[test]
fn test_check_missing_file() {
    Command::cargo_bin("hive")
        .unwrap()
        .args(["check", "/nonexistent/hive.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
