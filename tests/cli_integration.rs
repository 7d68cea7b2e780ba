//! Integration tests for the Keyhold CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! The password is always supplied via flag or `KEYHOLD_PASSWORD` so
//! no test ever blocks on an interactive prompt.

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Helper: get a Command pointing at the keyhold binary.
fn keyhold() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("keyhold").expect("binary should exist")
}

#[test]
fn help_flag_shows_usage() {
    keyhold()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Password-protected keystore for keys and certificates",
        ))
        .stdout(predicate::str::contains("create"));
}

#[test]
fn version_flag_shows_version() {
    keyhold()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("keyhold"));
}

#[test]
fn no_args_shows_help() {
    // Running with no subcommand should show an error or help.
    keyhold()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn create_reports_absolute_path() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("app.keyhold");

    keyhold()
        .arg("create")
        .arg(&store)
        .arg("--password")
        .arg("abc123")
        .assert()
        .success()
        .stdout(predicate::str::contains("app.keyhold"))
        .stdout(predicate::str::contains("keyhold"));

    assert!(store.exists(), "create must leave a store file on disk");
}

#[test]
fn create_accepts_password_from_env() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("env.keyhold");

    keyhold()
        .arg("create")
        .arg(&store)
        .env("KEYHOLD_PASSWORD", "from-the-env")
        .assert()
        .success();

    assert!(store.exists());
}

#[test]
fn create_twice_fails_without_force() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("dup.keyhold");

    keyhold()
        .arg("create")
        .arg(&store)
        .arg("--password")
        .arg("abc123")
        .assert()
        .success();

    keyhold()
        .arg("create")
        .arg(&store)
        .arg("--password")
        .arg("abc123")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn create_twice_succeeds_with_force() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("force.keyhold");

    keyhold()
        .arg("create")
        .arg(&store)
        .arg("--password")
        .arg("abc123")
        .assert()
        .success();

    keyhold()
        .arg("create")
        .arg(&store)
        .arg("--force")
        .arg("--password")
        .arg("new-password")
        .assert()
        .success();
}

#[test]
fn create_with_custom_store_type() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("typed.keyhold");

    keyhold()
        .arg("create")
        .arg(&store)
        .arg("--store-type")
        .arg("pkcs12-like")
        .arg("--password")
        .arg("abc123")
        .assert()
        .success()
        .stdout(predicate::str::contains("pkcs12-like"));
}
