//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_top_level_help_lists_commands() {
    let mut cmd = Command::cargo_bin("groovy").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("create-superuser"));
}

#[test]
fn test_serve_help() {
    let mut cmd = Command::cargo_bin("groovy").unwrap();
    cmd.arg("serve").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--cors-permissive"))
        .stdout(predicate::str::contains("--database-url"));
}

#[test]
fn test_create_superuser_help() {
    let mut cmd = Command::cargo_bin("groovy").unwrap();
    cmd.arg("create-superuser").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--email"))
        .stdout(predicate::str::contains("--password"));
}

#[test]
fn test_migrate_requires_database_url() {
    let mut cmd = Command::cargo_bin("groovy").unwrap();
    cmd.env_remove("DATABASE_URL")
        .current_dir(std::env::temp_dir())
        .arg("migrate");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--database-url"));
}

#[test]
fn test_unknown_command_fails() {
    let mut cmd = Command::cargo_bin("groovy").unwrap();
    cmd.arg("frobnicate");

    cmd.assert().failure();
}
