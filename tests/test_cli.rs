//! End-to-end tests for the opencode binary

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use std::fs;

fn opencode() -> Command {
    let mut cmd = Command::cargo_bin("opencode").unwrap();
    cmd.env_remove("OPENCODE_FUNCTIONS").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_inline_code() {
    let dir = sample_functions();
    opencode()
        .arg("--functions")
        .arg(dir.path())
        .args(["-c", "add 2 3"])
        .assert()
        .success()
        .stdout("The sum is: 5.0\n");
}

#[test]
fn test_script_file() {
    let dir = sample_functions();
    let script = dir.path().join("main.oc");
    fs::write(&script, "add 2 3\nadd x y\n").unwrap();

    opencode()
        .arg("-f")
        .arg(dir.path())
        .arg(&script)
        .assert()
        .success()
        .stdout("The sum is: 5.0\nEnter valid numbers.\n");
}

#[test]
fn test_stdin_script_with_json() {
    let dir = sample_functions();
    opencode()
        .arg("-f")
        .arg(dir.path())
        .args(["--json", "-"])
        .write_stdin("echo hi\nnope\n")
        .assert()
        .success()
        .stdout("{\"output\":\"hi\\n[Unknown Command] nope\\n\"}\n");
}

#[test]
fn test_functions_from_env() {
    let dir = sample_functions();
    opencode()
        .env("OPENCODE_FUNCTIONS", dir.path())
        .args(["-c", "echo from env"])
        .assert()
        .success()
        .stdout("from env\n");
}

#[test]
fn test_config_file() {
    let dir = sample_functions();
    let config = dir.path().join("opencode.toml");
    fs::write(&config, "functions_dir = \".\"\n").unwrap();

    opencode()
        .arg("--config")
        .arg(&config)
        .args(["-c", "add 1 1"])
        .assert()
        .success()
        .stdout("The sum is: 2.0\n");
}

#[test]
fn test_bad_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("opencode.toml");
    fs::write(&config, "functions_dir = [").unwrap();

    opencode()
        .arg("--config")
        .arg(&config)
        .args(["-c", "add 1 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_list() {
    let dir = sample_functions();
    opencode()
        .arg("-f")
        .arg(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout("add\necho\nfail\n");

    opencode()
        .arg("-f")
        .arg(dir.path())
        .args(["--json", "list"])
        .assert()
        .success()
        .stdout("[\"add\",\"echo\",\"fail\"]\n");
}

#[test]
fn test_load_error_reported_on_stderr() {
    let dir = TempDir::new().unwrap();
    write_unit(dir.path(), "bad.wat", "(module (func");
    write_unit(dir.path(), "echo.wat", ECHO);

    opencode()
        .arg("-f")
        .arg(dir.path())
        .args(["-c", "echo ok"])
        .assert()
        .success()
        .stdout("ok\n")
        .stderr(predicate::str::contains("bad"));
}

#[test]
fn test_shadowed_unit_logged() {
    let dir = TempDir::new().unwrap();
    write_unit(dir.path(), "dup.wasm", &printer("binary\n"));
    write_unit(dir.path(), "dup.wat", &printer("text\n"));

    opencode()
        .env("RUST_LOG", "warn")
        .arg("-f")
        .arg(dir.path())
        .args(["-c", "dup"])
        .assert()
        .success()
        .stdout("text\n")
        .stderr(predicate::str::contains("shadows").and(predicate::str::contains("dup")));
}

#[test]
fn test_missing_script_fails() {
    let dir = TempDir::new().unwrap();
    opencode()
        .arg(dir.path().join("missing.oc"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not read"));
}

#[test]
fn test_version() {
    opencode()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("opencode "));
}

#[test]
fn test_help_explains_list_keyword() {
    opencode()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("./list"));
}
