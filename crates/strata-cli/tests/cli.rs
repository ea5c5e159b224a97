//! End-to-end tests for the `strata` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn strata() -> Command {
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.env("STRATA_TEST_MODE", "1").env_remove("STRATA_CONFIG");
    cmd
}

// ============================================================================
// compile
// ============================================================================

#[test]
fn test_compile_stdin_to_cypher() {
    strata()
        .arg("compile")
        .write_stdin(r#"{"where": {"name": "Jack"}, "labels": ["Person"]}"#)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("MATCH (record:__RECORD__:`Person`)"))
        .stdout(predicate::str::contains(
            r#"any(value IN record.name WHERE value = "Jack")"#,
        ))
        .stdout(predicate::str::contains("SKIP 0 LIMIT 100"));
}

#[test]
fn test_compile_json_format() {
    let output = strata()
        .args(["compile", "--format", "json", "-"])
        .write_stdin(r#"{"where": {"EMPLOYEE": {"$alias": "$employee"}}, "aggregate": {"staff": {"fn": "count", "alias": "$employee"}}}"#)
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["where"]["aliasesMap"]["$employee"], "record1");
    assert_eq!(value["aggregate"]["withPart"], "WITH record, count(record1) AS staff");
}

#[test]
fn test_compile_rejects_unknown_operator() {
    strata()
        .arg("compile")
        .write_stdin(r#"{"where": {"age": {"$between": [1, 2]}}}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown operator `$between` for `age`"));
}

#[test]
fn test_compile_rejects_malformed_request() {
    strata()
        .arg("compile")
        .write_stdin("not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to decode search request"));
}

// ============================================================================
// normalize
// ============================================================================

#[test]
fn test_normalize_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("request.json");
    fs::write(&path, r#"{"where": {"$xor": {"city": "Doral", "name": "A"}}}"#).unwrap();

    let output = strata().arg("normalize").arg(&path).output().unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"where": {"$xor": [{"city": "Doral"}, {"name": "A"}]}})
    );
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_defaults_in_test_mode() {
    strata()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[compiler]"))
        .stdout(predicate::str::contains(r#"root_alias = "record""#));
}

#[test]
fn test_config_file_changes_compilation() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    fs::write(&config, "[compiler]\nroot_alias = \"node\"\ndefault_limit = 5\n").unwrap();

    strata()
        .arg("--config")
        .arg(&config)
        .arg("compile")
        .write_stdin(r#"{"where": {"name": "Jack"}}"#)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("MATCH (node:__RECORD__)"))
        .stdout(predicate::str::contains("SKIP 0 LIMIT 5"));
}

#[test]
fn test_missing_config_file_fails() {
    strata()
        .args(["--config", "/nonexistent/strata.toml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}
