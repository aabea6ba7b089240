//! Integration tests for the `atrium` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn atrium() -> Command {
    let mut cmd = Command::cargo_bin("atrium").unwrap();
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("catalog.json");
    let fixture = serde_json::json!({
        "agents": [
            {"_id": "a1", "name": "Research Helper", "category": "research",
             "updatedAt": "2025-08-31T12:00:00Z", "instructions": "internal"},
            {"id": "a2", "name": "Essay Writer", "category": "writing"}
        ],
        "grants": [
            {"principalType": "public", "resourceType": "agent", "resourceId": "a1", "permBits": 1}
        ],
        "categories": [
            {"value": "research", "label": "Research", "order": 1}
        ]
    });
    fs::write(&path, fixture.to_string()).unwrap();
    path
}

#[test]
fn test_help_lists_subcommands() {
    atrium()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("check-config"));
}

#[test]
fn test_check_config_prints_defaults() {
    atrium()
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_path = \"/api/public\""))
        .stdout(predicate::str::contains("max_requests = 60"));
}

#[test]
fn test_check_config_applies_environment_overrides() {
    atrium()
        .env("ATRIUM__SERVER__BASE_PATH", "/catalog")
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_path = \"/catalog\""));
}

#[test]
fn test_check_config_redacts_admin_token() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("atrium.toml");
    fs::write(&path, "[admin]\ntoken = \"hunter2\"\n").unwrap();

    atrium()
        .arg("--config")
        .arg(&path)
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("<redacted>"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_check_config_rejects_invalid_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("atrium.toml");
    fs::write(&path, "[visibility]\nmax_limit = 0\n").unwrap();

    atrium()
        .arg("--config")
        .arg(&path)
        .arg("check-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_limit"));
}

#[test]
fn test_import_into_database() {
    let dir = TempDir::new().unwrap();
    let fixture = write_fixture(&dir);
    let database = dir.path().join("catalog.db");

    for _ in 0..2 {
        atrium()
            .arg("import")
            .arg(&fixture)
            .arg("--database")
            .arg(&database)
            .assert()
            .success()
            .stdout(predicate::str::contains("Imported 2 agents, 1 grants, 1 categories"));
    }
    assert!(database.exists());
}

#[test]
fn test_import_requires_database() {
    let dir = TempDir::new().unwrap();
    let fixture = write_fixture(&dir);

    atrium()
        .arg("import")
        .arg(&fixture)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no database configured"));
}

#[test]
fn test_import_reports_unreadable_fixture() {
    let dir = TempDir::new().unwrap();

    atrium()
        .arg("import")
        .arg(dir.path().join("missing.json"))
        .arg("--database")
        .arg(dir.path().join("catalog.db"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read fixture"));
}
