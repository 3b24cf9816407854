//! CLI Integration Tests
//!
//! Tests the `mixer` binary directly using assert_cmd to exercise main.rs code paths.

#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

mod common;

use assert_cmd::Command;
use common::{heuristic_workbook, standard_workbook};
use predicates::prelude::*;
use tempfile::TempDir;

fn mixer() -> Command {
    let mut cmd = Command::cargo_bin("mixer").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    mixer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mixer"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_cli_version() {
    mixer()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mixer"));
}

#[test]
fn test_plan_help() {
    mixer()
        .args(["plan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DISCHARGES"));
}

// ═══════════════════════════════════════════════════════════════════════════
// NORMALIZE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_normalize_values() {
    mixer()
        .args(["normalize", "Mixer 2", "IV", "", "dos"])
        .assert()
        .success()
        .stdout(predicate::str::contains("→ 2"))
        .stdout(predicate::str::contains("→ 4"))
        .stdout(predicate::str::contains("→ Sin Mixer"));
}

#[test]
fn test_normalize_requires_values() {
    mixer().arg("normalize").assert().failure();
}

// ═══════════════════════════════════════════════════════════════════════════
// EXTRACT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_extract_lists_tables_and_rows() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");

    mixer()
        .arg("extract")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Formula"))
        .stdout(predicate::str::contains("table definition"))
        .stdout(predicate::str::contains("C3"))
        .stdout(predicate::str::contains("no Orden table found"));
}

#[test]
fn test_extract_json() {
    let dir = TempDir::new().unwrap();
    let path = heuristic_workbook().write(dir.path(), "raciones.xlsx");

    let output = mixer()
        .arg("extract")
        .arg(&path)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["tables"][1]["target"], "Comida");
    assert_eq!(json["tables"][1]["strategy"], "sheet_heuristic");
    assert_eq!(json["rations"]["rows"][0]["corral"], "C1");
    assert_eq!(json["rations"]["rows"][0]["mixer"], "3");
}

#[test]
fn test_extract_missing_file() {
    mixer()
        .args(["extract", "/nonexistent/raciones.xlsx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

// ═══════════════════════════════════════════════════════════════════════════
// PLAN
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_plan_prints_routes() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");

    mixer()
        .arg("plan")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Mixer 1"))
        .stdout(predicate::str::contains("350 kg"))
        .stdout(predicate::str::contains("Maiz"))
        .stdout(predicate::str::contains("Mixer 2"));
}

#[test]
fn test_plan_single_mixer_json() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");

    let output = mixer()
        .arg("plan")
        .arg(&path)
        .args(["--mixer", "1", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let route: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(route["mixer"], 1);
    assert_eq!(route["total_kg"], 350.0);
    assert_eq!(route["discharges"][1]["remaining_kg"], 0.0);
}

#[test]
fn test_plan_with_order_file() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");
    let order = dir.path().join("orden.yaml");
    std::fs::write(&order, "1: [C2, C1]\n").unwrap();

    let output = mixer()
        .arg("plan")
        .arg(&path)
        .arg("--order")
        .arg(&order)
        .args(["--mixer", "1", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let route: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(route["discharges"][0]["corral"], "C2");
}

#[test]
fn test_plan_unknown_mixer_fails() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");

    mixer()
        .arg("plan")
        .arg(&path)
        .args(["--mixer", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Mixer 9 has no pens assigned"));
}

#[test]
fn test_plan_rejects_bad_config() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");
    let config = dir.path().join("planner.yaml");
    std::fs::write(&config, "header_rows: 3\n").unwrap();

    mixer()
        .arg("plan")
        .arg(&path)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field"));
}

// ═══════════════════════════════════════════════════════════════════════════
// MIXER-SERVER BINARY
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_server_help() {
    Command::cargo_bin("mixer-server")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("/api/v1/plan"))
        .stdout(predicate::str::contains("MIXER_PORT"));
}

#[test]
fn test_server_rejects_missing_config() {
    Command::cargo_bin("mixer-server")
        .unwrap()
        .args(["--config", "/nonexistent/planner.yaml", "--port", "0"])
        .assert()
        .failure();
}
