//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

/// Build command for the circuitlens-cli binary (finds it in target/debug when run via cargo test).
fn circuitlens_cli() -> Command {
    cargo_bin_cmd!("circuitlens-cli")
}

/// Path to circuitlens library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("circuitlens")
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_cli_help() {
    let mut cmd = circuitlens_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("SPICE"));
}

#[test]
fn test_cli_version() {
    let mut cmd = circuitlens_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_run_bundle() {
    let mut cmd = circuitlens_cli();
    let path = fixtures_dir().join("rc_detections.json");

    cmd.arg("run").arg(path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("V1 N1 N2 DC 5"))
        .stdout(predicate::str::contains("C1 N2 N3 1u"))
        .stdout(predicate::str::contains("Netlist valid"));
}

#[test]
fn test_cli_run_json_output() {
    let mut cmd = circuitlens_cli();
    let path = fixtures_dir().join("rc_detections.json");

    cmd.arg("run").arg(path).arg("--format").arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["validation"]["valid"], true);
    assert_eq!(json["topology_inferred"], false);
    assert_eq!(json["fused"].as_array().unwrap().len(), 3);
}

#[test]
fn test_cli_fail_on_warning() {
    let mut cmd = circuitlens_cli();
    let path = fixtures_dir().join("rc_detections.json");

    cmd.arg("run").arg(path).arg("--fail-on").arg("warning");

    cmd.assert().failure().code(1);
}

#[test]
fn test_cli_compile_description() {
    let mut cmd = circuitlens_cli();
    let path = fixtures_dir().join("divider_description.json");

    cmd.arg("compile")
        .arg(path)
        .arg("--analysis")
        .arg("dc:V1,0,5,0.1")
        .arg("--fail-on")
        .arg("warning");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(".title Voltage divider"))
        .stdout(predicate::str::contains("Pattern:    voltage_divider"))
        .stdout(predicate::str::contains("R2 N2 0 10k"))
        .stdout(predicate::str::contains(".dc V1 0 5 0.1"));
}

#[test]
fn test_cli_compile_fail_on_error() {
    let mut cmd = circuitlens_cli();
    let path = fixtures_dir().join("mixed_description.json");

    cmd.arg("compile").arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("arity-mismatch"));

    let mut cmd = circuitlens_cli();
    cmd.arg("compile").arg(&path).arg("--fail-on").arg("error");
    cmd.assert().failure();
}

#[test]
fn test_cli_rejects_bad_analysis() {
    let mut cmd = circuitlens_cli();
    let path = fixtures_dir().join("divider_description.json");

    cmd.arg("compile").arg(path).arg("--analysis").arg("ac:0,1,1k");

    cmd.assert().failure();
}

#[test]
fn test_cli_writes_and_validates_netlist() {
    let dir = tempfile::tempdir().unwrap();
    let netlist = dir.path().join("divider.cir");

    let mut cmd = circuitlens_cli();
    cmd.arg("compile")
        .arg(fixtures_dir().join("divider_description.json"))
        .arg("--output")
        .arg(&netlist);
    cmd.assert().success();

    let mut cmd = circuitlens_cli();
    cmd.arg("validate").arg(&netlist);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Netlist valid"));
}

#[test]
fn test_cli_validate_invalid_netlist() {
    let dir = tempfile::tempdir().unwrap();
    let netlist = dir.path().join("broken.cir");
    std::fs::write(&netlist, "R1 A 0 1k\n").unwrap();

    let mut cmd = circuitlens_cli();
    cmd.arg("validate").arg(&netlist).arg("--format").arg("json");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("missing .title directive"))
        .stdout(predicate::str::contains("missing .end directive"));
}

#[test]
fn test_cli_missing_file() {
    let mut cmd = circuitlens_cli();

    cmd.arg("run").arg("nonexistent.json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to read detection bundle"));
}

#[test]
fn test_cli_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{"iou_threshold": 2.0}"#).unwrap();

    let mut cmd = circuitlens_cli();
    cmd.arg("--config")
        .arg(&config)
        .arg("run")
        .arg(fixtures_dir().join("rc_detections.json"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("iou_threshold"));
}

#[test]
fn test_cli_types() {
    let mut cmd = circuitlens_cli();

    cmd.arg("types").arg("--labels");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("voltage_source"))
        .stdout(predicate::str::contains("battery"));
}

#[test]
fn test_cli_types_with_config_aliases() {
    let mut cmd = circuitlens_cli();

    cmd.arg("types")
        .arg("--config")
        .arg(fixtures_dir().join("pipeline_config.json"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Res-SMD -> resistor"));
}
