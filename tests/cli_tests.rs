//! Integration tests for the `simal` binary: write a `.simal` file to a
//! temp directory, run the built binary against it, and check the JSON
//! files it writes next to the input.

use std::fs;
use std::process::Command;
use tempfile::tempdir;

const SOURCE: &str = "system { type: microservices  service orders { \
    endpoints: [ GET /orders/{id} -> JSON{total: float} ] \
} }";

#[test]
fn default_invocation_writes_both_full_and_simple_json() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("orders.simal");
    fs::write(&input, SOURCE).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_simal"))
        .arg(&input)
        .status()
        .unwrap();
    assert!(status.success());

    let full = fs::read_to_string(dir.path().join("orders.json")).unwrap();
    let simple = fs::read_to_string(dir.path().join("orders_simple.json")).unwrap();

    let full_json: serde_json::Value = serde_json::from_str(&full).unwrap();
    assert_eq!(full_json["__type__"], "System");

    let simple_json: serde_json::Value = serde_json::from_str(&simple).unwrap();
    assert_eq!(simple_json["type"], "microservices");
}

#[test]
fn max_simple_flag_writes_only_the_compressed_simple_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("orders.simal");
    fs::write(&input, SOURCE).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_simal"))
        .arg(&input)
        .arg("--max-simple")
        .status()
        .unwrap();
    assert!(status.success());

    assert!(!dir.path().join("orders.json").exists());
    let simple = fs::read_to_string(dir.path().join("orders_simple.json")).unwrap();
    let simple_json: serde_json::Value = serde_json::from_str(&simple).unwrap();
    let endpoint = &simple_json["services"][0]["endpoints"][0];
    assert_eq!(endpoint["def"], "GET /orders/{id} -> JSON{total: float}");
}

#[test]
fn conflicting_flags_fail_with_nonzero_exit() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("orders.simal");
    fs::write(&input, SOURCE).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_simal"))
        .arg(&input)
        .arg("--json")
        .arg("--simple")
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn malformed_source_fails_with_nonzero_exit_and_writes_nothing() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bad.simal");
    fs::write(&input, "not-a-system { }").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_simal"))
        .arg(&input)
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(!dir.path().join("bad.json").exists());
}
