//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use tempfile::TempDir;

/// Helper to get a calcert command isolated from the user's environment
pub fn calcert() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("calcert"));
    cmd.env("CALCERT_AUTHOR", "Test Technician")
        .env_remove("CALCERT_LOG")
        .env_remove("CALCERT_PROJECT");
    cmd
}

/// calcert command running inside `tmp`, with user config redirected there
pub fn calcert_in(tmp: &TempDir) -> Command {
    let mut cmd = calcert();
    cmd.current_dir(tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".xdg"))
        .env("HOME", tmp.path());
    cmd
}

/// Helper to create a test project in a temp directory
pub fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    calcert_in(&tmp).arg("init").assert().success();
    tmp
}

/// Run a creating command with `--format short-id` and return the short id
fn create(tmp: &TempDir, args: &[&str]) -> String {
    let output = calcert_in(tmp)
        .args(["--format", "short-id"])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Helper to create a test customer
pub fn create_test_customer(tmp: &TempDir, name: &str) -> String {
    create(tmp, &["cust", "new", "--name", name])
}

/// Helper to create a test instrument with resolution 0.1 ppm
pub fn create_test_equipment(tmp: &TempDir, serial: &str, gas: &str) -> String {
    create(
        tmp,
        &[
            "eqp",
            "new",
            "--model",
            "GasAlert Max",
            "--serial",
            serial,
            "--gas",
            gas,
            "--resolution",
            "0.1",
            "--range-max",
            "500",
        ],
    )
}

/// Helper to create a 100 ppm reference with 0.5 % certified uncertainty
pub fn create_test_tool(tmp: &TempDir, gas: &str) -> String {
    create(
        tmp,
        &[
            "tool",
            "new",
            "--name",
            "Reference 100 ppm",
            "--gas",
            gas,
            "--concentration",
            "100",
            "--uncertainty-percent",
            "0.5",
            "--lot",
            "LOT-42",
        ],
    )
}

/// Helper to create a certificate; `after` adds as-left readings
pub fn create_test_certificate(
    tmp: &TempDir,
    equipment: &str,
    tool: &str,
    readings: [&str; 3],
    after: Option<[&str; 3]>,
) -> String {
    let mut args = vec![
        "cert",
        "new",
        "--equipment",
        equipment,
        "--tool",
        tool,
        "--date",
        "2024-05-14",
        "--readings",
    ];
    args.extend(readings);
    if let Some(after) = &after {
        args.push("--after");
        args.extend(after.iter().copied());
    }
    create(tmp, &args)
}
