//! Certificate workflow tests: creation, budgets, recalculation and rendering

mod common;

use common::{
    calcert_in, create_test_certificate, create_test_customer, create_test_equipment,
    create_test_tool, setup_test_project,
};
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Project with one CO instrument (EQP@1) and one CO reference (TOOL@1)
fn setup_cal_project() -> TempDir {
    let tmp = setup_test_project();
    create_test_equipment(&tmp, "SN-1", "CO");
    create_test_tool(&tmp, "CO");
    tmp
}

fn certificate_files(tmp: &TempDir) -> Vec<PathBuf> {
    fs::read_dir(tmp.path().join("certificates"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

/// Path of the certificate record carrying the given number
fn certificate_file(tmp: &TempDir, number: &str) -> PathBuf {
    certificate_files(tmp)
        .into_iter()
        .find(|p| fs::read_to_string(p).unwrap().contains(number))
        .unwrap()
}

/// Replace text inside the only certificate record
fn edit_certificate(tmp: &TempDir, from: &str, to: &str) {
    let path = certificate_files(tmp).remove(0);
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains(from));
    fs::write(&path, content.replace(from, to)).unwrap();
}

// ============================================================================
// cert new
// ============================================================================

#[test]
fn test_cert_new_embeds_budget() {
    let tmp = setup_cal_project();
    let short = create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100.1", "100.2", "100.3"], None);
    assert_eq!(short, "CERT@1");

    let files = certificate_files(&tmp);
    assert_eq!(files.len(), 1);
    let content = fs::read_to_string(&files[0]).unwrap();
    assert!(content.contains("number: CAL-2024-0001"));
    assert!(content.contains("has_adjustment: false"));
    assert!(content.contains("expanded_uncertainty"));
    assert!(content.contains("uncertainty_standard: 0.5"));
    assert!(!content.contains("after:"));
}

#[test]
fn test_cert_new_pretty_output() {
    let tmp = setup_cal_project();

    calcert_in(&tmp)
        .args([
            "cert",
            "new",
            "--equipment",
            "EQP@1",
            "--tool",
            "TOOL@1",
            "--readings",
            "100.1",
            "100.2",
            "100.3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created certificate CERT@1"))
        .stdout(predicate::str::contains("U = 1.0165"));
}

#[test]
fn test_cert_numbers_increment_per_year() {
    let tmp = setup_cal_project();
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100", "100", "100"], None);
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100", "100", "100"], None);

    calcert_in(&tmp)
        .args(["cert", "show", "CERT@2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CAL-2024-0002"));
}

#[test]
fn test_cert_new_with_adjustment() {
    let tmp = setup_cal_project();
    create_test_certificate(
        &tmp,
        "EQP@1",
        "TOOL@1",
        ["96", "97", "98"],
        Some(["100.1", "100.2", "100.3"]),
    );

    let content = fs::read_to_string(&certificate_files(&tmp)[0]).unwrap();
    assert!(content.contains("has_adjustment: true"));

    calcert_in(&tmp)
        .args(["cert", "show", "CERT@1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Results (before adjustment)"))
        .stdout(predicate::str::contains("Results (after adjustment)"))
        .stdout(predicate::str::contains("Error:    3.0000"))
        .stdout(predicate::str::contains("Error:    -0.2000"));
}

#[test]
fn test_cert_new_requires_three_readings() {
    let tmp = setup_cal_project();

    calcert_in(&tmp)
        .args([
            "cert",
            "new",
            "--equipment",
            "EQP@1",
            "--tool",
            "TOOL@1",
            "--readings",
            "100",
            "101",
        ])
        .assert()
        .failure();
    assert!(certificate_files(&tmp).is_empty());
}

#[test]
fn test_cert_new_rejects_non_finite_reading() {
    let tmp = setup_cal_project();

    calcert_in(&tmp)
        .args([
            "cert",
            "new",
            "--equipment",
            "EQP@1",
            "--tool",
            "TOOL@1",
            "--readings",
            "100",
            "NaN",
            "100",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a finite number"));
    assert!(certificate_files(&tmp).is_empty());
}

#[test]
fn test_cert_new_unknown_tool_fails() {
    let tmp = setup_cal_project();

    calcert_in(&tmp)
        .args([
            "cert",
            "new",
            "--equipment",
            "EQP@1",
            "--tool",
            "TOOL@5",
            "--readings",
            "100",
            "100",
            "100",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no reference standard found"));
}

#[test]
fn test_cert_new_warns_on_gas_mismatch() {
    let tmp = setup_test_project();
    create_test_equipment(&tmp, "SN-1", "CO");
    create_test_tool(&tmp, "H2S");

    calcert_in(&tmp)
        .args([
            "cert",
            "new",
            "--equipment",
            "EQP@1",
            "--tool",
            "TOOL@1",
            "--readings",
            "100",
            "100",
            "100",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("does not match instrument gas"));
}

#[test]
fn test_cert_inherits_customer_from_equipment() {
    let tmp = setup_test_project();
    create_test_customer(&tmp, "Acme Mining");
    calcert_in(&tmp)
        .args([
            "eqp", "new", "--model", "MX4", "--serial", "SN-2", "--gas", "CO", "--resolution",
            "0.1", "--customer", "CUST@1",
        ])
        .assert()
        .success();
    create_test_tool(&tmp, "CO");
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100", "100", "100"], None);

    calcert_in(&tmp)
        .args(["cert", "show", "CERT@1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CUST@1 (Acme Mining)"));
}

// ============================================================================
// cert budget
// ============================================================================

#[test]
fn test_cert_budget_table() {
    let tmp = setup_cal_project();
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100.1", "100.2", "100.3"], None);

    calcert_in(&tmp)
        .args(["cert", "budget", "CERT@1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uncertainty budget (before adjustment)"))
        .stdout(predicate::str::contains("Repeatability"))
        .stdout(predicate::str::contains("0.0707"))
        .stdout(predicate::str::contains("Combined uncertainty (u_c)"))
        .stdout(predicate::str::contains("0.5083"))
        .stdout(predicate::str::contains("Expanded uncertainty (U)"))
        .stdout(predicate::str::contains("1.0165"));
}

#[test]
fn test_cert_budget_csv() {
    let tmp = setup_cal_project();
    create_test_certificate(
        &tmp,
        "EQP@1",
        "TOOL@1",
        ["100.1", "100.2", "100.3"],
        Some(["100", "100", "100"]),
    );

    let output = calcert_in(&tmp)
        .args(["cert", "budget", "CERT@1", "--format", "csv"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(
        lines[0],
        "direction,contributor,type,distribution,value,divisor,c_i,u_i"
    );
    // five contributor rows per direction
    assert_eq!(lines.len(), 11);
    assert!(lines[2].starts_with("before,Resolution,B,rectangular,0.1000,√3,1.0,0.0577"));
    assert!(lines[6].starts_with("after,Repeatability,A,normal,0.0000"));
}

#[test]
fn test_cert_budget_direction_after_requires_adjustment() {
    let tmp = setup_cal_project();
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100", "100", "100"], None);

    calcert_in(&tmp)
        .args(["cert", "budget", "CERT@1", "--direction", "after"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no after-adjustment measurements"));
}

#[test]
fn test_cert_budget_json_has_effective_dof() {
    let tmp = setup_cal_project();
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100", "100", "100"], None);

    let output = calcert_in(&tmp)
        .args(["cert", "budget", "CERT@1", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["direction"], "before");
    assert_eq!(json[0]["effective_dof"]["kind"], "above_limit");
    assert_eq!(json[0]["coverage_factor"], 2.0);
    assert_eq!(json[0]["rows"].as_array().unwrap().len(), 5);
}

// ============================================================================
// cert calc
// ============================================================================

#[test]
fn test_cert_calc_refresh_uses_current_resolution() {
    let tmp = setup_cal_project();
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100", "100", "100"], None);

    // Change the instrument resolution on disk
    let eqp_file = fs::read_dir(tmp.path().join("equipment"))
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let content = fs::read_to_string(&eqp_file).unwrap();
    fs::write(&eqp_file, content.replace("resolution: 0.1", "resolution: 1.0")).unwrap();

    calcert_in(&tmp)
        .args(["cert", "calc", "CERT@1", "--refresh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CAL-2024-0001"));

    let cert = fs::read_to_string(&certificate_files(&tmp)[0]).unwrap();
    assert!(cert.contains("resolution: 1.0"));
}

#[test]
fn test_cert_calc_rejects_tampered_record_without_writing() {
    let tmp = setup_cal_project();
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100", "100", "100"], None);
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100.1", "100.2", "100.3"], None);

    let first = certificate_file(&tmp, "CAL-2024-0001");
    let second = certificate_file(&tmp, "CAL-2024-0002");
    let untouched = fs::read(&first).unwrap();
    let tampered = fs::read_to_string(&second)
        .unwrap()
        .replace("resolution: 0.1", "resolution: -0.1");
    fs::write(&second, &tampered).unwrap();

    calcert_in(&tmp)
        .args(["cert", "calc", "--all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("resolution"));

    // The valid sibling keeps its bytes, calculated_at included
    assert_eq!(fs::read(&first).unwrap(), untouched);
    assert_eq!(fs::read_to_string(&second).unwrap(), tampered);
}

#[test]
fn test_cert_calc_all_requires_target() {
    let tmp = setup_cal_project();

    calcert_in(&tmp).args(["cert", "calc"]).assert().failure();
}

// ============================================================================
// cert issue / render
// ============================================================================

#[test]
fn test_issued_certificate_is_frozen() {
    let tmp = setup_cal_project();
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100", "100", "100"], None);

    calcert_in(&tmp)
        .args(["cert", "issue", "CERT@1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Issued certificate CAL-2024-0001"));

    calcert_in(&tmp)
        .args(["cert", "calc", "CERT@1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("issued"));

    calcert_in(&tmp)
        .args(["cert", "list", "--status", "issued", "--count"])
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn test_edited_certificate_cannot_be_issued_or_rendered() {
    let tmp = setup_cal_project();
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100", "100", "100"], None);
    edit_certificate(&tmp, "resolution: 0.1", "resolution: -0.1");

    calcert_in(&tmp)
        .args(["cert", "render", "CERT@1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("resolution"));

    calcert_in(&tmp)
        .args(["cert", "budget", "CERT@1"])
        .assert()
        .failure();

    calcert_in(&tmp)
        .args(["cert", "issue", "CERT@1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be issued"));

    calcert_in(&tmp)
        .args(["cert", "list", "--status", "issued", "--count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_stale_results_block_issue_until_recalculated() {
    let tmp = setup_cal_project();
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100", "100", "100"], None);
    edit_certificate(&tmp, "measurement3: 100.0", "measurement3: 103.0");

    calcert_in(&tmp)
        .args(["cert", "issue", "CERT@1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match"));

    calcert_in(&tmp)
        .args(["cert", "calc", "CERT@1"])
        .assert()
        .success();

    calcert_in(&tmp)
        .args(["cert", "issue", "CERT@1"])
        .assert()
        .success();
}

#[test]
fn test_invalid_lab_constants_are_rejected() {
    let tmp = setup_cal_project();
    fs::write(
        tmp.path().join(".calcert/config.yaml"),
        "constants:\n  gas_temperature_effect: -0.2\n",
    )
    .unwrap();
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100", "100", "100"], None);

    calcert_in(&tmp)
        .args(["cert", "budget", "CERT@1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gas_temperature_effect"));

    calcert_in(&tmp)
        .args(["cert", "render", "CERT@1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gas_temperature_effect"));
}

#[test]
fn test_cert_render_to_file() {
    let tmp = setup_cal_project();
    fs::write(
        tmp.path().join(".calcert/config.yaml"),
        "laboratory:\n  name: Gas Cal Lab\nconstants:\n  gas_temperature_effect: 0.2\n  gas_flow_rate_effect: 0.4\n",
    )
    .unwrap();
    create_test_certificate(
        &tmp,
        "EQP@1",
        "TOOL@1",
        ["96", "97", "98"],
        Some(["100.1", "100.2", "100.3"]),
    );

    let out = tmp.path().join("cert.md");
    calcert_in(&tmp)
        .args(["cert", "render", "CERT@1", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered CAL-2024-0001"));

    let doc = fs::read_to_string(&out).unwrap();
    assert!(doc.contains("# Calibration Certificate CAL-2024-0001"));
    assert!(doc.contains("Gas Cal Lab"));
    assert!(doc.contains("GasAlert Max"));
    assert!(doc.contains("Uncertainty budget (after adjustment)"));
    assert!(doc.contains("| Gas temperature effect | B | rectangular | 0.2000 | √3 | 1.0 | 0.1155 |"));
}

#[test]
fn test_cert_list_shows_expanded_uncertainty() {
    let tmp = setup_cal_project();
    create_test_certificate(&tmp, "EQP@1", "TOOL@1", ["100.1", "100.2", "100.3"], None);

    calcert_in(&tmp)
        .args(["cert", "list", "--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CERT@1\tCAL-2024-0001\t2024-05-14\tEQP@1\tno\t1.0165\tdraft"));
}
