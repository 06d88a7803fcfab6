//! End-to-end tests for the receval binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn receval() -> Command {
    Command::cargo_bin("receval").unwrap()
}

fn write_sample(dir: &Path, stem: &str, prediction: &str, truth: &str) {
    fs::write(dir.join("predictions").join(format!("{stem}.txt")), prediction).unwrap();
    fs::write(dir.join("ground_truth").join(format!("{stem}.json")), truth).unwrap();
}

fn setup_dirs(dir: &Path) {
    fs::create_dir(dir.join("predictions")).unwrap();
    fs::create_dir(dir.join("ground_truth")).unwrap();
}

#[test]
fn evaluate_writes_json_and_csv_reports() {
    let tmp = TempDir::new().unwrap();
    setup_dirs(tmp.path());

    write_sample(
        tmp.path(),
        "receipt_001",
        "Here is the result:\n```json\n{\"date_value\": \"16/3/2023\", \"store_name_value\": \"Woolworths\", \"total_value\": \"$42.08\"}\n```",
        r#"{"date_value": "2023-03-16", "store_name_value": "WOOLWORTHS", "total_value": "42.08"}"#,
    );
    write_sample(
        tmp.path(),
        "receipt_002",
        "I could not read the image, sorry.",
        r#"{"date_value": "2023-04-01", "store_name_value": "ALDI", "total_value": "10.00"}"#,
    );

    let report_json = tmp.path().join("report.json");
    let report_csv = tmp.path().join("report.csv");

    receval()
        .current_dir(tmp.path())
        .args(["evaluate", "-p", "predictions", "-g", "ground_truth"])
        .args(["--report-json", report_json.to_str().unwrap()])
        .args(["--report-csv", report_csv.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Evaluated 2 samples"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_json).unwrap()).unwrap();
    assert_eq!(report["summary"]["samples"], 2);
    assert_eq!(report["summary"]["parse_failures"], 1);

    let samples = report["samples"].as_array().unwrap();
    assert_eq!(samples[0]["sample_id"], "receipt_001");
    assert_eq!(samples[0]["status"], "parsed");
    assert_eq!(samples[0]["record"]["date_value"], "2023-03-16");
    assert_eq!(samples[1]["status"], "parse_failed");

    // One CSV row per sample and schema field, plus the header.
    let csv = fs::read_to_string(&report_csv).unwrap();
    assert_eq!(csv.lines().count(), 1 + 2 * 7);
    assert!(csv.lines().next().unwrap().contains("sample_id"));
}

#[test]
fn evaluate_fails_on_missing_ground_truth() {
    let tmp = TempDir::new().unwrap();
    setup_dirs(tmp.path());

    fs::write(
        tmp.path().join("predictions").join("orphan.txt"),
        "{\"total_value\": \"5.00\"}",
    )
    .unwrap();

    receval()
        .current_dir(tmp.path())
        .args(["evaluate", "-p", "predictions", "-g", "ground_truth"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing ground truth"))
        .stderr(predicate::str::contains("orphan"));
}

#[test]
fn evaluate_fails_on_empty_prediction_dir() {
    let tmp = TempDir::new().unwrap();
    setup_dirs(tmp.path());

    receval()
        .current_dir(tmp.path())
        .args(["evaluate", "-p", "predictions", "-g", "ground_truth"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No prediction files"));
}

#[test]
fn extract_normalizes_a_single_file() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("output.txt");
    fs::write(
        &input,
        "```json\n{'date_value': '16/3/2023', 'total_value': '1,234.50',}\n```",
    )
    .unwrap();

    receval()
        .args(["extract", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"date_value\": \"2023-03-16\""))
        .stdout(predicate::str::contains("\"total_value\": \"1234.50\""));
}

#[test]
fn extract_validate_flags_inconsistent_tax() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("output.txt");
    fs::write(
        &input,
        r#"{"tax_value": "5.00", "total_value": "19.50"}"#,
    )
    .unwrap();

    receval()
        .args(["extract", "--validate", input.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("gst_consistency"));
}

#[test]
fn schema_prints_builtin_fields() {
    receval()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("date_value"))
        .stdout(predicate::str::contains("prod_price_value"));
}
