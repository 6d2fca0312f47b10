use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use gridsens_algo::test_utils::{six_bus_network, HVDC_1, HVDC_2, MONITORED, PST};
use gridsens_io::save_network;

fn write_study(dir: &Path) {
    save_network(&six_bus_network(), &dir.join("6_bus_system.json")).unwrap();
    fs::write(
        dir.join("monitored_branches.csv"),
        format!("branch_id\n{}\n{}\n", MONITORED[0], MONITORED[1]),
    )
    .unwrap();
    fs::write(
        dir.join("contingencies.csv"),
        format!("element_id,element_type\nZEUSL61ULYSS_ACLS,ac_line\n{HVDC_2},hvdc_line\n{PST},transformer\n"),
    )
    .unwrap();
    fs::write(
        dir.join("active_hvdc_lines.csv"),
        format!("hvdc_line_id\n{HVDC_1}\n{HVDC_2}\n"),
    )
    .unwrap();
    fs::write(dir.join("active_psts.csv"), format!("pst_id\n{PST}\n")).unwrap();
}

fn written_reports(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("6_bus_system_"))
        .collect();
    names.sort();
    names
}

#[test]
fn gridsens_sensitivities_ac_emulation() {
    let dir = tempdir().unwrap();
    write_study(dir.path());
    let network = dir.path().join("6_bus_system.json");

    let mut cmd = Command::cargo_bin("gridsens").unwrap();
    cmd.args(["--log-level", "warn", "sensitivities", network.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("File written at"))
        .stdout(predicate::str::contains("\"country1\":\"FR\""));

    let reports = written_reports(dir.path());
    assert_eq!(reports.len(), 1);
    assert!(reports[0].ends_with("ac_emulation.json"));

    let text = fs::read_to_string(dir.path().join(&reports[0])).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(json["sensitivities"]["hvdc"][HVDC_1].is_object());
    assert!(json["sensitivities"]["branch"][MONITORED[0]][PST].is_object());
}

#[test]
fn gridsens_sensitivities_forced_setpoint_to_output_dir() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_study(dir.path());
    let network = dir.path().join("6_bus_system.json");

    let mut cmd = Command::cargo_bin("gridsens").unwrap();
    cmd.args([
        "sensitivities",
        network.to_str().unwrap(),
        "--force-setpoint",
        "--hvdc-target",
        "250",
        "--distributed-slack",
        "--solver",
        "faer",
        "--output-dir",
        out.path().to_str().unwrap(),
    ])
    .assert()
    .success();

    assert!(written_reports(dir.path()).is_empty());
    let reports = written_reports(out.path());
    assert_eq!(reports.len(), 1);
    assert!(reports[0].ends_with("setpoint.json"));
}

#[test]
fn gridsens_rejects_unknown_solver() {
    let dir = tempdir().unwrap();
    write_study(dir.path());
    let network = dir.path().join("6_bus_system.json");

    let mut cmd = Command::cargo_bin("gridsens").unwrap();
    cmd.args(["sensitivities", network.to_str().unwrap(), "--solver", "cholesky"])
        .assert()
        .failure();
    assert!(written_reports(dir.path()).is_empty());
}

#[test]
fn gridsens_fails_without_monitored_branches_file() {
    let dir = tempdir().unwrap();
    write_study(dir.path());
    fs::remove_file(dir.path().join("monitored_branches.csv")).unwrap();
    let network = dir.path().join("6_bus_system.json");

    let mut cmd = Command::cargo_bin("gridsens").unwrap();
    cmd.args(["sensitivities", network.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("monitored_branches.csv"));
}
