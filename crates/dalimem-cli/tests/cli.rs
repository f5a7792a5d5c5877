use std::fs;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("dalimem"))
}

fn repo_root() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root")
        .to_path_buf()
}

fn fixture(name: &str) -> std::path::PathBuf {
    repo_root().join("tests").join("fixtures").join(name)
}

fn copy_fixture(temp: &TempDir, name: &str) -> std::path::PathBuf {
    let target = temp.path().join(name);
    fs::copy(fixture(name), &target).expect("copy fixture");
    target
}

fn read_stdout(args: &[&str], input: &std::path::Path) -> Value {
    let assert = cmd()
        .arg("image")
        .arg("read")
        .arg(input)
        .args(args)
        .arg("--stdout")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    serde_json::from_str(&stdout).expect("valid json")
}

fn outcome_of<'a>(report: &'a Value, name: &str) -> &'a Value {
    let entry = report["values"]
        .as_array()
        .expect("values array")
        .iter()
        .find(|v| v["name"] == name)
        .unwrap_or_else(|| panic!("value {name} missing"));
    &entry["outcome"]
}

#[test]
fn help_lists_image_commands() {
    cmd()
        .arg("image")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("read").and(contains("write")));
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.json");
    let report = temp.path().join("report.json");

    cmd()
        .arg("image")
        .arg("read")
        .arg(missing)
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn non_json_input_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("device.bin");
    fs::write(&input, b"{}").expect("write input");

    cmd()
        .arg("image")
        .arg("read")
        .arg(input)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("unsupported input format"));
}

#[test]
fn stdout_report_decodes_current_bank_zero() {
    let report = read_stdout(&[], &fixture("device_2014.json"));
    assert_eq!(report["report_version"], 1);
    assert_eq!(report["revision"], "2014");
    assert_eq!(report["tool"]["name"], "dalimem");
    assert_ne!(report["generated_at"], "1970-01-01T00:00:00Z");

    assert_eq!(outcome_of(&report, "GTIN"), "78187493530");
    assert_eq!(outcome_of(&report, "FirmwareVersion"), "2.1");
    assert_eq!(outcome_of(&report, "IdentificationNumber"), "12345");
    assert_eq!(outcome_of(&report, "HardwareVersion"), "1.0");
    assert_eq!(outcome_of(&report, "Part102Version"), "2.0");
    assert_eq!(outcome_of(&report, "Part103Version"), "not implemented");
    assert_eq!(outcome_of(&report, "GearUnitCount"), "1");
    assert_eq!(outcome_of(&report, "RatedMedianUsefulLifeOfLuminaire"), "0.05 h");
    assert_eq!(
        outcome_of(&report, "InternalControlGearReferenceTemperature"),
        "25 °C"
    );
    assert_eq!(
        outcome_of(&report, "RatedMedianUsefulLightSourceStarts"),
        "1 starts"
    );
}

#[test]
fn version_number_one_selects_legacy_layout() {
    let report = read_stdout(&["--device", "1"], &fixture("device_2009.json"));
    assert_eq!(report["revision"], "2009");
    let names: Vec<_> = report["values"]
        .as_array()
        .expect("values array")
        .iter()
        .map(|v| v["name"].as_str().expect("name").to_string())
        .collect();
    assert!(!names.contains(&"HardwareVersion".to_string()));
    assert_eq!(outcome_of(&report, "IdentificationNumber"), "256");
    assert_eq!(outcome_of(&report, "FirmwareVersion"), "1.2");
    assert_eq!(
        outcome_of(&report, "InternalControlGearReferenceTemperature"),
        "TMASK"
    );
    assert_eq!(
        outcome_of(&report, "RatedMedianUsefulLightSourceStarts"),
        "MASK"
    );
}

#[test]
fn unknown_device_fails() {
    cmd()
        .arg("image")
        .arg("read")
        .arg(fixture("device_2014.json"))
        .arg("--device")
        .arg("9")
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("device 9").and(contains("hint:")));
}

#[test]
fn stdout_and_report_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("image")
        .arg("read")
        .arg(fixture("device_2014.json"))
        .arg("--stdout")
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn pretty_and_compact_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("image")
        .arg("read")
        .arg(fixture("device_2014.json"))
        .arg("-o")
        .arg(report)
        .arg("--pretty")
        .arg("--compact")
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn report_must_differ_from_input() {
    let temp = TempDir::new().expect("tempdir");
    let input = copy_fixture(&temp, "device_2014.json");

    cmd()
        .arg("image")
        .arg("read")
        .arg(&input)
        .arg("-o")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("must differ from input"));
}

#[test]
fn quiet_suppresses_ok_message() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("out").join("report.json");

    cmd()
        .arg("image")
        .arg("read")
        .arg(fixture("device_2014.json"))
        .arg("-o")
        .arg(&report)
        .arg("--quiet")
        .assert()
        .success()
        .stderr(contains("OK:").not());
    assert!(report.is_file());
}

#[test]
fn glob_input_resolves_single_match() {
    let temp = TempDir::new().expect("tempdir");
    copy_fixture(&temp, "device_2014.json");
    let pattern = temp.path().join("device_*.json");
    let report = read_stdout(&[], &pattern);
    assert_eq!(report["device"], 0);
}

#[test]
fn glob_input_rejects_multiple_matches() {
    let temp = TempDir::new().expect("tempdir");
    copy_fixture(&temp, "device_2014.json");
    copy_fixture(&temp, "device_2009.json");
    let pattern = temp.path().join("device_*.json");

    cmd()
        .arg("image")
        .arg("read")
        .arg(pattern)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("multiple files match").and(contains("hint:")));
}

#[test]
fn write_updates_image_in_place() {
    let temp = TempDir::new().expect("tempdir");
    let input = copy_fixture(&temp, "device_2014.json");

    cmd()
        .arg("image")
        .arg("write")
        .arg(&input)
        .arg("--device")
        .arg("0")
        .arg("--value")
        .arg("RatedMedianUsefulLifeOfLuminaire")
        .arg("--set")
        .arg("0.1 h")
        .assert()
        .success()
        .stderr(contains("OK: RatedMedianUsefulLifeOfLuminaire = 0.1 h"));

    let report = read_stdout(&[], &input);
    assert_eq!(outcome_of(&report, "RatedMedianUsefulLifeOfLuminaire"), "0.1 h");
    assert_eq!(outcome_of(&report, "GTIN"), "78187493530");
}

#[test]
fn write_mask_to_separate_output() {
    let temp = TempDir::new().expect("tempdir");
    let input = copy_fixture(&temp, "device_2014.json");
    let output = temp.path().join("masked.json");

    cmd()
        .arg("image")
        .arg("write")
        .arg(&input)
        .arg("--device")
        .arg("0")
        .arg("--value")
        .arg("InternalControlGearReferenceTemperature")
        .arg("--mask")
        .arg("-o")
        .arg(&output)
        .arg("--quiet")
        .assert()
        .success();

    let masked = read_stdout(&[], &output);
    assert_eq!(
        outcome_of(&masked, "InternalControlGearReferenceTemperature"),
        "MASK"
    );
    let original = read_stdout(&[], &input);
    assert_eq!(
        outcome_of(&original, "InternalControlGearReferenceTemperature"),
        "25 °C"
    );
}

#[test]
fn write_rejects_read_only_value() {
    let temp = TempDir::new().expect("tempdir");
    let input = copy_fixture(&temp, "device_2009.json");
    let before = fs::read_to_string(&input).expect("read input");

    cmd()
        .arg("image")
        .arg("write")
        .arg(&input)
        .arg("--device")
        .arg("1")
        .arg("--value")
        .arg("GTIN")
        .arg("--set")
        .arg("7")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("not writable").and(contains("hint:")));
    assert_eq!(fs::read_to_string(&input).expect("read input"), before);
}

#[test]
fn write_rejects_out_of_range_value() {
    let temp = TempDir::new().expect("tempdir");
    let input = copy_fixture(&temp, "device_2014.json");

    cmd()
        .arg("image")
        .arg("write")
        .arg(&input)
        .arg("--device")
        .arg("0")
        .arg("--value")
        .arg("InternalControlGearReferenceTemperature")
        .arg("--set")
        .arg("200")
        .assert()
        .failure()
        .stderr(contains("out of range"));
}

#[test]
fn write_unknown_value_lists_catalog() {
    let temp = TempDir::new().expect("tempdir");
    let input = copy_fixture(&temp, "device_2014.json");

    cmd()
        .arg("image")
        .arg("write")
        .arg(&input)
        .arg("--device")
        .arg("0")
        .arg("--value")
        .arg("Brightness")
        .arg("--set")
        .arg("1")
        .assert()
        .failure()
        .stderr(contains("Brightness").and(contains("known values: GTIN")));
}

#[test]
fn write_requires_exactly_one_new_value() {
    cmd()
        .arg("image")
        .arg("write")
        .arg(fixture("device_2014.json"))
        .arg("--device")
        .arg("0")
        .arg("--value")
        .arg("GTIN")
        .arg("--mask")
        .arg("--tmask")
        .assert()
        .failure();
}

#[test]
fn repair_restores_corrupt_checksum() {
    let temp = TempDir::new().expect("tempdir");
    let input = copy_fixture(&temp, "device_2009.json");
    let mut image: Value =
        serde_json::from_str(&fs::read_to_string(&input).expect("read input")).expect("json");
    image["devices"][0]["banks"][0]["bytes"][1] = Value::from(0);
    fs::write(&input, image.to_string()).expect("write input");

    let corrupt = read_stdout(&["--device", "1"], &input);
    assert!(outcome_of(&corrupt, "IdentificationNumber").is_null());

    cmd()
        .arg("image")
        .arg("repair")
        .arg(&input)
        .arg("--device")
        .arg("1")
        .assert()
        .success()
        .stderr(contains("OK: bank 0 checksum = 0xc4"));

    let repaired = read_stdout(&["--device", "1"], &input);
    assert_eq!(outcome_of(&repaired, "IdentificationNumber"), "256");
}

#[test]
fn repair_rejects_bank_without_checksum() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("repaired.json");

    cmd()
        .arg("image")
        .arg("repair")
        .arg(fixture("device_2014.json"))
        .arg("--device")
        .arg("0")
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("no checksum").and(contains("hint:")));
    assert!(!output.exists());
}
