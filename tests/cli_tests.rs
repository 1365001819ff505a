//! Command-line tests for the tfinspect binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// The binary, isolated from any configuration file around the test run.
fn tfinspect(work_dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tfinspect").unwrap();
    cmd.current_dir(work_dir.path())
        .env_remove("TFINSPECT_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_markdown_is_the_default() {
    let work = tempfile::tempdir().unwrap();
    tfinspect(&work)
        .arg(fixtures_path().join("basic"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("\n## Inputs\n"))
        .stdout(predicate::str::contains("| `region` |"))
        .stdout(predicate::str::contains("## Outputs"));
}

#[test]
fn test_json_output() {
    let work = tempfile::tempdir().unwrap();
    let output = tfinspect(&work)
        .arg("--json")
        .arg(fixtures_path().join("basic"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["variables"]["region"]["default"], "eu-west-1");
    assert_eq!(value["module_calls"]["vpc"]["version"], "~> 5.0");
    assert_eq!(value["diagnostics"], serde_json::json!([]));
}

#[test]
fn test_errors_exit_one_with_output() {
    let work = tempfile::tempdir().unwrap();
    tfinspect(&work)
        .arg(fixtures_path().join("broken"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("| `first` |"))
        .stdout(predicate::str::contains("| `second` |"))
        .stdout(predicate::str::contains("Problems"))
        .stdout(predicate::str::contains("(at `main.tf` line 3)"));
}

#[test]
fn test_missing_directory() {
    let work = tempfile::tempdir().unwrap();
    tfinspect(&work)
        .args(["--json", "does-not-exist"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does-not-exist"))
        .stdout(predicate::str::contains("\"variables\": {}"));
}

#[test]
fn test_defaults_to_current_directory() {
    let work = tempfile::tempdir().unwrap();
    std::fs::write(work.path().join("main.tf"), "variable \"here\" {}\n").unwrap();
    tfinspect(&work)
        .assert()
        .success()
        .stdout(predicate::str::contains("| `here` |  |  | `` | yes |"));
}

#[test]
fn test_text_format() {
    let work = tempfile::tempdir().unwrap();
    tfinspect(&work)
        .args(["--format", "text", "--no-color"])
        .arg(fixtures_path().join("basic"))
        .assert()
        .success()
        .stdout(predicate::str::contains("aws_instance.web"))
        .stdout(predicate::str::contains("PASSED - No issues found"));
}

#[test]
fn test_output_file() {
    let work = tempfile::tempdir().unwrap();
    let report = work.path().join("report.md");
    tfinspect(&work)
        .arg(fixtures_path().join("basic"))
        .arg("--output")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(report).unwrap();
    assert!(content.contains("* `aws_instance.web`"));
}

#[test]
fn test_config_file_sets_format() {
    let work = tempfile::tempdir().unwrap();
    std::fs::write(work.path().join(".tfinspect.yaml"), "output:\n  format: json\n").unwrap();
    tfinspect(&work)
        .arg(fixtures_path().join("basic"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"));
}

#[test]
fn test_version() {
    let work = tempfile::tempdir().unwrap();
    tfinspect(&work)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
