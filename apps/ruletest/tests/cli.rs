use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Create a Command for the ruletest binary.
fn ruletest_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ruletest"))
}

const RULE: &str = "rules:\n  - id: useless-eqeq\n    pattern: $X == $X\n    message: useless\n    languages: [python]\n    severity: ERROR\n";
const FIXTURE: &str = "def f():\n    x = 1\n    # ruleid: useless-eqeq\n    5 == 5\n";

#[cfg(unix)]
/// Write an executable stand-in engine that always prints `stdout`.
fn fake_engine(dir: &Path, stdout: &str) -> std::path::PathBuf {
    fake_engine_exiting(dir, stdout, 0)
}

#[cfg(unix)]
/// Like `fake_engine`, but exits with `code` after printing.
fn fake_engine_exiting(dir: &Path, stdout: &str, code: i32) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(format!("fake-engine-{}.sh", code));
    fs::write(
        &path,
        format!("#!/bin/sh\ncat <<'JSON'\n{}\nJSON\nexit {}\n", stdout, code),
    )
    .unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

#[cfg(unix)]
fn fixture_dir(reported_line: usize, rule_id: &str) -> (tempfile::TempDir, tempfile::TempDir, std::path::PathBuf) {
    let tests = tempdir().unwrap();
    let bin = tempdir().unwrap();
    fs::write(tests.path().join("eqeq.yaml"), RULE).unwrap();
    fs::write(tests.path().join("eqeq.py"), FIXTURE).unwrap();
    let target = fs::canonicalize(tests.path().join("eqeq.py")).unwrap();
    let stdout = serde_json::json!({
        "results": [{"check_id": rule_id, "path": target, "start": {"line": reported_line}}],
        "errors": []
    })
    .to_string();
    let engine = fake_engine(bin.path(), &stdout);
    (tests, bin, engine)
}

#[test]
fn help_works() {
    ruletest_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--strict"));
}

#[test]
fn single_file_target_requires_config() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("eqeq.py");
    fs::write(&target, FIXTURE).unwrap();
    ruletest_cmd()
        .current_dir(dir.path())
        .arg(&target)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--config is required"));
}

#[test]
fn missing_target_is_fatal() {
    let dir = tempdir().unwrap();
    ruletest_cmd()
        .current_dir(dir.path())
        .arg(dir.path().join("nope"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("path does not exist"));
}

#[cfg(unix)]
#[test]
fn passing_rule_json_report() {
    let (tests, _bin, engine) = fixture_dir(4, "useless-eqeq");
    let out = ruletest_cmd()
        .current_dir(tests.path())
        .arg(tests.path())
        .arg("--json")
        .arg("--engine")
        .arg(&engine)
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();
    let v: Value = serde_json::from_slice(&out).unwrap();
    let results = v["results"].as_object().unwrap();
    assert_eq!(results.len(), 1);
    let check = &results.values().next().unwrap()["checks"]["useless-eqeq"];
    assert_eq!(check["passed"], true);
    let m = check["matches"].as_object().unwrap().values().next().unwrap();
    assert_eq!(m["expected_lines"], serde_json::json!([4]));
    assert_eq!(m["reported_lines"], serde_json::json!([4]));
}

#[cfg(unix)]
#[test]
fn failing_rule_exits_one_with_summary() {
    let (tests, _bin, engine) = fixture_dir(5, "useless-eqeq");
    ruletest_cmd()
        .current_dir(tests.path())
        .env("NO_COLOR", "1")
        .arg(tests.path())
        .arg("--no-save-archive")
        .arg("--engine")
        .arg(&engine)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("0/1: 1 unit tests did not pass"))
        .stdout(predicate::str::contains("expected lines: [4], reported lines: [5]"));
}

#[cfg(unix)]
#[test]
fn rule_id_mismatch_exits_two() {
    let (tests, _bin, engine) = fixture_dir(4, "useless-eqeq-typo");
    ruletest_cmd()
        .current_dir(tests.path())
        .arg(tests.path())
        .arg("--json")
        .arg("--engine")
        .arg(&engine)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("rule id mismatch"));
}

#[cfg(unix)]
#[test]
fn engine_error_is_fatal_only_when_strict() {
    let (tests, bin, _engine) = fixture_dir(4, "useless-eqeq");
    let broken = fake_engine(bin.path(), "not json");
    ruletest_cmd()
        .current_dir(tests.path())
        .arg(tests.path())
        .args(["--json", "--engine"])
        .arg(&broken)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("not valid JSON"));
    ruletest_cmd()
        .current_dir(tests.path())
        .arg(tests.path())
        .args(["--json", "--strict", "--engine"])
        .arg(&broken)
        .assert()
        .code(2);
}

#[cfg(unix)]
#[test]
fn rejected_config_is_reported_as_error() {
    let (tests, bin, _engine) = fixture_dir(4, "useless-eqeq");
    let rejecting = fake_engine_exiting(
        bin.path(),
        r#"{"results": [], "errors": [{"type": "InvalidRuleSchemaError", "message": "bad rule"}]}"#,
        7,
    );
    let out = ruletest_cmd()
        .current_dir(tests.path())
        .arg(tests.path())
        .args(["--json", "--strict", "--engine"])
        .arg(&rejecting)
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let v: Value = serde_json::from_slice(&out).unwrap();
    let errors = v["config_with_errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0]["error"].as_str().unwrap().contains("InvalidRuleSchemaError: bad rule"));
    assert_eq!(errors[0]["output"]["errors"][0]["message"], "bad rule");
    assert!(v["results"].as_object().unwrap().is_empty());

    ruletest_cmd()
        .current_dir(tests.path())
        .arg(tests.path())
        .args(["--json", "--engine"])
        .arg(&rejecting)
        .assert()
        .code(0);
}
