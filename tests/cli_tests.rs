// CLI behavior: exit codes, rendered diagnostics, and output forms.
// Requires: assert_cmd, predicates, tempfile in [dev-dependencies]

use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use tempfile::TempDir;

const GOOD: &str = "command\n  emit 1 + 2\nendcommand\n";
const BAD: &str = "command\n  set a. = 1\nendcommand\n";
const DUPLICATE_KEY: &str = "command\n  emit {\"a\": 1, \"a\": 2}\nendcommand\n";

fn stepscript(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stepscript").unwrap();
    cmd.current_dir(dir.path()).env_remove("STEPSCRIPT_LOG");
    cmd
}

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

// ---
// ast
// ---

#[test]
fn ast_prints_outline() {
    let dir = workspace(&[("good.ns", GOOD)]);
    stepscript(&dir)
        .args(["ast", "good.ns"])
        .assert()
        .success()
        .stdout(contains("command\n  emit (1 + 2)\nendcommand\n"));
}

#[test]
fn ast_prints_json() {
    let dir = workspace(&[("good.ns", GOOD)]);
    stepscript(&dir)
        .args(["ast", "good.ns", "--json"])
        .assert()
        .success()
        .stdout(contains("\"kind\": \"emit\"").and(contains("\"type\": \"binary_op\"")));
}

#[test]
fn ast_rejects_script_with_errors() {
    let dir = workspace(&[("bad.ns", BAD)]);
    stepscript(&dir)
        .args(["ast", "bad.ns"])
        .assert()
        .code(1)
        .stdout(contains("command").not())
        .stderr(contains("stepscript::rejected"));
}

#[test]
fn ast_reports_syntax_errors() {
    let dir = workspace(&[("broken.ns", "command\n  emit (1 +\nendcommand\n")]);
    stepscript(&dir)
        .args(["ast", "broken.ns"])
        .assert()
        .code(1)
        .stderr(contains("stepscript::syntax"));
}

#[test]
fn ast_reports_missing_file() {
    let dir = workspace(&[]);
    stepscript(&dir)
        .args(["ast", "missing.ns"])
        .assert()
        .code(1)
        .stderr(contains("stepscript::io"));
}

#[test]
fn ast_prints_warnings_but_succeeds() {
    let dir = workspace(&[("dup.ns", DUPLICATE_KEY)]);
    stepscript(&dir)
        .args(["ast", "dup.ns"])
        .assert()
        .success()
        .stderr(contains("stepscript::build::duplicate_map_key"));
}

// ---
// check
// ---

#[test]
fn check_summarizes_a_directory() {
    let dir = workspace(&[("good.ns", GOOD), ("nested/bad.ns", BAD), ("notes.txt", BAD)]);
    stepscript(&dir)
        .arg("check")
        .assert()
        .code(1)
        .stdout(contains("2 checked, 1 rejected, 0 failed"))
        .stdout(contains("1 error(s), 0 warning(s)"))
        .stderr(contains("stepscript::build::malformed_lvalue"));
}

#[test]
fn check_counts_syntax_failures() {
    let dir = workspace(&[("good.ns", GOOD), ("broken.ns", "command\n")]);
    stepscript(&dir)
        .args(["check", "."])
        .assert()
        .code(1)
        .stdout(contains("2 checked, 0 rejected, 1 failed"));
}

#[test]
fn check_passes_clean_scripts() {
    let dir = workspace(&[("a.ns", GOOD), ("b.ns", DUPLICATE_KEY)]);
    stepscript(&dir)
        .arg("check")
        .assert()
        .success()
        .stdout(contains("2 checked, 0 rejected, 0 failed"))
        .stdout(contains("(1 warning(s))"));
}

#[test]
fn check_with_no_scripts_succeeds() {
    let dir = workspace(&[("readme.txt", "")]);
    stepscript(&dir)
        .arg("check")
        .assert()
        .success()
        .stdout(contains("No .ns scripts found"));
}

#[test]
fn check_accepts_the_demo_scripts() {
    let dir = workspace(&[]);
    let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
    stepscript(&dir)
        .arg("check")
        .arg(demos)
        .assert()
        .success()
        .stdout(contains("2 checked, 0 rejected, 0 failed"));
}

// ---
// events
// ---

#[test]
fn events_prints_nested_stream() {
    let dir = workspace(&[("good.ns", GOOD)]);
    stepscript(&dir)
        .args(["events", "good.ns"])
        .assert()
        .success()
        .stdout(contains("enter Program @good.ns:1:1"))
        .stdout(contains("  enter Command @good.ns:1:1"));
}

#[test]
fn events_prints_json() {
    let dir = workspace(&[("good.ns", GOOD)]);
    stepscript(&dir)
        .args(["events", "--json", "good.ns"])
        .assert()
        .success()
        .stdout(contains("\"event\": \"enter\"").and(contains("\"kind\": \"EmitStatement\"")));
}

// ---
// configuration
// ---

#[test]
fn explicit_config_can_promote_warnings() {
    let dir = workspace(&[
        ("dup.ns", DUPLICATE_KEY),
        ("strict.yaml", "warnings_as_errors: true\n"),
    ]);
    stepscript(&dir)
        .args(["--config", "strict.yaml", "ast", "dup.ns"])
        .assert()
        .code(1)
        .stderr(contains("stepscript::rejected"));
}

#[test]
fn discovered_config_is_applied() {
    let dir = workspace(&[
        ("big.ns", "command\n  emit 123456789012345678901234567890\nendcommand\n"),
        ("stepscript.yaml", "number_fallback: warn\n"),
    ]);
    stepscript(&dir).args(["ast", "big.ns"]).assert().success();
}

#[test]
fn invalid_config_exits_with_code_two() {
    let dir = workspace(&[("good.ns", GOOD), ("stepscript.yaml", "color: always\n")]);
    stepscript(&dir)
        .args(["ast", "good.ns"])
        .assert()
        .code(2)
        .stderr(contains("stepscript::config"));
}
