//! Integration tests for the `java-cleanup` binary: apply, check and rules.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const WRAPPER_SOURCE: &str = "class A {\n    String f() {\n        String s = new String(\"x\");\n        return s;\n    }\n}\n";
const WRAPPER_CLEANED: &str = "class A {\n    String f() {\n        return \"x\";\n    }\n}\n";

/// Helper to create a workspace with one dirty source file and a build
/// directory that must never be touched.
fn setup_test_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();

    let source = dir.path().join("src/main/java/a/A.java");
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(&source, WRAPPER_SOURCE).unwrap();

    let generated = dir.path().join("target/generated/G.java");
    fs::create_dir_all(generated.parent().unwrap()).unwrap();
    fs::write(&generated, WRAPPER_SOURCE).unwrap();

    fs::write(
        dir.path().join("java-cleanup.toml"),
        "[cleanup]\nredundant_wrapper = true\ninline_local_before_return = true\n",
    )
    .unwrap();

    dir
}

fn run(workspace: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_java-cleanup"))
        .args(args)
        .current_dir(workspace)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn read(workspace: &Path, file: &str) -> String {
    fs::read_to_string(workspace.join(file)).unwrap()
}

#[test]
fn test_apply_help() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["apply", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Rewrite files in place"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_apply_rewrites_sources_and_skips_build_output() {
    let workspace = setup_test_workspace();
    let output = run(workspace.path(), &["apply"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Summary:"));
    assert!(stdout.contains("redundant_wrapper"));

    assert_eq!(read(workspace.path(), "src/main/java/a/A.java"), WRAPPER_CLEANED);
    assert_eq!(read(workspace.path(), "target/generated/G.java"), WRAPPER_SOURCE);
}

#[test]
fn test_apply_idempotent() {
    let workspace = setup_test_workspace();
    assert!(run(workspace.path(), &["apply"]).status.success());
    let output = run(workspace.path(), &["check"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("files clean"));
    assert_eq!(read(workspace.path(), "src/main/java/a/A.java"), WRAPPER_CLEANED);
}

#[test]
fn test_dry_run_with_diff_leaves_files() {
    let workspace = setup_test_workspace();
    let output = run(workspace.path(), &["apply", "--dry-run", "--diff"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains("+        return \"x\";"));
    assert!(stdout.contains("-        return s;"));
    assert_eq!(read(workspace.path(), "src/main/java/a/A.java"), WRAPPER_SOURCE);
}

#[test]
fn test_check_exits_nonzero_when_changes_pending() {
    let workspace = setup_test_workspace();
    let output = run(workspace.path(), &["check"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("would clean"));
    assert_eq!(read(workspace.path(), "src/main/java/a/A.java"), WRAPPER_SOURCE);
}

#[test]
fn test_enable_and_set_flags_without_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("B.java"),
        "class B {\n    void f(int n) {\n        while (n > 0)\n            n--;\n    }\n}\n",
    )
    .unwrap();

    let output = run(
        dir.path(),
        &["apply", "B.java", "--enable", "use_blocks", "--set", "engine.max_passes=2"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        read(dir.path(), "B.java"),
        "class B {\n    void f(int n) {\n        while (n > 0) {\n            n--;\n        }\n    }\n}\n"
    );
}

#[test]
fn test_unknown_rule_is_rejected_with_hint() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["apply", "--enable", "use_block"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("did you mean 'use_blocks'"), "{stderr}");
}

#[test]
fn test_json_report() {
    let workspace = setup_test_workspace();
    let output = run(workspace.path(), &["check", "--format", "json"]);
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let files = report.as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["changed"], true);
    assert_eq!(files[0]["state"], "idle");
    let rules: Vec<&str> = files[0]["applied_rules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|rule| rule.as_str().unwrap())
        .collect();
    assert_eq!(rules, ["inline_local_before_return", "redundant_wrapper"]);
}

#[test]
fn test_unparseable_file_fails_run() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Broken.java"), "class Broken { void f( { }").unwrap();
    let output = run(dir.path(), &["apply", "--enable", "use_blocks"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not parse"));
}

#[test]
fn test_rules_lists_builtins_and_templates() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("java-cleanup.toml"),
        "[[template]]\nid = \"is_empty\"\npattern = \"$L.size() == 0\"\nrewrite = \"$L.isEmpty()\"\n",
    )
    .unwrap();

    let output = run(dir.path(), &["rules"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hoist_single_use_field"));
    assert!(stdout.contains("use_diamond_operator"));
    assert!(stdout.contains("cleanup.this_qualification.mode"));
    assert!(stdout.contains("template.is_empty"));

    let output = run(dir.path(), &["rules", "--format", "json"]);
    let rules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rules.as_array().unwrap().len(), 15);
    assert_eq!(rules[0]["id"], "hoist_single_use_field");
}
