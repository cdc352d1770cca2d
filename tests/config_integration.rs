//! Configuration files driving the engine: TOML loading, validation and
//! option flattening.

use java_cleanup::config::{load_from_path, load_from_str, ConfigError, ValidationIssue};
use java_cleanup::{Engine, Severity};
use std::fs;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
[engine]
max_passes = 4
format_edited_regions = true
indent = 4

[cleanup]
redundant_wrapper = true
use_blocks = false

[cleanup.this_qualification]
enabled = true
mode = "always"

[cleanup.remove_unused_code]
enabled = true
private_fields = false

[[template]]
id = "is_empty"
pattern = "$LIST.size() == 0"
rewrite = "$LIST.isEmpty()"
summary = "Prefer isEmpty()"
"#;

#[test]
fn test_load_full_config() {
    let loaded = load_from_str(FULL_CONFIG).unwrap();
    let options = &loaded.options;

    assert_eq!(options.integer("engine.max_passes"), Some(4));
    assert_eq!(options.integer("engine.indent"), Some(4));
    assert!(options.is_enabled("cleanup.redundant_wrapper"));
    assert!(!options.is_enabled("cleanup.use_blocks"));
    assert!(options.is_enabled("cleanup.this_qualification"));
    assert_eq!(options.text("cleanup.this_qualification.mode"), Some("always"));
    assert!(!options.flag("cleanup.remove_unused_code.private_fields", true));
    assert!(options.is_enabled("cleanup.template.is_empty"));

    assert_eq!(loaded.templates.len(), 1);
    assert_eq!(loaded.templates[0].summary.as_deref(), Some("Prefer isEmpty()"));
    assert!(loaded.warnings.is_empty());
}

#[test]
fn test_config_options_are_known_to_catalog() {
    let loaded = load_from_str(FULL_CONFIG).unwrap();
    let engine = Engine::with_templates(&loaded.templates).unwrap();
    let issues = engine.catalog().check_options(&loaded.options);
    assert!(issues.is_empty(), "{issues:?}");
}

#[test]
fn test_config_drives_clean_up() {
    let loaded = load_from_str(
        r#"
[cleanup.this_qualification]
enabled = true
mode = "always"
"#,
    )
    .unwrap();
    let engine = Engine::with_templates(&loaded.templates).unwrap();
    let source = "class A {\n    int n;\n\n    int get() {\n        return n;\n    }\n}\n";
    let result = engine.clean_up(source, &loaded.options).unwrap();
    assert_eq!(
        result.text,
        "class A {\n    int n;\n\n    int get() {\n        return this.n;\n    }\n}\n"
    );
}

#[test]
fn test_load_from_path_and_error_context() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("java-cleanup.toml");
    fs::write(&good, "[cleanup]\nuse_blocks = true\n").unwrap();
    let loaded = load_from_path(&good).unwrap();
    assert!(loaded.options.is_enabled("cleanup.use_blocks"));

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[engine]\nmax_passes = 0\n").unwrap();
    let err = load_from_path(&bad).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { path: Some(_), .. }));
    assert!(err.to_string().contains("bad.toml"));

    let missing = load_from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));
}

#[test]
fn test_validation_reports_every_template_problem() {
    let err = load_from_str(
        r#"
[[template]]
id = "dup"
pattern = "$A"

[[template]]
id = "dup"
pattern = ""
"#,
    )
    .unwrap_err();
    let ConfigError::Validation { source, .. } = err else {
        panic!("expected validation error, got {err}");
    };
    assert!(source
        .issues
        .contains(&ValidationIssue::DuplicateTemplate { id: "dup".to_string() }));
    assert!(source.issues.contains(&ValidationIssue::MissingField {
        template_id: Some("dup".to_string()),
        field: "pattern",
    }));
}

#[test]
fn test_unknown_keys_warn_instead_of_failing() {
    let loaded = load_from_str(
        r#"
[engine]
max_pass = 3

[[template]]
id = "t"
pattern = "$A.size() == 0"
rewrite = "$A.isEmpty()"
kinds = "binary_expression"
"#,
    )
    .unwrap();
    assert_eq!(loaded.warnings.len(), 2);
    assert!(loaded.warnings[0].contains("engine.max_passes"));
    assert!(loaded.warnings[1].contains("template.kind"));
}

#[test]
fn test_misspelled_rule_key_becomes_diagnostic() {
    let loaded = load_from_str("[cleanup]\nredundant_wraper = true\n").unwrap();
    let engine = Engine::builtin().unwrap();
    let result = engine
        .clean_up("class A { String s = new String(\"a\"); }", &loaded.options)
        .unwrap();
    assert!(!result.is_changed());
    let info: Vec<_> = result.diagnostics.at_least(Severity::Info).collect();
    assert!(info
        .iter()
        .any(|d| d.message.contains("cleanup.redundant_wrapper")));
}

#[test]
fn test_invalid_template_fails_catalog_construction() {
    let loaded = load_from_str(
        r#"
[[template]]
id = "Bad-Id"
pattern = "$A"
"#,
    )
    .unwrap();
    assert!(Engine::with_templates(&loaded.templates).is_err());
}
