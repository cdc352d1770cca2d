//! End-to-end clean-up runs through the public engine API.

use java_cleanup::config::{load_from_str, Options};
use java_cleanup::{clean_up, CancellationToken, CleanUpError, Engine, SchedulerState, Severity};
use pretty_assertions::assert_eq;

fn enabled(ids: &[&str]) -> Options {
    ids.iter().fold(Options::new(), |options, id| options.enable(id))
}

/// Cleans `source`, then checks a second run changes nothing.
fn clean(source: &str, options: &Options) -> String {
    let first = clean_up(source, options).unwrap();
    let second = clean_up(&first.text, options).unwrap();
    assert!(
        second.applied_rules.is_empty(),
        "second run applied {:?} to:\n{}",
        second.applied_rules,
        first.text
    );
    assert_eq!(second.text, first.text);
    first.text
}

#[test]
fn wrapper_and_inline_fire_in_one_run() {
    let source = "class A {\n    String f() {\n        String s = new String(\"x\");\n        return s;\n    }\n}\n";
    let expected = "class A {\n    String f() {\n        return \"x\";\n    }\n}\n";

    let result = clean_up(source, &enabled(&["redundant_wrapper", "inline_local_before_return"])).unwrap();
    assert_eq!(result.text, expected);
    assert_eq!(
        result.applied_rules.iter().map(String::as_str).collect::<Vec<_>>(),
        ["inline_local_before_return", "redundant_wrapper"]
    );
    assert_eq!(result.state, SchedulerState::Idle);

    let reversed = enabled(&["inline_local_before_return", "redundant_wrapper"]);
    assert_eq!(clean(source, &reversed), expected);
}

#[test]
fn single_use_field_moves_into_nested_type_method() {
    let source = "\
class Outer {
    static class Inner {
        // counts retries
        private int limit = 3; // upper bound

        int run() {
            int n = 0;
            while (n < limit) {
                n++;
            }
            return n;
        }
    }
}
";
    let expected = "\
class Outer {
    static class Inner {
        int run() {
            int n = 0;
            // counts retries
            int limit = 3; // upper bound
            while (n < limit) {
                n++;
            }
            return n;
        }
    }
}
";
    assert_eq!(clean(source, &enabled(&["hoist_single_use_field"])), expected);
}

#[test]
fn duplicate_else_if_branches_merge_once() {
    let source = "class A {\n    int f(int x) {\n        if (x == 1) {\n            return 0;\n        } else if (x == 2) {\n            return 0;\n        }\n        return 1;\n    }\n}\n";
    let expected = "class A {\n    int f(int x) {\n        if (x == 1 || x == 2) {\n            return 0;\n        }\n        return 1;\n    }\n}\n";
    assert_eq!(clean(source, &enabled(&["merge_duplicate_branches"])), expected);
}

#[test]
fn long_duplicate_chain_collapses_over_several_passes() {
    let source = "class A { int f(int x) { if (x == 1) return 0; else if (x == 2) return 0; else if (x == 3) return 0; return 1; } }";
    let result = clean_up(source, &enabled(&["merge_duplicate_branches"])).unwrap();
    assert_eq!(
        result.text,
        "class A { int f(int x) { if (x == 1 || x == 2 || x == 3) return 0; return 1; } }"
    );
    assert!(result.passes >= 2);
}

#[test]
fn blocks_added_first_enable_boolean_simplification() {
    let source = "class A {\n    boolean f(boolean b) {\n        if (b) return true; else return false;\n    }\n}\n";
    let expected = "class A {\n    boolean f(boolean b) {\n        return b;\n    }\n}\n";
    let result = clean_up(source, &enabled(&["use_blocks", "simplify_boolean_if_else"])).unwrap();
    assert_eq!(result.text, expected);
    assert_eq!(result.passes, 2);
    assert_eq!(result.applied_rules.len(), 2);
}

#[test]
fn super_call_with_leading_comment_is_kept() {
    let source = "class A {\n    A() {\n        // required by the framework\n        super();\n        init();\n    }\n}\n";
    let result = clean_up(source, &enabled(&["remove_redundant_super_call"])).unwrap();
    assert_eq!(result.text, source);
    assert!(!result.is_changed());
    assert!(result
        .diagnostics
        .at_least(Severity::Info)
        .any(|d| d.rule_id.as_deref() == Some("remove_redundant_super_call")));
}

#[test]
fn super_call_with_trailing_comment_is_removed() {
    let source = "class A {\n    A() {\n        super(); // implicit\n        init();\n    }\n}\n";
    let expected = "class A {\n    A() {\n        init();\n    }\n}\n";
    assert_eq!(clean(source, &enabled(&["remove_redundant_super_call"])), expected);
}

#[test]
fn nested_casts_remove_inner_despite_commented_outer() {
    let source = "class A {\n    void f(int n) {\n        int a = (int) /* c */ ((int) n);\n    }\n}\n";
    let expected = "class A {\n    void f(int n) {\n        int a = (int) /* c */ n;\n    }\n}\n";
    let result = clean_up(source, &enabled(&["unnecessary_cast"])).unwrap();
    assert_eq!(result.text, expected);
    assert_eq!(result.state, SchedulerState::Idle);
    assert!(result.applied_rules.contains("unnecessary_cast"));
}

#[test]
fn boxed_boolean_condition_is_not_returned_as_is() {
    let source = "class A {\n    Boolean f(Boolean b) {\n        if (b) {\n            return true;\n        } else {\n            return false;\n        }\n    }\n}\n";
    let result = clean_up(source, &enabled(&["simplify_boolean_if_else"])).unwrap();
    assert_eq!(result.text, source);
    assert!(result.applied_rules.is_empty());
}

#[test]
fn alias_keys_enable_rules() {
    let source = "class A {\n    void f(int n) {\n        while (n > 0)\n            n--;\n    }\n}\n";
    let options = Options::new().with("cleanup.always_use_blocks", true);
    let result = clean_up(source, &options).unwrap();
    assert_eq!(
        result.text,
        "class A {\n    void f(int n) {\n        while (n > 0) {\n            n--;\n        }\n    }\n}\n"
    );
    assert!(result.applied_rules.contains("use_blocks"));
}

#[test]
fn disabled_options_leave_input_alone() {
    let source = "class A { String s = new String(\"x\"); }";
    let options = Options::new().with("cleanup.redundant_wrapper", false);
    let result = clean_up(source, &options).unwrap();
    assert_eq!(result.text, source);
    assert!(result.applied_rules.is_empty());
    assert_eq!(result.passes, 0);
}

#[test]
fn broken_input_is_a_parse_error() {
    let err = clean_up("class A { void f() { int x = ; } }", &enabled(&["use_blocks"])).unwrap_err();
    match err {
        CleanUpError::Parse { errors, line, .. } => {
            assert!(!errors.is_empty());
            assert_eq!(line, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn one_pass_budget_reports_exhaustion() {
    let source = "class A { int f(int x) { if (x == 1) return 0; else if (x == 2) return 0; else if (x == 3) return 0; return 1; } }";
    let options = enabled(&["merge_duplicate_branches"]).with("engine.max_passes", 1);
    let result = clean_up(source, &options).unwrap();
    assert_eq!(result.state, SchedulerState::Exhausted);
    assert_eq!(result.passes, 1);
    assert!(result
        .diagnostics
        .at_least(Severity::Warning)
        .any(|d| d.message.contains("exhausted")));
}

#[test]
fn configured_template_rule_runs_with_builtins() {
    let loaded = load_from_str(
        r#"
[cleanup]
redundant_wrapper = true

[[template]]
id = "is_empty"
pattern = "$LIST.size() == 0"
rewrite = "$LIST.isEmpty()"
"#,
    )
    .unwrap();
    let engine = Engine::with_templates(&loaded.templates).unwrap();
    let source = "class A {\n    boolean f(java.util.List<String> xs) {\n        String s = new String(\"a\");\n        return xs.size() == 0;\n    }\n}\n";
    let result = engine.clean_up(source, &loaded.options).unwrap();
    assert_eq!(
        result.text,
        "class A {\n    boolean f(java.util.List<String> xs) {\n        String s = \"a\";\n        return xs.isEmpty();\n    }\n}\n"
    );
    assert!(result.applied_rules.contains("template.is_empty"));
    assert!(result.applied_rules.contains("redundant_wrapper"));
}

#[test]
fn cancelled_run_returns_input() {
    let engine = Engine::builtin().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let source = "class A { String s = new String(\"x\"); }";
    let result = engine
        .clean_up_with(source, &enabled(&["redundant_wrapper"]), &cancel)
        .unwrap();
    assert_eq!(result.text, source);
    assert_eq!(result.state, SchedulerState::Cancelled);
}
