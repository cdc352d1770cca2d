//! Property tests over generated compilation units.

use java_cleanup::compositor::compose;
use java_cleanup::render::Style;
use java_cleanup::rules::{Catalog, MatchContext, Rule};
use java_cleanup::{
    clean_up, Diagnostics, EditSet, JavaParser, Options, ProposedEdit, SchedulerState,
};
use proptest::prelude::*;

const RULES: &[&str] = &[
    "hoist_single_use_field",
    "indexed_loop_to_foreach",
    "remove_unused_code",
    "remove_redundant_super_call",
    "import_qualified_names",
    "this_qualification",
    "redundant_wrapper",
    "use_blocks",
    "simplify_boolean_if_else",
    "inline_local_before_return",
    "primitive_parsing",
    "unnecessary_cast",
    "use_diamond_operator",
    "merge_duplicate_branches",
];

/// One statement template; `{n}` makes local names unique.
fn statement() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("String s{n} = new String(\"v{n}\");"),
        Just("int p{n} = Integer.valueOf(s).intValue();"),
        Just("if (flag) g({n}); else h({n});"),
        Just("while (count > {n})\n            count--;"),
        Just("if (flag) { ok = true; } else { ok = false; }"),
        Just("java.util.List<String> l{n} = new java.util.ArrayList<String>();"),
        Just("int c{n} = (int) count;"),
        Just("long w{n} = (long) {n};"),
        Just("g(String.valueOf(\"x{n}\"));"),
        Just("count += {n};"),
        Just("this.count += {n};"),
        Just("count += limit;"),
        Just("for (int i{n} = 0; i{n} < values.length; i{n}++) {\n            count += values[i{n}];\n        }"),
        Just("java.util.Map<String, Integer> m{n} = new java.util.HashMap<String, Integer>();"),
    ]
}

/// Optional constructor placed between the fields and `run`.
fn constructor() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(""),
        Just("\n    Sample() {\n        super();\n    }\n"),
        Just("\n    Sample() {\n        // framework hook\n        super();\n    }\n"),
        Just("\n    Sample() {\n        super();\n        count = 1;\n    }\n"),
    ]
}

fn comment() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![
        3 => Just(None),
        1 => Just(Some("// note {n}")),
        1 => Just(Some("/* block {n} */")),
    ]
}

fn method_body() -> impl Strategy<Value = String> {
    prop::collection::vec((comment(), statement()), 0..6).prop_map(|lines| {
        let mut body = String::new();
        for (n, (comment, stmt)) in lines.into_iter().enumerate() {
            let n = n.to_string();
            if let Some(comment) = comment {
                body.push_str(&format!("        {}\n", comment.replace("{n}", &n)));
            }
            body.push_str(&format!("        {}\n", stmt.replace("{n}", &n)));
        }
        body
    })
}

fn program() -> impl Strategy<Value = String> {
    (constructor(), method_body()).prop_map(|(constructor, body)| {
        format!(
            "class Sample {{\n    int count;\n    boolean ok;\n    private int limit = 3;\n{constructor}\n    boolean run(boolean flag, String s, int[] values) {{\n{body}        boolean r = ok;\n        return r;\n    }}\n}}\n"
        )
    })
}

fn rule_subset() -> impl Strategy<Value = Options> {
    prop::sample::subsequence(RULES, 0..=RULES.len())
        .prop_map(|ids| ids.into_iter().fold(Options::new(), |options, id| options.enable(id)))
}

fn comment_texts(source: &str) -> Vec<String> {
    let tree = JavaParser::new().unwrap().parse_tree(source).unwrap();
    let mut texts: Vec<String> = tree
        .comments()
        .all()
        .iter()
        .map(|comment| comment.text(&tree).trim().to_string())
        .collect();
    texts.sort();
    texts
}

/// Edit set the compositor accepts on the first pass over `source`.
fn first_pass(source: &str, options: &Options) -> EditSet {
    let tree = JavaParser::new().unwrap().parse_tree(source).unwrap();
    let catalog = Catalog::builtin().unwrap();
    let style = Style::detect(source);
    let mut edits = Vec::new();
    for active in catalog.active_rules(options) {
        let cx = MatchContext { tree: &tree, settings: &active.settings, style: &style };
        for candidate in active.rule.find(&cx).unwrap() {
            if let Ok(edit) = ProposedEdit::from_candidate(&tree, active.id(), active.priority, candidate) {
                edits.push(edit);
            }
        }
    }
    compose(edits, 1, &mut Diagnostics::new()).accepted
}

/// A program, a rule set and a permutation of its first-pass rewrites.
fn first_pass_orders() -> impl Strategy<Value = (String, Options, Vec<usize>)> {
    (program(), rule_subset()).prop_flat_map(|(source, options)| {
        let count = first_pass(&source, &options).rewrites().count();
        let order = Just((0..count).collect::<Vec<usize>>()).prop_shuffle();
        (Just(source), Just(options), order)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn disabled_rules_change_nothing(source in program()) {
        let result = clean_up(&source, &Options::new()).unwrap();
        prop_assert_eq!(&result.text, &source);
        prop_assert!(result.applied_rules.is_empty());
    }

    #[test]
    fn second_run_is_a_no_op(source in program(), options in rule_subset()) {
        let first = clean_up(&source, &options).unwrap();
        prop_assert_eq!(first.state, SchedulerState::Idle);
        let second = clean_up(&first.text, &options).unwrap();
        prop_assert!(second.applied_rules.is_empty(), "{:?}\n{}", second.applied_rules, first.text);
        prop_assert_eq!(second.text, first.text);
    }

    #[test]
    fn comments_are_conserved(source in program(), options in rule_subset()) {
        let result = clean_up(&source, &options).unwrap();
        prop_assert_eq!(comment_texts(&result.text), comment_texts(&source));
    }

    #[test]
    fn untouched_regions_are_byte_identical(source in program(), options in rule_subset()) {
        let kept = "    // formatting kept as written\n    int   keep ( int a )  {\n        return a  +  1 ;  /* trailing */\n    }\n\n";
        let source = source.replacen("class Sample {\n", &format!("class Sample {{\n{kept}"), 1);
        let result = clean_up(&source, &options).unwrap();
        // Imports may be added above the class; the member itself is untouched.
        let header = format!("class Sample {{\n{kept}");
        prop_assert!(result.text.contains(&header), "{}", result.text);
        prop_assert!(result.text.ends_with("    }\n}\n"), "{}", result.text);
    }

    #[test]
    fn accepted_edits_commute((source, options, order) in first_pass_orders()) {
        let accepted = first_pass(&source, &options);
        let expected = accepted.apply(&source).unwrap();
        prop_assert_eq!(&accepted.apply_in_order(&source, &order).unwrap(), &expected);
        let reversed: Vec<usize> = order.iter().rev().copied().collect();
        prop_assert_eq!(&accepted.apply_in_order(&source, &reversed).unwrap(), &expected);
    }
}
