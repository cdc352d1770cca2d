//! `new String("lit")`, `new String()` and `String.valueOf("lit")` become
//! the literal itself.

use crate::edit::Candidate;
use crate::rules::support::{arguments, has_class_body};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{normalize_type, NodeId, NodeKind, SyntaxTree};

pub struct RedundantWrapper {
    descriptor: RuleDescriptor,
}

impl RedundantWrapper {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "redundant_wrapper",
                "Replace redundant String wrappers around literals with the literal",
                Shape::LocalReplace,
            ),
        }
    }
}

fn is_string_type(text: &str) -> bool {
    matches!(normalize_type(text).as_str(), "String" | "java.lang.String")
}

fn literal_replacement(tree: &SyntaxTree, id: NodeId) -> Option<String> {
    match tree.kind(id) {
        NodeKind::ObjectCreation => {
            let ty = tree.child_by_field(id, "type")?;
            if !is_string_type(tree.text(ty))
                || has_class_body(tree, id)
                || tree.child_by_field(id, "type_arguments").is_some()
            {
                return None;
            }
            match arguments(tree, id).as_slice() {
                [] => Some("\"\"".to_string()),
                [only] if tree.kind(*only) == NodeKind::StringLiteral => {
                    Some(tree.text(*only).to_string())
                }
                _ => None,
            }
        }
        NodeKind::MethodInvocation => {
            let object = tree.child_by_field(id, "object")?;
            let name = tree.child_by_field(id, "name")?;
            if !is_string_type(tree.text(object))
                || tree.symbols().binding(object).is_some()
                || tree.text(name) != "valueOf"
            {
                return None;
            }
            match arguments(tree, id).as_slice() {
                [only] if tree.kind(*only) == NodeKind::StringLiteral => {
                    Some(tree.text(*only).to_string())
                }
                _ => None,
            }
        }
        _ => None,
    }
}

impl Rule for RedundantWrapper {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        Ok(tree
            .ids()
            .filter_map(|id| {
                let literal = literal_replacement(tree, id)?;
                Some(Candidate::replace_node(
                    tree,
                    id,
                    literal,
                    format!("unwrap {}", tree.text(id)),
                ))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::rules::test_support::{candidates, rewrite_once};

    fn run(body: &str) -> String {
        let source = format!("class A {{\n    Object f() {{\n        {body}\n    }}\n}}\n");
        let out = rewrite_once(&RedundantWrapper::new(), &source, &Options::new());
        out.lines().nth(2).unwrap().trim().to_string()
    }

    #[test]
    fn unwraps_string_constructor() {
        assert_eq!(run("return new String(\"x\");"), "return \"x\";");
        assert_eq!(run("return new String();"), "return \"\";");
        assert_eq!(run("return new java.lang.String(\"y\");"), "return \"y\";");
    }

    #[test]
    fn unwraps_value_of_literal() {
        assert_eq!(run("return String.valueOf(\"z\").length();"), "return \"z\".length();");
    }

    #[test]
    fn leaves_non_literal_arguments() {
        assert_eq!(run("return new String(chars);"), "return new String(chars);");
        assert_eq!(run("return String.valueOf(5);"), "return String.valueOf(5);");
    }

    #[test]
    fn local_named_string_is_not_the_type() {
        let source = "class A { Object f(Fmt String) { return String.valueOf(\"a\"); } }";
        assert!(candidates(&RedundantWrapper::new(), source, &Options::new()).is_empty());
    }
}
