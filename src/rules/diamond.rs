//! `List<String> xs = new ArrayList<String>()` becomes `new ArrayList<>()`.

use crate::edit::{Candidate, Rewrite};
use crate::rules::support::{arguments, has_class_body};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

pub struct UseDiamondOperator {
    descriptor: RuleDescriptor,
}

impl UseDiamondOperator {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "use_diamond_operator",
                "Let the compiler infer constructor type arguments",
                Shape::LocalReplace,
            ),
        }
    }
}

/// Whether the creation's value flows into a target with a declared generic type.
fn has_generic_target(tree: &SyntaxTree, creation: NodeId) -> bool {
    let Some(parent) = tree.parent(creation) else {
        return false;
    };
    match tree.kind(parent) {
        NodeKind::VariableDeclarator if tree.node(creation).field == Some("value") => tree
            .parent(parent)
            .and_then(|decl| tree.child_by_field(decl, "type"))
            .is_some_and(|ty| tree.kind(ty) == NodeKind::GenericType),
        NodeKind::AssignmentExpression if tree.node(creation).field == Some("right") => tree
            .child_by_field(parent, "left")
            .and_then(|left| tree.symbols().binding(left))
            .is_some_and(|symbol| {
                let declared = &tree.symbols().symbol(symbol).declared_type;
                declared.contains('<') && !declared.ends_with(']')
            }),
        _ => false,
    }
}

impl Rule for UseDiamondOperator {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        let mut found = Vec::new();
        for id in tree.ids() {
            if tree.kind(id) != NodeKind::ObjectCreation
                || has_class_body(tree, id)
                || tree.child_by_field(id, "type_arguments").is_some()
                || !has_generic_target(tree, id)
            {
                continue;
            }
            let Some(ty) = tree.child_by_field(id, "type") else {
                continue;
            };
            if tree.kind(ty) != NodeKind::GenericType {
                continue;
            }
            let Some(type_args) = tree
                .named_children(ty)
                .find(|&child| tree.kind(child) == NodeKind::TypeArguments)
            else {
                continue;
            };
            if tree.named_children(type_args).next().is_none() {
                continue;
            }
            let lambda_argument = arguments(tree, id).iter().any(|&arg| {
                matches!(
                    tree.kind(arg),
                    NodeKind::LambdaExpression | NodeKind::MethodReference
                )
            });
            if lambda_argument {
                continue;
            }
            found.push(Candidate::new(
                id,
                Rewrite::replace(tree, tree.span(type_args), "<>"),
                "use diamond operator",
            ));
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::rules::test_support::rewrite_once;

    fn run(statement: &str) -> String {
        let source = format!(
            "class A {{\n    void f() {{\n        {statement}\n    }}\n}}\n"
        );
        let out = rewrite_once(&UseDiamondOperator::new(), &source, &Options::new());
        out.lines().nth(2).unwrap().trim().to_string()
    }

    #[test]
    fn declaration_gets_diamond() {
        assert_eq!(
            run("List<String> xs = new ArrayList<String>();"),
            "List<String> xs = new ArrayList<>();"
        );
        assert_eq!(
            run("Map<String, List<Integer>> m = new HashMap<String, List<Integer>>(16);"),
            "Map<String, List<Integer>> m = new HashMap<>(16);"
        );
    }

    #[test]
    fn anonymous_classes_and_raw_targets_are_kept() {
        assert_eq!(
            run("Comparator<String> c = new Comparator<String>() { public int compare(String a, String b) { return 0; } };"),
            "Comparator<String> c = new Comparator<String>() { public int compare(String a, String b) { return 0; } };"
        );
        assert_eq!(run("Object o = new ArrayList<String>();"), "Object o = new ArrayList<String>();");
        assert_eq!(run("List<String> xs = new ArrayList<>();"), "List<String> xs = new ArrayList<>();");
    }
}
