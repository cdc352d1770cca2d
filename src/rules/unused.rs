//! Delete locals and private fields that nothing reads or writes.

use crate::edit::{Candidate, Rewrite};
use crate::rules::support::{
    has_unresolved_member_access, is_primitive_type, is_pure_primitive, is_side_effect_free,
};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape, SubOption};
use crate::syntax::{normalize_type, NodeId, NodeKind, SyntaxTree};

pub struct RemoveUnusedCode {
    descriptor: RuleDescriptor,
}

impl RemoveUnusedCode {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "remove_unused_code",
                "Remove unused local variables and private fields",
                Shape::StatementList,
            )
            .with_alias("cleanup.remove_unused_local_variables")
            .with_sub_option(SubOption::flag("locals", true))
            .with_sub_option(SubOption::flag("private_fields", true)),
        }
    }
}

/// Every declarator of `decl` is unreferenced and its initializer, if any,
/// can be dropped without losing an effect. A primitive declaration unboxes
/// its initializer, which throws on `null`.
fn all_declarators_unused(tree: &SyntaxTree, decl: NodeId) -> bool {
    let primitive = tree
        .child_by_field(decl, "type")
        .is_some_and(|ty| is_primitive_type(&normalize_type(tree.text(ty))));
    let declarators: Vec<NodeId> = tree.children_by_field(decl, "declarator").collect();
    !declarators.is_empty()
        && declarators.iter().all(|&declarator| {
            let unreferenced = tree
                .symbols()
                .declared_by(declarator)
                .is_some_and(|symbol| tree.symbols().references(symbol).is_empty());
            let pure = tree
                .child_by_field(declarator, "value")
                .is_none_or(|value| {
                    tree.kind(value) != NodeKind::ArrayInitializer
                        && if primitive {
                            is_pure_primitive(tree, value)
                        } else {
                            is_side_effect_free(tree, value)
                        }
                });
            unreferenced && pure
        })
}

fn is_removable_field(tree: &SyntaxTree, decl: NodeId) -> bool {
    if !tree.has_modifier(decl, "private") || tree.has_annotation(decl) {
        return false;
    }
    tree.children_by_field(decl, "declarator").all(|declarator| {
        tree.child_by_field(declarator, "name").is_some_and(|name| {
            let name = tree.text(name);
            name != "serialVersionUID" && !has_unresolved_member_access(tree, name)
        })
    })
}

fn deletion(tree: &SyntaxTree, decl: NodeId, label: String) -> Candidate {
    let mut candidate = Candidate::new(decl, Rewrite::delete(tree, tree.deletion_span(decl)), label);
    for comment in tree.comments().trailing_of(decl) {
        candidate = candidate.with_droppable_comment(comment.span);
    }
    candidate
}

fn declared_names(tree: &SyntaxTree, decl: NodeId) -> String {
    tree.children_by_field(decl, "declarator")
        .filter_map(|declarator| tree.child_by_field(declarator, "name"))
        .map(|name| tree.text(name))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Rule for RemoveUnusedCode {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        let locals = cx.settings.flag("locals");
        let fields = cx.settings.flag("private_fields");
        let mut found = Vec::new();
        for id in tree.ids() {
            let in_list = tree
                .parent(id)
                .is_some_and(|parent| tree.kind(parent).is_statement_list());
            let label = match tree.kind(id) {
                NodeKind::LocalVariableDeclaration if locals && in_list => {
                    format!("remove unused local {}", declared_names(tree, id))
                }
                NodeKind::FieldDeclaration if fields && is_removable_field(tree, id) => {
                    format!("remove unused field {}", declared_names(tree, id))
                }
                _ => continue,
            };
            if all_declarators_unused(tree, id) {
                found.push(deletion(tree, id, label));
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::rules::test_support::{candidates, rewrite_once};

    #[test]
    fn removes_unused_local_line() {
        let source = "class A {\n    int f(int y) {\n        int x = 1;\n        return y;\n    }\n}\n";
        let out = rewrite_once(&RemoveUnusedCode::new(), source, &Options::new());
        assert_eq!(out, "class A {\n    int f(int y) {\n        return y;\n    }\n}\n");
    }

    #[test]
    fn keeps_locals_with_effects_or_uses() {
        let rule = RemoveUnusedCode::new();
        let options = Options::new();
        assert!(candidates(&rule, "class A { void f() { int x = g(); } }", &options).is_empty());
        assert!(candidates(&rule, "class A { int f() { int x = 1; return x; } }", &options).is_empty());
        assert!(candidates(&rule, "class A { void f() { int x; x = 2; } }", &options).is_empty());
        assert!(candidates(&rule, "class A { void f() { int a = 1, b = 2; g(b); } }", &options).is_empty());
    }

    #[test]
    fn keeps_locals_that_unbox() {
        let rule = RemoveUnusedCode::new();
        let options = Options::new();
        assert!(candidates(&rule, "class A { void f(Integer boxed) { int y = boxed; } }", &options).is_empty());
        assert!(candidates(&rule, "class A { void f(Integer boxed) { int y = boxed * 2; } }", &options).is_empty());
        assert_eq!(
            candidates(&rule, "class A { void f(Integer boxed) { Integer y = boxed; } }", &options).len(),
            1
        );
        assert_eq!(
            candidates(&rule, "class A { void f(int n) { long y = n * 2; } }", &options).len(),
            1
        );
    }

    #[test]
    fn removes_unused_private_field() {
        let source = "class A {\n    private int count = 0;\n    int g() { return 1; }\n}\n";
        let out = rewrite_once(&RemoveUnusedCode::new(), source, &Options::new());
        assert_eq!(out, "class A {\n    int g() { return 1; }\n}\n");
    }

    #[test]
    fn keeps_visible_annotated_and_serial_fields() {
        let rule = RemoveUnusedCode::new();
        let options = Options::new();
        assert!(candidates(&rule, "class A { int count = 0; }", &options).is_empty());
        assert!(candidates(&rule, "class A { @Inject private Dep dep; }", &options).is_empty());
        assert!(candidates(&rule, "class A { private static final long serialVersionUID = 1L; }", &options).is_empty());
        assert!(candidates(
            &rule,
            "class A { private int n; boolean same(A o) { return o.n == 0; } }",
            &options
        )
        .is_empty());
    }

    #[test]
    fn sub_options_limit_targets() {
        let rule = RemoveUnusedCode::new();
        let source = "class A { private int n; void f() { int x = 1; } }";
        let options = Options::new().with("cleanup.remove_unused_code.private_fields", false);
        let found = candidates(&rule, source, &options);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].labels, ["remove unused local x"]);
    }
}
