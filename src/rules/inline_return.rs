//! `T x = e; return x;` becomes `return e;`.

use crate::edit::{Candidate, Rewrite};
use crate::rules::support::{enclosing_callable, expression_type};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{normalize_type, NodeId, NodeKind, Span, SyntaxTree};

pub struct InlineLocalBeforeReturn {
    descriptor: RuleDescriptor,
}

impl InlineLocalBeforeReturn {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "inline_local_before_return",
                "Return an expression directly instead of through a temporary",
                Shape::StatementList,
            ),
        }
    }
}

fn return_type(tree: &SyntaxTree, at: NodeId) -> Option<String> {
    let callable = enclosing_callable(tree, at)?;
    if tree.kind(callable) != NodeKind::MethodDeclaration {
        return None;
    }
    tree.child_by_field(callable, "type")
        .map(|ty| normalize_type(tree.text(ty)))
}

/// Returning the value directly performs the same conversion as the store.
fn same_conversion(tree: &SyntaxTree, decl: NodeId, value: NodeId) -> bool {
    let Some(declared) = tree
        .child_by_field(decl, "type")
        .map(|ty| normalize_type(tree.text(ty)))
    else {
        return false;
    };
    declared == "var"
        || return_type(tree, decl).is_some_and(|ret| ret == declared)
        || expression_type(tree, value).is_some_and(|ty| ty == declared)
}

impl Rule for InlineLocalBeforeReturn {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        let mut found = Vec::new();
        for decl in tree.ids() {
            if tree.kind(decl) != NodeKind::LocalVariableDeclaration
                || tree.has_annotation(decl)
                || !tree
                    .parent(decl)
                    .is_some_and(|parent| tree.kind(parent).is_statement_list())
            {
                continue;
            }
            let declarators: Vec<NodeId> = tree.children_by_field(decl, "declarator").collect();
            let [declarator] = declarators.as_slice() else {
                continue;
            };
            let (Some(value), Some(symbol)) = (
                tree.child_by_field(*declarator, "value"),
                tree.symbols().declared_by(*declarator),
            ) else {
                continue;
            };
            if tree.kind(value) == NodeKind::ArrayInitializer {
                continue;
            }
            let Some(ret) = tree.next_sibling(decl) else {
                continue;
            };
            if tree.kind(ret) != NodeKind::ReturnStatement {
                continue;
            }
            let Some(returned) = tree.first_named_child(ret) else {
                continue;
            };
            let references = tree.symbols().references(symbol);
            if references != [returned] || !same_conversion(tree, decl, value) {
                continue;
            }

            let span = Span::new(tree.span(decl).start, tree.span(ret).end);
            let value_span = tree.span(value);
            let stray_comment = tree
                .comments()
                .within(span)
                .any(|comment| !value_span.contains(comment.span));
            if stray_comment {
                continue;
            }
            let name = &tree.symbols().symbol(symbol).name;
            found.push(Candidate::new(
                decl,
                Rewrite::replace(tree, span, format!("return {};", tree.text(value))),
                format!("inline {name} into return"),
            ));
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
    fn inlines_single_use_temporary() {
        let source = "class A {\n    String f() {\n        String s = g();\n        return s;\n    }\n}\n";
        let out = rewrite_once(&InlineLocalBeforeReturn::new(), source, &Options::new());
        assert_eq!(out, "class A {\n    String f() {\n        return g();\n    }\n}\n");
    }

    #[test]
    fn accepts_var_and_literal_typed_locals() {
        let rule = InlineLocalBeforeReturn::new();
        let options = Options::new();
        assert_eq!(
            candidates(&rule, "class A { Object f() { var x = g(); return x; } }", &options).len(),
            1
        );
        assert_eq!(
            candidates(&rule, "class A { Object f() { int x = 1; return x; } }", &options).len(),
            1
        );
    }

    #[test]
    fn abstains_when_conversion_could_differ() {
        let rule = InlineLocalBeforeReturn::new();
        let options = Options::new();
        assert!(candidates(&rule, "class A { Object f() { long x = g(); return x; } }", &options).is_empty());
        assert!(candidates(&rule, "class A { int[] f() { int[] x = {1}; return x; } }", &options).is_empty());
    }

    #[test]
    fn abstains_on_other_uses_or_comments() {
        let rule = InlineLocalBeforeReturn::new();
        let options = Options::new();
        assert!(candidates(&rule, "class A { int f() { int x = g(); h(x); return x; } }", &options).is_empty());
        assert!(candidates(&rule, "class A { int f() { int x = g(); return x + 1; } }", &options).is_empty());
        assert!(candidates(
            &rule,
            "class A { int f() { int x = g(); // keep\n return x; } }",
            &options
        )
        .is_empty());
    }
}
