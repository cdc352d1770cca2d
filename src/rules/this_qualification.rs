//! Normalize `this.` qualification of field accesses.
//!
//! In `if_necessary` mode `this.x` loses its qualifier wherever the bare name
//! would resolve to the same field. In `always` mode unqualified instance
//! field references gain one. Static fields are optionally qualified with
//! their declaring type.

use crate::edit::Candidate;
use crate::rules::support::{has_comments, is_static_context, type_of_body};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape, SubOption};
use crate::syntax::{NodeId, NodeKind, Symbol, SyntaxTree};

pub struct ThisQualification {
    descriptor: RuleDescriptor,
}

impl ThisQualification {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "this_qualification",
                "Use this. for field accesses only where required, or always",
                Shape::LocalReplace,
            )
            .with_sub_option(SubOption::choice("mode", &["if_necessary", "always"]))
            .with_sub_option(SubOption::flag("qualify_static_fields", false)),
        }
    }
}

fn unqualify(tree: &SyntaxTree, access: NodeId) -> Option<Candidate> {
    let object = tree.child_by_field(access, "object")?;
    let field = tree.child_by_field(access, "field")?;
    if tree.kind(object) != NodeKind::This || has_comments(tree, access) {
        return None;
    }
    let symbol = tree.symbols().binding(field)?;
    let name = tree.text(field);
    if tree.symbols().resolve(tree, access, name) != Some(symbol) {
        return None;
    }
    Some(Candidate::replace_node(
        tree,
        access,
        name,
        format!("remove this. from {name}"),
    ))
}

fn is_unqualified_reference(tree: &SyntaxTree, id: NodeId) -> bool {
    tree.kind(id) == NodeKind::Identifier
        && tree.node(id).field != Some("field")
        && tree.symbols().binding(id).is_some()
}

/// The reference sits directly in the field's own type, not in a nested or
/// anonymous one.
fn in_declaring_type(tree: &SyntaxTree, id: NodeId, symbol: &Symbol) -> bool {
    tree.enclosing(id, NodeKind::is_member_list) == Some(symbol.scope)
}

fn inside_constructor_call(tree: &SyntaxTree, id: NodeId) -> bool {
    tree.enclosing(id, |kind| kind == NodeKind::ExplicitConstructorInvocation)
        .is_some()
}

fn qualify_instance(tree: &SyntaxTree, id: NodeId) -> Option<Candidate> {
    let symbol = tree.symbols().symbol(tree.symbols().binding(id)?);
    if !symbol.is_field()
        || symbol.is_static_field()
        || !in_declaring_type(tree, id, symbol)
        || is_static_context(tree, id)
        || inside_constructor_call(tree, id)
    {
        return None;
    }
    let name = tree.text(id);
    Some(Candidate::replace_node(
        tree,
        id,
        format!("this.{name}"),
        format!("qualify {name} with this."),
    ))
}

fn qualify_static(tree: &SyntaxTree, id: NodeId) -> Option<Candidate> {
    let symbol = tree.symbols().symbol(tree.symbols().binding(id)?);
    if !symbol.is_static_field()
        || !in_declaring_type(tree, id, symbol)
        || tree.symbols().is_write(tree, id)
    {
        return None;
    }
    let owner = type_of_body(tree, symbol.scope)?;
    let owner_name = tree.text(tree.child_by_field(owner, "name")?);
    let name = tree.text(id);
    Some(Candidate::replace_node(
        tree,
        id,
        format!("{owner_name}.{name}"),
        format!("qualify {name} with {owner_name}."),
    ))
}

impl Rule for ThisQualification {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        let always = cx.settings.choice("mode") == "always";
        let qualify_statics = cx.settings.flag("qualify_static_fields");
        let mut found = Vec::new();
        for id in tree.ids() {
            let candidate = match tree.kind(id) {
                NodeKind::FieldAccess if !always => unqualify(tree, id),
                NodeKind::Identifier if is_unqualified_reference(tree, id) => {
                    let instance = if always { qualify_instance(tree, id) } else { None };
                    instance.or_else(|| qualify_statics.then(|| qualify_static(tree, id)).flatten())
                }
                _ => None,
            };
            found.extend(candidate);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::rules::test_support::rewrite_once;
    use pretty_assertions::assert_eq;

    fn run(source: &str, options: &Options) -> String {
        rewrite_once(&ThisQualification::new(), source, options)
    }

    #[test]
    fn removes_unneeded_this() {
        let source = "class A { int x; int f() { return this.x; } }";
        assert_eq!(
            run(source, &Options::new()),
            "class A { int x; int f() { return x; } }"
        );
    }

    #[test]
    fn keeps_this_when_shadowed() {
        let source = "class A { int x; A(int x) { this.x = x; } int f() { int x = 2; return this.x + x; } }";
        assert_eq!(run(source, &Options::new()), source);
    }

    #[test]
    fn always_mode_qualifies_instance_fields() {
        let options = Options::new().with("cleanup.this_qualification.mode", "always");
        let source = "class A { int x; static int s; int f(int y) { return x + y + s; } static int g() { return s; } }";
        assert_eq!(
            run(source, &options),
            "class A { int x; static int s; int f(int y) { return this.x + y + s; } static int g() { return s; } }"
        );
    }

    #[test]
    fn always_mode_skips_outer_fields_from_anonymous_classes() {
        let options = Options::new().with("cleanup.this_qualification.mode", "always");
        let source = "class A { int x; Runnable r() { return new Runnable() { public void run() { g(x); } }; } }";
        assert_eq!(run(source, &options), source);
    }

    #[test]
    fn qualifies_static_reads_with_type_name() {
        let options = Options::new().with("cleanup.this_qualification.qualify_static_fields", true);
        let source = "class A { static int s; static { s = 1; } int f() { return s; } }";
        assert_eq!(
            run(source, &options),
            "class A { static int s; static { s = 1; } int f() { return A.s; } }"
        );
    }
}
