//! Turn a private field that only one method or constructor uses into a local
//! variable of that member.
//!
//! Two forms are recognized. A field with a constant initializer that is never
//! written becomes `T name = init;` right before the first statement using it.
//! A field without an initializer whose first use is a top-level `name = e;`
//! statement has that assignment turned into the declaration. The field's
//! comments travel with it and are re-emitted above the new local.

use crate::edit::{Candidate, Rewrite};
use crate::render::reindent;
use crate::rules::support::{child_containing, crosses_nested_scope, has_unresolved_member_access, is_constant};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{Comment, NodeId, NodeKind, Span, SymbolId, SyntaxTree};

pub struct HoistSingleUseField {
    descriptor: RuleDescriptor,
}

impl HoistSingleUseField {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "hoist_single_use_field",
                "Convert private fields used by a single method into locals",
                Shape::CrossCutting,
            ),
        }
    }
}

enum Form {
    /// Insert the declaration before the statement holding the first use.
    Constant,
    /// The first use is the left side of `name = e;`.
    Assignment { target: NodeId },
}

struct Hoist {
    field: NodeId,
    declarator: NodeId,
    symbol: SymbolId,
    member: NodeId,
    statement: NodeId,
    form: Form,
}

fn single_declarator(tree: &SyntaxTree, field: NodeId) -> Option<NodeId> {
    let mut declarators = tree.children_by_field(field, "declarator");
    let first = declarators.next()?;
    declarators.next().is_none().then_some(first)
}

/// The member's body calls a method with the member's own name.
fn may_recurse(tree: &SyntaxTree, member: NodeId) -> bool {
    let Some(name) = tree.child_by_field(member, "name").map(|name| tree.text(name)) else {
        return true;
    };
    tree.descendants(member).any(|id| {
        tree.kind(id) == NodeKind::MethodInvocation
            && tree
                .child_by_field(id, "name")
                .is_some_and(|callee| tree.text(callee) == name)
    })
}

fn is_this_access(tree: &SyntaxTree, access: NodeId) -> bool {
    tree.kind(access) == NodeKind::FieldAccess
        && tree
            .child_by_field(access, "object")
            .is_some_and(|object| tree.kind(object) == NodeKind::This)
}

fn assignment_target(tree: &SyntaxTree, statement: NodeId, first: NodeId, references: &[NodeId]) -> Option<NodeId> {
    if tree.kind(statement) != NodeKind::ExpressionStatement {
        return None;
    }
    let assignment = tree.first_named_child(statement)?;
    if tree.kind(assignment) != NodeKind::AssignmentExpression
        || tree.node(tree.child_by_field(assignment, "operator")?).grammar_kind != "="
    {
        return None;
    }
    let left = tree.child_by_field(assignment, "left")?;
    let right = tree.child_by_field(assignment, "right")?;
    let targets_field = left == first || (is_this_access(tree, left) && tree.is_ancestor(left, first));
    let reads_itself = references.iter().any(|&r| tree.is_ancestor(right, r));
    (targets_field && !reads_itself).then_some(left)
}

fn analyze(tree: &SyntaxTree, field: NodeId) -> Option<Hoist> {
    if !tree.has_modifier(field, "private") || tree.has_annotation(field) {
        return None;
    }
    let declarator = single_declarator(tree, field)?;
    let symbols = tree.symbols();
    let symbol = symbols.declared_by(declarator)?;
    let name = symbols.symbol(symbol).name.as_str();
    let references = symbols.references(symbol);
    let &first = references.first()?;
    if has_unresolved_member_access(tree, name) {
        return None;
    }

    let members = tree.parent(field)?;
    let member = child_containing(tree, members, first)?;
    if !matches!(
        tree.kind(member),
        NodeKind::MethodDeclaration | NodeKind::ConstructorDeclaration
    ) {
        return None;
    }
    let escapes = references
        .iter()
        .any(|&r| !tree.is_ancestor(member, r) || crosses_nested_scope(tree, r, member));
    if escapes || symbols.names_declared_within(tree, member).contains(name) {
        return None;
    }

    let body = tree.child_by_field(member, "body")?;
    let statement = child_containing(tree, body, first)?;
    if tree.kind(statement) == NodeKind::ExplicitConstructorInvocation {
        return None;
    }

    let form = match tree.child_by_field(declarator, "value") {
        Some(value) => {
            let written = references.iter().any(|&r| symbols.is_write(tree, r));
            if !is_constant(tree, value) || written {
                return None;
            }
            Form::Constant
        }
        None => {
            let target = assignment_target(tree, statement, first, references)?;
            if may_recurse(tree, member) {
                return None;
            }
            Form::Assignment { target }
        }
    };
    Some(Hoist {
        field,
        declarator,
        symbol,
        member,
        statement,
        form,
    })
}

/// Lines of the field and its leading comments, plus a blank line left
/// behind right after an opening brace.
fn field_removal(tree: &SyntaxTree, field: NodeId, leading: &[&Comment]) -> Option<Span> {
    let source = tree.source();
    let mut span = tree.deletion_span(field);
    if let Some(first) = leading.first() {
        let line_start = tree.line_start(first.span.start);
        let whole_lines = span.start == tree.line_start(tree.span(field).start);
        if !whole_lines || !source[line_start..first.span.start].trim().is_empty() {
            return None;
        }
        span.start = line_start;
    }
    let rest = &source[span.end..];
    if let Some(blank) = rest.find('\n').filter(|&n| rest[..n].trim().is_empty()) {
        if source[..span.start].trim_end().ends_with('{') && span.end == tree.line_start(span.end) {
            span.end += blank + 1;
        }
    }
    Some(span)
}

fn hoist(cx: &MatchContext<'_>, plan: &Hoist) -> Option<Candidate> {
    let tree = cx.tree;
    let symbol = tree.symbols().symbol(plan.symbol);
    let name = symbol.name.as_str();
    if !tree.starts_line(plan.statement) {
        return None;
    }
    let leading: Vec<&Comment> = tree.comments().leading_of(plan.field).collect();
    let trailing: Vec<&Comment> = tree.comments().trailing_of(plan.field).collect();

    let from = tree.indent_at(tree.span(plan.field).start);
    let indent = tree.indent_at(tree.span(plan.statement).start);
    let separator = format!("{}{indent}", cx.style.newline);
    let final_keyword = if tree.has_modifier(plan.field, "final") { "final " } else { "" };
    let ty = tree.text(tree.child_by_field(plan.field, "type")?);

    let mut comments = String::new();
    for comment in &leading {
        comments.push_str(&reindent(comment.text(tree), from, indent));
        comments.push_str(&separator);
    }

    let introduced = match plan.form {
        Form::Constant => {
            let mut text = comments;
            text.push_str(&format!(
                "{final_keyword}{ty} {};",
                reindent(tree.text(plan.declarator), from, indent)
            ));
            for comment in &trailing {
                text.push(' ');
                text.push_str(comment.text(tree));
            }
            text.push_str(&separator);
            Rewrite::insert(tree.span(plan.statement).start, text)
        }
        Form::Assignment { target } => {
            let mut text = comments;
            for comment in &trailing {
                text.push_str(comment.text(tree));
                text.push_str(&separator);
            }
            text.push_str(&format!("{final_keyword}{ty} {name}"));
            Rewrite::replace(tree, tree.span(target), text)
        }
    };

    let removal = field_removal(tree, plan.field, &leading)?;
    let member_name = tree
        .child_by_field(plan.member, "name")
        .map_or("constructor", |n| tree.text(n));
    let mut candidate = Candidate::new(
        plan.field,
        Rewrite::delete(tree, removal),
        format!("hoist field {name} into {member_name}"),
    )
    .with_rewrite(introduced)
    .with_conflict_key(tree.span(plan.member));

    let assigned = match plan.form {
        Form::Assignment { target } => Some(target),
        Form::Constant => None,
    };
    for &reference in tree.symbols().references(plan.symbol) {
        let Some(access) = tree.parent(reference) else {
            continue;
        };
        if is_this_access(tree, access) && Some(access) != assigned {
            candidate = candidate.with_rewrite(Rewrite::replace(tree, tree.span(access), name));
        }
    }
    Some(candidate)
}

impl Rule for HoistSingleUseField {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        Ok(tree
            .ids()
            .filter(|&id| tree.kind(id) == NodeKind::FieldDeclaration)
            .filter_map(|id| analyze(tree, id))
            .filter_map(|plan| hoist(cx, &plan))
            .collect())
    }
}
