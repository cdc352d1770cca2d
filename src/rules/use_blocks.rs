//! Wrap single-statement bodies of control statements in braces.
//!
//! The opening brace goes right after the header and the closing brace on its
//! own line at the header's indentation. `else if` chains stay as they are.
//! Nested bodies are wrapped innermost first, one level per pass.

use crate::edit::{Candidate, Rewrite};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{NodeId, NodeKind, Span, SyntaxTree};

pub struct UseBlocks {
    descriptor: RuleDescriptor,
}

impl UseBlocks {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "use_blocks",
                "Always use blocks for if, else, for, while and do bodies",
                Shape::LocalReplace,
            )
            .with_alias("cleanup.always_use_blocks"),
        }
    }
}

/// Non-block statement in the body position of a control statement.
fn is_unbraced_body(tree: &SyntaxTree, id: NodeId) -> bool {
    let node = tree.node(id);
    if !node.named || node.kind == NodeKind::Block || node.kind.is_comment() {
        return false;
    }
    let Some(parent) = node.parent else {
        return false;
    };
    match (tree.kind(parent), node.field) {
        (NodeKind::IfStatement, Some("consequence")) => true,
        (NodeKind::IfStatement, Some("alternative")) => node.kind != NodeKind::IfStatement,
        (
            NodeKind::ForStatement
            | NodeKind::EnhancedForStatement
            | NodeKind::WhileStatement
            | NodeKind::DoStatement,
            Some("body"),
        ) => true,
        _ => false,
    }
}

/// Non-comment siblings (tokens included) right before and after `id`.
fn neighbours(tree: &SyntaxTree, id: NodeId) -> (Option<NodeId>, Option<NodeId>) {
    let Some(parent) = tree.parent(id) else {
        return (None, None);
    };
    let siblings: Vec<NodeId> = tree
        .children(parent)
        .iter()
        .copied()
        .filter(|&child| !tree.kind(child).is_comment())
        .collect();
    let Some(index) = siblings.iter().position(|&child| child == id) else {
        return (None, None);
    };
    let before = index.checked_sub(1).map(|i| siblings[i]);
    (before, siblings.get(index + 1).copied())
}

fn wrap(cx: &MatchContext<'_>, body: NodeId) -> Option<Candidate> {
    let tree = cx.tree;
    let source = tree.source();
    let newline = cx.style.newline;
    let (before, after) = neighbours(tree, body);
    let header_end = tree.span(before?).end;
    let body_span = tree.span_with_trailing_comments(body);

    let open_gap = Span::new(header_end, tree.span(body).start);
    if tree.comments().within(open_gap).next().is_some() {
        return None;
    }
    let indent = tree.indent_at(header_end).to_string();
    let gap_text = tree.slice(open_gap);
    let open_text = if gap_text.contains('\n') {
        format!(" {{{gap_text}")
    } else {
        format!(" {{{newline}{}", cx.style.deeper(&indent))
    };

    let close = match after {
        Some(next) => {
            let gap = Span::new(body_span.end, tree.span(next).start);
            if !source[gap.start..gap.end].trim().is_empty() {
                return None;
            }
            Rewrite::replace(tree, gap, format!("{newline}{indent}}} "))
        }
        None => Rewrite::insert(body_span.end, format!("{newline}{indent}}}")),
    };

    let owner = tree.parent(body)?;
    let keyword = match tree.kind(owner) {
        NodeKind::IfStatement if tree.node(body).field == Some("alternative") => "else",
        NodeKind::IfStatement => "if",
        NodeKind::ForStatement | NodeKind::EnhancedForStatement => "for",
        NodeKind::WhileStatement => "while",
        _ => "do",
    };
    Some(
        Candidate::new(body, Rewrite::replace(tree, open_gap, open_text), format!("use block for {keyword} body"))
            .with_rewrite(close),
    )
}

impl Rule for UseBlocks {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        Ok(tree
            .ids()
            .filter(|&id| is_unbraced_body(tree, id))
            .filter(|&id| !tree.descendants(id).any(|inner| is_unbraced_body(tree, inner)))
            .filter_map(|id| wrap(cx, id))
            .collect())
    }
}
