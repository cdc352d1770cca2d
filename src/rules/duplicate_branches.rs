//! Merge branches with identical bodies into one condition joined by `||`.
//!
//! Two shapes qualify:
//!
//! * `if (a) B else if (b) B ...` becomes `if (a || b) B ...`.
//! * `if (a) B` directly followed by `if (b) B`, neither with an else, where
//!   `B` never completes normally, becomes `if (a || b) B`.
//!
//! In both cases `b` is only evaluated when `a` is false, as before. Chains
//! longer than two collapse one pair per pass, outermost first. Conditions
//! declaring pattern variables are left alone: `||` binds none of them.

use crate::edit::{Candidate, Rewrite};
use crate::render::{join_or, strip_parens};
use crate::rules::support::{ends_in_jump, same_tokens};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{NodeId, NodeKind, Span, SyntaxTree};

pub struct MergeDuplicateBranches {
    descriptor: RuleDescriptor,
}

impl MergeDuplicateBranches {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "merge_duplicate_branches",
                "Merge conditions of branches with identical bodies",
                Shape::StatementList,
            ),
        }
    }
}

struct Pair {
    /// Statement whose condition is extended.
    first: NodeId,
    /// Statement whose body is dropped.
    second: NodeId,
    /// End of the replaced region.
    end: usize,
}

fn parts(tree: &SyntaxTree, stmt: NodeId) -> Option<(NodeId, NodeId)> {
    if tree.kind(stmt) != NodeKind::IfStatement {
        return None;
    }
    Some((
        tree.child_by_field(stmt, "condition")?,
        tree.child_by_field(stmt, "consequence")?,
    ))
}

/// `o instanceof T t` or a record pattern somewhere in `condition`.
fn binds_pattern(tree: &SyntaxTree, condition: NodeId) -> bool {
    std::iter::once(condition)
        .chain(tree.descendants(condition))
        .any(|node| {
            let grammar_kind = tree.node(node).grammar_kind;
            grammar_kind.ends_with("_pattern")
                || (tree.kind(node) == NodeKind::InstanceofExpression
                    && (tree.child_by_field(node, "name").is_some()
                        || tree.child_by_field(node, "pattern").is_some()))
        })
}

/// Both statements are ifs whose conditions can be joined.
fn joinable(tree: &SyntaxTree, first: NodeId, second: NodeId) -> bool {
    match (parts(tree, first), parts(tree, second)) {
        (Some((a, _)), Some((b, _))) => !binds_pattern(tree, a) && !binds_pattern(tree, b),
        _ => false,
    }
}

/// `if (a) B else if (b) B`.
fn else_if_pair(tree: &SyntaxTree, stmt: NodeId) -> Option<Pair> {
    let (_, body) = parts(tree, stmt)?;
    let inner = tree.child_by_field(stmt, "alternative")?;
    let (_, inner_body) = parts(tree, inner)?;
    (same_tokens(tree, body, inner_body) && joinable(tree, stmt, inner)).then(|| Pair {
        first: stmt,
        second: inner,
        end: tree.span(inner_body).end,
    })
}

/// `if (a) B` followed by `if (b) B`, `B` ending in a jump.
fn sibling_pair(tree: &SyntaxTree, stmt: NodeId) -> Option<Pair> {
    if !tree
        .parent(stmt)
        .is_some_and(|parent| tree.kind(parent).is_statement_list())
    {
        return None;
    }
    let (_, body) = parts(tree, stmt)?;
    let next = tree.next_sibling(stmt)?;
    let (_, next_body) = parts(tree, next)?;
    let no_else = tree.child_by_field(stmt, "alternative").is_none()
        && tree.child_by_field(next, "alternative").is_none();
    let mergeable = no_else
        && ends_in_jump(tree, body)
        && same_tokens(tree, body, next_body)
        && joinable(tree, stmt, next);
    mergeable.then(|| Pair {
        first: stmt,
        second: next,
        end: tree.span(next).end,
    })
}

fn merge(tree: &SyntaxTree, pair: &Pair) -> Option<Candidate> {
    let (condition, body) = parts(tree, pair.first)?;
    let (other_condition, _) = parts(tree, pair.second)?;

    let dropped = Span::new(tree.span(body).end, pair.end);
    if tree.comments().within(dropped).next().is_some() {
        return None;
    }
    let joined = join_or(
        tree,
        strip_parens(tree, condition),
        strip_parens(tree, other_condition),
    );
    let kept = &tree.source()[tree.span(condition).end..tree.span(body).end];
    let span = Span::new(tree.span(condition).start, pair.end);
    Some(Candidate::new(
        pair.first,
        Rewrite::replace(tree, span, format!("({joined}){kept}")),
        "merge duplicate branches",
    ))
}

impl Rule for MergeDuplicateBranches {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        let mut found = Vec::new();
        for id in tree.ids() {
            if tree.kind(id) != NodeKind::IfStatement {
                continue;
            }
            // The enclosing pair goes first; this one is reconsidered next pass.
            let claimed_by_outer = tree
                .parent(id)
                .is_some_and(|parent| else_if_pair(tree, parent).is_some_and(|p| p.second == id))
                || tree
                    .prev_sibling(id)
                    .is_some_and(|prev| sibling_pair(tree, prev).is_some_and(|p| p.second == id));
            if claimed_by_outer {
                continue;
            }
            let pair = else_if_pair(tree, id).or_else(|| sibling_pair(tree, id));
            if let Some(candidate) = pair.and_then(|pair| merge(tree, &pair)) {
                found.push(candidate);
            }
        }
        Ok(found)
    }
}
