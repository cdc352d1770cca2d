//! Remove casts whose operand already has exactly the cast type.
//!
//! Only the innermost of nested removable casts is proposed; the enclosing
//! one is reconsidered on the next pass.

use crate::edit::{Candidate, Rewrite};
use crate::render::{precedence, strip_parens};
use crate::rules::support::expression_type;
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{normalize_type, NodeId, NodeKind, SyntaxTree};

pub struct UnnecessaryCast {
    descriptor: RuleDescriptor,
}

impl UnnecessaryCast {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "unnecessary_cast",
                "Remove casts to the type the operand already has",
                Shape::LocalReplace,
            ),
        }
    }
}

/// Cast whose operand already has the cast type.
fn is_redundant(tree: &SyntaxTree, cast: NodeId) -> bool {
    let (Some(ty), Some(value)) = (tree.child_by_field(cast, "type"), tree.child_by_field(cast, "value")) else {
        return false;
    };
    expression_type(tree, strip_parens(tree, value)).as_deref() == Some(normalize_type(tree.text(ty)).as_str())
}

impl Rule for UnnecessaryCast {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        let mut found = Vec::new();
        let redundant: Vec<NodeId> = tree
            .ids()
            .filter(|&id| tree.kind(id) == NodeKind::CastExpression && is_redundant(tree, id))
            .collect();
        for &id in &redundant {
            if redundant.iter().any(|&inner| tree.is_ancestor(id, inner)) {
                continue;
            }
            let (Some(ty), Some(value)) =
                (tree.child_by_field(id, "type"), tree.child_by_field(id, "value"))
            else {
                continue;
            };
            let cast_type = normalize_type(tree.text(ty));
            let operand = strip_parens(tree, value);

            // Parentheses that only existed for the cast go with it.
            let operand_precedence = precedence(tree, operand);
            let mut target = id;
            while operand_precedence >= 15 {
                match tree.parent(target) {
                    Some(parent) if tree.kind(parent) == NodeKind::ParenthesizedExpression => {
                        target = parent;
                    }
                    _ => break,
                }
            }

            let mut text = if operand_precedence >= 13 {
                tree.text(operand).to_string()
            } else {
                format!("({})", tree.text(operand))
            };
            let span = tree.span(target);
            let before = tree.source()[..span.start].chars().next_back();
            if matches!((before, text.chars().next()), (Some('-'), Some('-')) | (Some('+'), Some('+'))) {
                text.insert(0, ' ');
            }
            found.push(Candidate::new(
                target,
                Rewrite::replace(tree, span, text),
                format!("remove cast to {cast_type}"),
            ));
        }
        Ok(found)
    }
}
