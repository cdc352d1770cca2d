//! `if (c) { return true; } else { return false; }` becomes `return c;`, and
//! the same for a pair of boolean assignments to one variable.

use crate::edit::Candidate;
use crate::render::{negate, operand, strip_parens};
use crate::rules::support::{
    enclosing_callable, expression_type, has_comments, same_tokens, single_statement,
};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

pub struct SimplifyBooleanIfElse {
    descriptor: RuleDescriptor,
}

impl SimplifyBooleanIfElse {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "simplify_boolean_if_else",
                "Replace if/else choosing between true and false with the condition",
                Shape::LocalReplace,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Return(bool),
    Assign { target: NodeId, value: bool },
}

fn boolean_literal(tree: &SyntaxTree, expr: NodeId) -> Option<bool> {
    match tree.kind(strip_parens(tree, expr)) {
        NodeKind::True => Some(true),
        NodeKind::False => Some(false),
        _ => None,
    }
}

/// Single-statement block producing a boolean literal.
fn branch(tree: &SyntaxTree, block: NodeId) -> Option<Branch> {
    if tree.kind(block) != NodeKind::Block {
        return None;
    }
    let stmt = single_statement(tree, block)?;
    match tree.kind(stmt) {
        NodeKind::ReturnStatement => {
            let value = tree.first_named_child(stmt)?;
            boolean_literal(tree, value).map(Branch::Return)
        }
        NodeKind::ExpressionStatement => {
            let assignment = tree.first_named_child(stmt)?;
            if tree.kind(assignment) != NodeKind::AssignmentExpression {
                return None;
            }
            let operator = tree.child_by_field(assignment, "operator")?;
            if tree.node(operator).grammar_kind != "=" {
                return None;
            }
            let target = tree.child_by_field(assignment, "left")?;
            let value = boolean_literal(tree, tree.child_by_field(assignment, "right")?)?;
            Some(Branch::Assign { target, value })
        }
        _ => None,
    }
}

/// `condition` is a primitive `boolean`, so using it as a value cannot turn
/// an unboxing `NullPointerException` into a `null` result.
fn yields_primitive_boolean(tree: &SyntaxTree, condition: NodeId) -> bool {
    let operator = || {
        tree.child_by_field(condition, "operator")
            .map(|op| tree.node(op).grammar_kind)
    };
    match tree.kind(condition) {
        NodeKind::True | NodeKind::False | NodeKind::InstanceofExpression => true,
        NodeKind::BinaryExpression => matches!(
            operator(),
            Some("==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" | "&" | "|" | "^")
        ),
        NodeKind::UnaryExpression => operator() == Some("!"),
        _ => expression_type(tree, condition).as_deref() == Some("boolean"),
    }
}

/// Whether the text `chosen(value)` emits is a primitive `boolean`. Negation
/// yields one unless it unwraps `!c` back to `c`.
fn emits_primitive(tree: &SyntaxTree, condition: NodeId, value: bool) -> bool {
    if value {
        return yields_primitive_boolean(tree, condition);
    }
    let unwrapped = (tree.kind(condition) == NodeKind::UnaryExpression)
        .then(|| tree.child_by_field(condition, "operator"))
        .flatten()
        .filter(|&op| tree.node(op).grammar_kind == "!")
        .and_then(|_| tree.child_by_field(condition, "operand"));
    unwrapped.is_none_or(|operand| yields_primitive_boolean(tree, strip_parens(tree, operand)))
}

/// The value lands in a primitive `boolean`, which unboxes like the
/// original condition did.
fn lands_in_primitive(tree: &SyntaxTree, stmt: NodeId, branch: Branch) -> bool {
    match branch {
        Branch::Return(_) => enclosing_callable(tree, stmt)
            .filter(|&callable| tree.kind(callable) == NodeKind::MethodDeclaration)
            .and_then(|method| tree.child_by_field(method, "type"))
            .is_some_and(|ty| tree.text(ty) == "boolean"),
        Branch::Assign { target, .. } => expression_type(tree, target).as_deref() == Some("boolean"),
    }
}

impl Rule for SimplifyBooleanIfElse {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        let mut found = Vec::new();
        for id in tree.ids() {
            if tree.kind(id) != NodeKind::IfStatement || has_comments(tree, id) {
                continue;
            }
            let is_else_if = tree.parent(id).is_some_and(|parent| {
                tree.kind(parent) == NodeKind::IfStatement
                    && tree.node(id).field == Some("alternative")
            });
            if is_else_if {
                continue;
            }
            let (Some(condition), Some(then), Some(otherwise)) = (
                tree.child_by_field(id, "condition"),
                tree.child_by_field(id, "consequence"),
                tree.child_by_field(id, "alternative"),
            ) else {
                continue;
            };
            let (Some(first), Some(second)) = (branch(tree, then), branch(tree, otherwise)) else {
                continue;
            };
            let condition = strip_parens(tree, condition);
            let first_value = match first {
                Branch::Return(value) | Branch::Assign { value, .. } => value,
            };
            if !emits_primitive(tree, condition, first_value) && !lands_in_primitive(tree, id, first) {
                continue;
            }
            let chosen = |value: bool| {
                if value {
                    operand(tree, condition, 2)
                } else {
                    negate(tree, condition)
                }
            };
            let text = match (first, second) {
                (Branch::Return(a), Branch::Return(b)) if a != b => {
                    format!("return {};", chosen(a))
                }
                (
                    Branch::Assign { target, value: a },
                    Branch::Assign {
                        target: other,
                        value: b,
                    },
                ) if a != b && same_tokens(tree, target, other) => {
                    format!("{} = {};", tree.text(target), chosen(a))
                }
                _ => continue,
            };
            found.push(Candidate::replace_node(tree, id, text, "simplify boolean if/else"));
        }
        Ok(found)
    }
}
