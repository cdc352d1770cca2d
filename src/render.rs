//! Rendering of synthesized fragments.
//!
//! Rules copy untouched source text verbatim; only the glue they synthesize
//! (braces, operators, declarations moved to a new indentation level) goes
//! through these helpers. [`tidy`] is the optional reformat pass applied to
//! synthesized fragments after splicing.

use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// Indentation and line-break conventions of one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    pub indent_unit: String,
    pub newline: &'static str,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            indent_unit: "    ".to_string(),
            newline: "\n",
        }
    }
}

impl Style {
    /// Infer the indentation unit from the source: tabs when any line is
    /// tab-indented, otherwise the smallest positive run of leading spaces.
    pub fn detect(source: &str) -> Self {
        let newline = if source.contains("\r\n") { "\r\n" } else { "\n" };
        let mut smallest: Option<usize> = None;
        for line in source.lines() {
            if line.trim().is_empty() || line.trim_start().starts_with('*') {
                continue;
            }
            if line.starts_with('\t') {
                return Self {
                    indent_unit: "\t".to_string(),
                    newline,
                };
            }
            let spaces = line.len() - line.trim_start_matches(' ').len();
            if spaces > 0 {
                smallest = Some(smallest.map_or(spaces, |current| current.min(spaces)));
            }
        }
        Self {
            indent_unit: " ".repeat(smallest.unwrap_or(4)),
            newline,
        }
    }

    /// Explicit `engine.indent` setting: `"tab"`, a width, or `"auto"`.
    pub fn from_setting(setting: Option<IndentSetting>, source: &str) -> Self {
        let detected = Self::detect(source);
        match setting {
            None | Some(IndentSetting::Auto) => detected,
            Some(IndentSetting::Tab) => Self {
                indent_unit: "\t".to_string(),
                ..detected
            },
            Some(IndentSetting::Spaces(width)) => Self {
                indent_unit: " ".repeat(width),
                ..detected
            },
        }
    }

    pub fn deeper(&self, indent: &str) -> String {
        format!("{indent}{}", self.indent_unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentSetting {
    Auto,
    Tab,
    Spaces(usize),
}

impl IndentSetting {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "auto" => Some(IndentSetting::Auto),
            "tab" | "\t" => Some(IndentSetting::Tab),
            other => other
                .parse::<usize>()
                .ok()
                .filter(|width| (1..=16).contains(width))
                .map(IndentSetting::Spaces),
        }
    }
}

/// Shift every line after the first from `from` indentation to `to`.
pub fn reindent(text: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            out.push('\n');
            match line.strip_prefix(from) {
                Some(rest) => {
                    out.push_str(to);
                    out.push_str(rest);
                }
                None => out.push_str(line),
            }
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Trim trailing whitespace on every line of a synthesized fragment.
///
/// A whitespace-only last line is indentation for the text that follows the
/// fragment and is kept.
pub fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let lines: Vec<&str> = text.split('\n').collect();
    let last = lines.len() - 1;
    for (index, line) in lines.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        if index == last && index > 0 && line.trim().is_empty() {
            out.push_str(line);
            continue;
        }
        let (body, cr) = match line.strip_suffix('\r') {
            Some(body) => (body, "\r"),
            None => (*line, ""),
        };
        out.push_str(body.trim_end_matches([' ', '\t']));
        out.push_str(cr);
    }
    out
}

/// Java operator precedence of an expression node; higher binds tighter.
pub fn precedence(tree: &SyntaxTree, expr: NodeId) -> u8 {
    match tree.kind(expr) {
        NodeKind::AssignmentExpression | NodeKind::LambdaExpression => 1,
        NodeKind::TernaryExpression => 2,
        NodeKind::BinaryExpression => tree
            .child_by_field(expr, "operator")
            .map_or(0, |op| binary_precedence(tree.node(op).grammar_kind)),
        NodeKind::InstanceofExpression => 9,
        NodeKind::UnaryExpression | NodeKind::CastExpression => 13,
        NodeKind::UpdateExpression => 14,
        kind if kind.is_primary() => 15,
        _ => 0,
    }
}

pub fn binary_precedence(operator: &str) -> u8 {
    match operator {
        "||" => 3,
        "&&" => 4,
        "|" => 5,
        "^" => 6,
        "&" => 7,
        "==" | "!=" => 8,
        "<" | ">" | "<=" | ">=" => 9,
        "<<" | ">>" | ">>>" => 10,
        "+" | "-" => 11,
        "*" | "/" | "%" => 12,
        _ => 0,
    }
}

/// Source text of `expr`, parenthesized when it binds looser than `min`.
pub fn operand(tree: &SyntaxTree, expr: NodeId, min: u8) -> String {
    let text = tree.text(expr);
    if precedence(tree, expr) < min {
        format!("({text})")
    } else {
        text.to_string()
    }
}

/// Innermost expression inside any number of redundant parentheses.
pub fn strip_parens(tree: &SyntaxTree, mut expr: NodeId) -> NodeId {
    while tree.kind(expr) == NodeKind::ParenthesizedExpression {
        match tree.first_named_child(expr) {
            Some(inner) => expr = inner,
            None => break,
        }
    }
    expr
}

/// Logical negation of a boolean expression.
///
/// Only rewrites that hold for every operand (including NaN) are used:
/// `!x` unwraps, `==`/`!=` flip, boolean literals flip. Anything else is
/// prefixed with `!`.
pub fn negate(tree: &SyntaxTree, expr: NodeId) -> String {
    let inner = strip_parens(tree, expr);
    match tree.kind(inner) {
        NodeKind::True => return "false".to_string(),
        NodeKind::False => return "true".to_string(),
        NodeKind::UnaryExpression => {
            let is_not = tree
                .child_by_field(inner, "operator")
                .is_some_and(|op| tree.node(op).grammar_kind == "!");
            if let (true, Some(operand_id)) = (is_not, tree.child_by_field(inner, "operand")) {
                return operand(tree, operand_id, 3);
            }
        }
        NodeKind::BinaryExpression => {
            if let (Some(left), Some(op), Some(right)) = (
                tree.child_by_field(inner, "left"),
                tree.child_by_field(inner, "operator"),
                tree.child_by_field(inner, "right"),
            ) {
                let flipped = match tree.node(op).grammar_kind {
                    "==" => Some("!="),
                    "!=" => Some("=="),
                    _ => None,
                };
                if let Some(flipped) = flipped {
                    let between = &tree.source()[tree.span(left).end..tree.span(right).start];
                    let original = tree.node(op).grammar_kind;
                    return format!(
                        "{}{}{}",
                        tree.text(left),
                        between.replacen(original, flipped, 1),
                        tree.text(right)
                    );
                }
            }
        }
        _ => {}
    }
    format!("!{}", operand(tree, inner, 13))
}

/// `a || b` with operands parenthesized as needed.
pub fn join_or(tree: &SyntaxTree, left: NodeId, right: NodeId) -> String {
    format!("{} || {}", operand(tree, left, 3), operand(tree, right, 4))
}
