//! User-defined pattern rules.
//!
//! A `[[template]]` entry pairs an ast-grep pattern with a rewrite. `$NAME`
//! matches one node and `$$$NAME` any run of nodes; both are substituted into
//! the rewrite with their original source text. Only innermost matches are
//! proposed, and a rewrite that would not parse in the matched position is
//! skipped.

use crate::cache;
use crate::config::TemplateDefinition;
use crate::edit::{Candidate, Rewrite};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{validate_snippet, NodeId, NodeKind, SnippetCategory, Span, SyntaxTree};
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::{AstGrep, NodeMatch};
use ast_grep_language::SupportLang;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template id '{id}' must be non-empty lowercase letters, digits or '_'")]
    InvalidId { id: String },

    #[error("template '{id}' has a pattern that is not a Java expression, statement or member")]
    InvalidPattern { id: String },

    #[error("template '{id}' rewrite uses ${name}, which the pattern never captures")]
    UnboundMetavariable { id: String, name: String },
}

/// Metavariable occurrence in a pattern or rewrite.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Metavar {
    name: String,
    multi: bool,
}

/// `$NAME` and `$$$NAME` occurrences; `$_` and lowercase names are not captures.
fn metavariables(text: &str) -> BTreeSet<Metavar> {
    let bytes = text.as_bytes();
    let mut found = BTreeSet::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let multi = text[i..].starts_with("$$$");
        let start = i + if multi { 3 } else { 1 };
        let len = text[start..]
            .bytes()
            .take_while(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || *b == b'_')
            .count();
        let name = &text[start..start + len];
        if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            found.insert(Metavar {
                name: name.to_string(),
                multi,
            });
        }
        i = start + len.max(1);
    }
    found
}

fn parses_as_any(snippet: &str) -> bool {
    [
        SnippetCategory::Expression,
        SnippetCategory::Statement,
        SnippetCategory::Member,
    ]
    .into_iter()
    .any(|category| validate_snippet(snippet, category).is_ok())
}

pub struct TemplateRule {
    descriptor: RuleDescriptor,
    pattern: String,
    rewrite: String,
    kind: Option<String>,
    label: String,
    captures: BTreeSet<Metavar>,
}

impl TemplateRule {
    pub fn new(definition: &TemplateDefinition) -> Result<Self, TemplateError> {
        let id = definition.id.trim();
        let valid_id = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid_id {
            return Err(TemplateError::InvalidId { id: id.to_string() });
        }
        if definition.pattern.trim().is_empty() || !parses_as_any(&definition.pattern) {
            return Err(TemplateError::InvalidPattern { id: id.to_string() });
        }
        let captures = metavariables(&definition.pattern);
        for used in metavariables(&definition.rewrite) {
            if !captures.contains(&used) {
                return Err(TemplateError::UnboundMetavariable {
                    id: id.to_string(),
                    name: used.name,
                });
            }
        }
        let summary = definition
            .summary
            .clone()
            .unwrap_or_else(|| format!("Rewrite `{}` to `{}`", definition.pattern, definition.rewrite));
        Ok(Self {
            descriptor: RuleDescriptor::new(format!("template.{id}"), summary, Shape::LocalReplace),
            pattern: definition.pattern.clone(),
            rewrite: definition.rewrite.clone(),
            kind: definition.kind.clone(),
            label: definition
                .label
                .clone()
                .unwrap_or_else(|| format!("apply template {id}")),
            captures,
        })
    }

    /// Rewrite text with every capture substituted, longest names first so
    /// `$AB` is never clobbered by `$A`.
    fn instantiate(&self, source: &str, m: &NodeMatch<StrDoc<SupportLang>>) -> Option<String> {
        let env = m.get_env();
        let mut ordered: Vec<&Metavar> = self.captures.iter().collect();
        ordered.sort_by(|a, b| b.multi.cmp(&a.multi).then(b.name.len().cmp(&a.name.len())));

        let mut text = self.rewrite.clone();
        for var in ordered {
            let value = if var.multi {
                let nodes = env.get_multiple_matches(&var.name);
                match (nodes.first(), nodes.last()) {
                    (Some(first), Some(last)) => &source[first.range().start..last.range().end],
                    _ => "",
                }
            } else {
                let node = env.get_match(&var.name)?;
                &source[node.range()]
            };
            let placeholder = if var.multi {
                format!("$$${}", var.name)
            } else {
                format!("${}", var.name)
            };
            text = text.replace(&placeholder, value);
        }
        Some(text)
    }
}

fn category(tree: &SyntaxTree, node: NodeId) -> SnippetCategory {
    let kind = tree.kind(node);
    if kind.is_statement() {
        SnippetCategory::Statement
    } else if kind.is_declaration() && kind != NodeKind::LocalVariableDeclaration {
        SnippetCategory::Member
    } else {
        SnippetCategory::Expression
    }
}

impl Rule for TemplateRule {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        let source = tree.source();
        let sg = AstGrep::new(source, SupportLang::Java);
        let pattern = cache::java_pattern(&self.pattern);
        let root = sg.root();

        let mut matches: Vec<(Span, String)> = Vec::new();
        for m in root.find_all(&pattern) {
            let node = m.get_node();
            if self.kind.as_deref().is_some_and(|kind| node.kind() != kind) {
                continue;
            }
            let range = node.range();
            let Some(text) = self.instantiate(source, &m) else {
                continue;
            };
            matches.push((Span::new(range.start, range.end), text));
        }

        let spans: Vec<Span> = matches.iter().map(|(span, _)| *span).collect();
        let mut found = Vec::new();
        for (span, text) in matches {
            let encloses_another = spans
                .iter()
                .any(|other| *other != span && span.contains(*other));
            if encloses_another || tree.slice(span) == text {
                continue;
            }
            let anchor = tree.smallest_covering(span);
            if validate_snippet(&text, category(tree, anchor)).is_err() {
                tracing::debug!(rule = %self.descriptor.id, %span, "rewrite does not parse, skipped");
                continue;
            }
            found.push(Candidate::new(
                anchor,
                Rewrite::replace(tree, span, text),
                self.label.clone(),
            ));
        }
        Ok(found)
    }
}
