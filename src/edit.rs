//! Proposed edits and edit sets.
//!
//! Every rewrite a rule proposes compiles down to one primitive: a verified
//! byte-span replacement ([`Rewrite`]). A [`Candidate`] groups the rewrites of
//! one detected opportunity (a primary replacement plus side-requests such as
//! an import insertion); [`ProposedEdit`] adds conflict keys, and [`EditSet`]
//! holds mutually non-overlapping edits that may be spliced in any order.

use crate::syntax::{NodeId, NodeKind, Span, SyntaxTree};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("before-text verification failed at {byte_start}..{byte_end}: found {found:?}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        found: String,
    },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in text of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("byte range [{byte_start}, {byte_end}) splits a UTF-8 character")]
    NotCharBoundary { byte_start: usize, byte_end: usize },

    #[error("rewrites overlap at {first} and {second}")]
    Overlap { first: Span, second: Span },

    #[error("candidate anchor {0:?} does not belong to the tree")]
    UnknownAnchor(NodeId),

    #[error("candidate has no labels")]
    MissingLabel,

    #[error("candidate has no rewrites")]
    NoRewrites,

    #[error("order of {given} entries does not cover {expected} rewrites")]
    BadPermutation { given: usize, expected: usize },
}

/// Byte-span replacement with before-text verification. Insertions use a
/// zero-width span.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Rewrite does nothing until spliced"]
pub struct Rewrite {
    pub span: Span,
    pub text: String,
    pub expected_before: EditVerification,
    /// Text was synthesized rather than copied, so the formatter may tidy it.
    pub synthesized: bool,
}

impl Rewrite {
    /// Replace `span` of `tree` with `text`, capturing the current text for verification.
    pub fn replace(tree: &SyntaxTree, span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
            expected_before: EditVerification::from_text(tree.slice(span)),
            synthesized: true,
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            span: Span::empty(at),
            text: text.into(),
            expected_before: EditVerification::ExactMatch(String::new()),
            synthesized: true,
        }
    }

    pub fn delete(tree: &SyntaxTree, span: Span) -> Self {
        Self::replace(tree, span, "")
    }

    pub fn verbatim(mut self) -> Self {
        self.synthesized = false;
        self
    }

    /// Check the rewrite against `source`, returning the text it replaces.
    pub fn validate<'a>(&self, source: &'a str) -> Result<&'a str, EditError> {
        let Span { start, end } = self.span;
        if start > end || end > source.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: start,
                byte_end: end,
                len: source.len(),
            });
        }
        if !source.is_char_boundary(start) || !source.is_char_boundary(end) {
            return Err(EditError::NotCharBoundary {
                byte_start: start,
                byte_end: end,
            });
        }
        let current = &source[start..end];
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: start,
                byte_end: end,
                found: current.to_string(),
            });
        }
        Ok(current)
    }

    pub fn delta(&self) -> isize {
        self.text.len() as isize - self.span.len() as isize
    }
}

/// How far a candidate's conflict key extends beyond its rewrite spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Widening {
    #[default]
    None,
    /// The statement or declaration enclosing the anchor.
    Statement,
    /// The statement list (block body) enclosing the anchor.
    StatementList,
    /// The method, constructor or field declaration enclosing the anchor.
    Declaration,
}

/// A single detected rewrite opportunity.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub anchor: NodeId,
    /// Primary rewrite first, then side-requests; all apply together or not at all.
    pub rewrites: Vec<Rewrite>,
    pub labels: Vec<String>,
    pub widening: Widening,
    pub extra_keys: Vec<Span>,
    /// Comments the rule may delete together with the code they annotate.
    pub droppable_comments: Vec<Span>,
}

impl Candidate {
    pub fn new(anchor: NodeId, rewrite: Rewrite, label: impl Into<String>) -> Self {
        Self {
            anchor,
            rewrites: vec![rewrite],
            labels: vec![label.into()],
            widening: Widening::None,
            extra_keys: Vec::new(),
            droppable_comments: Vec::new(),
        }
    }

    /// Replace the whole anchor node.
    pub fn replace_node(
        tree: &SyntaxTree,
        anchor: NodeId,
        text: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self::new(anchor, Rewrite::replace(tree, tree.span(anchor), text), label)
    }

    pub fn with_rewrite(mut self, rewrite: Rewrite) -> Self {
        self.rewrites.push(rewrite);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn widen(mut self, widening: Widening) -> Self {
        self.widening = widening;
        self
    }

    pub fn with_conflict_key(mut self, span: Span) -> Self {
        self.extra_keys.push(span);
        self
    }

    pub fn with_droppable_comment(mut self, span: Span) -> Self {
        self.droppable_comments.push(span);
        self
    }
}

/// A candidate accepted for composition, with its conflict keys.
#[derive(Debug, Clone)]
pub struct ProposedEdit {
    pub rule_id: String,
    pub priority: usize,
    pub anchor: Span,
    pub rewrites: Vec<Rewrite>,
    pub conflict_keys: Vec<Span>,
    pub labels: Vec<String>,
    pub droppable_comments: Vec<Span>,
}

impl ProposedEdit {
    pub fn from_candidate(
        tree: &SyntaxTree,
        rule_id: &str,
        priority: usize,
        candidate: Candidate,
    ) -> Result<Self, EditError> {
        if tree.get(candidate.anchor).is_none() {
            return Err(EditError::UnknownAnchor(candidate.anchor));
        }
        if candidate.labels.is_empty() {
            return Err(EditError::MissingLabel);
        }
        if candidate.rewrites.is_empty() {
            return Err(EditError::NoRewrites);
        }
        let source = tree.source();
        for rewrite in &candidate.rewrites {
            rewrite.validate(source)?;
        }
        let mut sorted: Vec<Span> = candidate.rewrites.iter().map(|r| r.span).collect();
        sorted.sort();
        for pair in sorted.windows(2) {
            if pair[0].overlaps(pair[1]) {
                return Err(EditError::Overlap {
                    first: pair[0],
                    second: pair[1],
                });
            }
        }

        let mut keys = sorted;
        if let Some(widened) = widened_key(tree, candidate.anchor, candidate.widening) {
            keys.push(widened);
        }
        keys.extend(candidate.extra_keys.iter().copied());
        keys.sort();
        keys.dedup();

        Ok(Self {
            rule_id: rule_id.to_string(),
            priority,
            anchor: tree.span(candidate.anchor),
            rewrites: candidate.rewrites,
            conflict_keys: keys,
            labels: candidate.labels,
            droppable_comments: candidate.droppable_comments,
        })
    }

    /// First and last byte touched by any conflict key.
    pub fn extent(&self) -> Span {
        self.conflict_keys
            .iter()
            .copied()
            .reduce(Span::cover)
            .unwrap_or(self.anchor)
    }

    pub fn overlaps(&self, other: &ProposedEdit) -> bool {
        self.conflict_keys
            .iter()
            .any(|key| other.conflict_keys.iter().any(|theirs| key.overlaps(*theirs)))
    }

    pub fn is_droppable(&self, comment: Span) -> bool {
        self.droppable_comments.contains(&comment)
    }
}

fn widened_key(tree: &SyntaxTree, anchor: NodeId, widening: Widening) -> Option<Span> {
    let enclosing_or_self = |predicate: &dyn Fn(NodeKind) -> bool| {
        if predicate(tree.kind(anchor)) {
            Some(anchor)
        } else {
            tree.enclosing(anchor, predicate)
        }
    };
    let node = match widening {
        Widening::None => None,
        Widening::Statement => {
            enclosing_or_self(&|kind| kind.is_statement() || kind.is_declaration())
        }
        Widening::StatementList => tree.enclosing(anchor, NodeKind::is_statement_list),
        Widening::Declaration => enclosing_or_self(&|kind| {
            matches!(
                kind,
                NodeKind::MethodDeclaration
                    | NodeKind::ConstructorDeclaration
                    | NodeKind::FieldDeclaration
                    | NodeKind::StaticInitializer
            )
        }),
    };
    node.map(|id| tree.span(id))
}

/// Mutually non-overlapping edits for one pass.
#[derive(Debug, Clone, Default)]
pub struct EditSet {
    edits: Vec<ProposedEdit>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn edits(&self) -> &[ProposedEdit] {
        &self.edits
    }

    pub fn into_edits(self) -> Vec<ProposedEdit> {
        self.edits
    }

    /// Accepted edit whose conflict keys overlap `edit`, if any.
    pub fn conflict_with(&self, edit: &ProposedEdit) -> Option<&ProposedEdit> {
        self.edits.iter().find(|accepted| accepted.overlaps(edit))
    }

    /// Add `edit` unless it overlaps a member; the rejected edit is handed back.
    pub fn try_insert(&mut self, edit: ProposedEdit) -> Result<(), ProposedEdit> {
        if self.conflict_with(&edit).is_some() {
            return Err(edit);
        }
        self.edits.push(edit);
        Ok(())
    }

    pub fn rewrites(&self) -> impl Iterator<Item = &Rewrite> {
        self.edits.iter().flat_map(|edit| edit.rewrites.iter())
    }

    /// Splice every rewrite into `source`, bottom-up so earlier offsets stay valid.
    pub fn apply(&self, source: &str) -> Result<String, EditError> {
        let mut rewrites: Vec<&Rewrite> = self.rewrites().collect();
        for rewrite in &rewrites {
            rewrite.validate(source)?;
        }
        // Descending by start; at equal start the non-empty span goes first so
        // an insertion at the same point lands before its replacement.
        rewrites.sort_by(|a, b| {
            b.span
                .start
                .cmp(&a.span.start)
                .then(b.span.end.cmp(&a.span.end))
        });
        for pair in rewrites.windows(2) {
            let (later, earlier) = (pair[0], pair[1]);
            if earlier.span.overlaps(later.span) {
                return Err(EditError::Overlap {
                    first: earlier.span,
                    second: later.span,
                });
            }
        }

        let mut text = source.to_string();
        for rewrite in rewrites {
            text.replace_range(rewrite.span.start..rewrite.span.end, &rewrite.text);
        }
        Ok(text)
    }

    /// Splice rewrites in the given order (indices into [`EditSet::rewrites`]),
    /// tracking offset shifts of those already applied.
    pub fn apply_in_order(&self, source: &str, order: &[usize]) -> Result<String, EditError> {
        let rewrites: Vec<&Rewrite> = self.rewrites().collect();
        let mut seen = vec![false; rewrites.len()];
        for &index in order {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(EditError::BadPermutation {
                        given: order.len(),
                        expected: rewrites.len(),
                    })
                }
            }
        }
        if order.len() != rewrites.len() {
            return Err(EditError::BadPermutation {
                given: order.len(),
                expected: rewrites.len(),
            });
        }
        for rewrite in &rewrites {
            rewrite.validate(source)?;
        }

        let mut text = source.to_string();
        let mut applied: Vec<(Span, isize)> = Vec::with_capacity(rewrites.len());
        for &index in order {
            let rewrite = rewrites[index];
            let Span { start, end } = rewrite.span;
            let shift_start: isize = applied
                .iter()
                .filter(|(span, _)| span.end <= start)
                .map(|(_, delta)| delta)
                .sum();
            let new_start = (start as isize + shift_start) as usize;
            let new_end = if rewrite.span.is_empty() {
                new_start
            } else {
                let shift_end: isize = applied
                    .iter()
                    .filter(|(span, _)| span.end < end || (span.end == end && !span.is_empty()))
                    .map(|(_, delta)| delta)
                    .sum();
                (end as isize + shift_end) as usize
            };
            text.replace_range(new_start..new_end, &rewrite.text);
            applied.push((rewrite.span, rewrite.delta()));
        }
        Ok(text)
    }
}
