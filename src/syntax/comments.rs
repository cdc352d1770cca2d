//! Comment collection and ownership.
//!
//! Every comment is bound to the statement or declaration it annotates. The
//! apply engine consults these bindings to decide whether an edit carries,
//! drops or orphans a comment.

use crate::syntax::kind::NodeKind;
use crate::syntax::tree::{NodeId, Span, SyntaxTree};
use std::collections::HashMap;

/// A comment token in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub span: Span,
    pub node: NodeId,
    pub block: bool,
}

impl Comment {
    pub fn text<'a>(&self, tree: &'a SyntaxTree) -> &'a str {
        tree.slice(self.span)
    }
}

/// How a comment relates to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// Directly before the owner, separated only by whitespace or other comments.
    Leading,
    /// After the owner on the same line.
    Trailing,
    /// Inside the owner, not adjacent to any smaller statement or declaration.
    Enclosed,
}

/// `(comment) -> (owning node)` relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentBinding {
    pub owner: NodeId,
    pub attachment: Attachment,
}

/// Comments of one tree with their bindings, in source order.
#[derive(Debug, Default)]
pub struct CommentTable {
    comments: Vec<Comment>,
    bindings: Vec<CommentBinding>,
}

impl CommentTable {
    pub(crate) fn build(tree: &SyntaxTree) -> Self {
        let comments: Vec<Comment> = tree
            .ids()
            .filter(|&id| tree.kind(id).is_comment())
            .map(|id| Comment {
                span: tree.span(id),
                node: id,
                block: tree.kind(id) == NodeKind::BlockComment,
            })
            .collect();

        // Anchors indexed by their boundaries. Pre-order ids make the last
        // anchor ending at an offset the innermost, the first starting at an
        // offset the outermost.
        let mut by_end: HashMap<usize, NodeId> = HashMap::new();
        let mut by_start: HashMap<usize, NodeId> = HashMap::new();
        for id in tree.ids() {
            if !is_anchor(tree, id) {
                continue;
            }
            let span = tree.span(id);
            by_end.insert(span.end, id);
            by_start.entry(span.start).or_insert(id);
        }

        let source = tree.source();
        let mut bindings: Vec<CommentBinding> = Vec::with_capacity(comments.len());
        for (index, comment) in comments.iter().enumerate() {
            let trailing = trailing_owner(tree, comment, &comments[..index], &bindings, &by_end);
            let binding = trailing
                .map(|owner| CommentBinding {
                    owner,
                    attachment: Attachment::Trailing,
                })
                .or_else(|| {
                    leading_owner(source, comment, &comments[index + 1..], &by_start).map(
                        |owner| CommentBinding {
                            owner,
                            attachment: Attachment::Leading,
                        },
                    )
                })
                .unwrap_or_else(|| CommentBinding {
                    owner: tree
                        .ancestors(comment.node)
                        .find(|&ancestor| is_anchor(tree, ancestor))
                        .unwrap_or_else(|| tree.root()),
                    attachment: Attachment::Enclosed,
                });
            bindings.push(binding);
        }

        Self { comments, bindings }
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Comment, &CommentBinding)> {
        self.comments.iter().zip(self.bindings.iter())
    }

    pub fn all(&self) -> &[Comment] {
        &self.comments
    }

    /// Binding of the comment whose span is exactly `span`.
    pub fn binding_at(&self, span: Span) -> Option<&CommentBinding> {
        self.comments
            .iter()
            .position(|comment| comment.span == span)
            .map(|index| &self.bindings[index])
    }

    /// Comments owned by `owner`, any attachment.
    pub fn owned_by(&self, owner: NodeId) -> impl Iterator<Item = &Comment> {
        self.iter()
            .filter(move |(_, binding)| binding.owner == owner)
            .map(|(comment, _)| comment)
    }

    pub fn trailing_of(&self, owner: NodeId) -> impl Iterator<Item = &Comment> {
        self.iter()
            .filter(move |(_, binding)| {
                binding.owner == owner && binding.attachment == Attachment::Trailing
            })
            .map(|(comment, _)| comment)
    }

    pub fn leading_of(&self, owner: NodeId) -> impl Iterator<Item = &Comment> {
        self.iter()
            .filter(move |(_, binding)| {
                binding.owner == owner && binding.attachment == Attachment::Leading
            })
            .map(|(comment, _)| comment)
    }

    /// Comments located inside `span`.
    pub fn within(&self, span: Span) -> impl Iterator<Item = &Comment> {
        self.comments
            .iter()
            .filter(move |comment| span.contains(comment.span))
    }
}

fn trailing_owner(
    tree: &SyntaxTree,
    comment: &Comment,
    earlier: &[Comment],
    earlier_bindings: &[CommentBinding],
    by_end: &HashMap<usize, NodeId>,
) -> Option<NodeId> {
    let source = tree.source();
    let before = &source[..comment.span.start];
    let trimmed = before.trim_end_matches([' ', '\t']);
    if trimmed.is_empty() || trimmed.ends_with('\n') || trimmed.ends_with('\r') {
        return None;
    }
    let end = trimmed.len();

    // `stmt; /* a */ // b` chains onto the trailing owner of `/* a */`.
    if let Some(index) = earlier.iter().rposition(|c| c.span.end == end) {
        let binding = earlier_bindings[index];
        return (binding.attachment == Attachment::Trailing).then_some(binding.owner);
    }

    by_end.get(&end).copied()
}

/// Statements and declarations own comments; a block only does when it
/// stands alone in a statement list rather than being some construct's body.
pub(crate) fn is_anchor(tree: &SyntaxTree, id: NodeId) -> bool {
    let node = tree.node(id);
    if !node.named || !node.kind.is_comment_anchor() {
        return false;
    }
    if node.kind == NodeKind::Block {
        return node
            .parent
            .is_some_and(|parent| tree.kind(parent).is_statement_list());
    }
    true
}

fn leading_owner(
    source: &str,
    comment: &Comment,
    later: &[Comment],
    by_start: &HashMap<usize, NodeId>,
) -> Option<NodeId> {
    let mut offset = comment.span.end;
    let mut later = later.iter().peekable();
    loop {
        let rest = &source[offset..];
        let skipped = rest.len() - rest.trim_start().len();
        offset += skipped;
        match later.peek() {
            Some(next) if next.span.start == offset => {
                offset = next.span.end;
                later.next();
            }
            _ => break,
        }
    }
    by_start.get(&offset).copied()
}
