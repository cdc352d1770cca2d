//! Arena-backed syntax tree.
//!
//! The tree-sitter CST is copied into a flat arena once per pass. Nodes are
//! addressed by [`NodeId`]; ids are assigned in pre-order, so the subtree of
//! a node is the contiguous id range `id..subtree_end`. Rules only ever hold
//! ids, and the apply engine builds a fresh tree instead of mutating this one.

use crate::syntax::binder::SymbolTable;
use crate::syntax::comments::CommentTable;
use crate::syntax::errors::SyntaxError;
use crate::syntax::kind::NodeKind;
use serde::Serialize;
use std::fmt;

/// Half-open byte range `[start, end)` in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span used for insertions.
    pub const fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// `other` lies within `self` (boundaries included).
    pub const fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub const fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Conflict semantics: two non-empty spans overlap when they share a byte;
    /// a zero-width span conflicts with a span strictly containing its point
    /// and with another zero-width span at the same point.
    pub const fn overlaps(&self, other: Span) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => self.start == other.start,
            (true, false) => other.start < self.start && self.start < other.end,
            (false, true) => self.start < other.start && other.start < self.end,
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }

    /// Inclusive adjacency: the spans overlap or share a boundary.
    pub const fn touches(&self, other: Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Stable index of a node within one [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One syntax element.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Raw tree-sitter-java grammar kind (keywords and punctuation included).
    pub grammar_kind: &'static str,
    pub span: Span,
    pub parent: Option<NodeId>,
    /// Field name under which the parent holds this node.
    pub field: Option<&'static str>,
    pub children: Vec<NodeId>,
    pub named: bool,
    pub missing: bool,
    subtree_end: u32,
}

/// Location of an ERROR or MISSING node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

/// Immutable syntax tree for one compilation unit.
#[derive(Debug)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<Node>,
    errors: Vec<ErrorNode>,
    pub(crate) comments: CommentTable,
    pub(crate) symbols: SymbolTable,
}

impl SyntaxTree {
    /// Copy a tree-sitter tree into the arena and derive comment ownership and
    /// name bindings.
    pub fn from_tree_sitter(source: String, ts_tree: &tree_sitter::Tree) -> Result<Self, SyntaxError> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut errors = Vec::new();
        let mut parents: Vec<NodeId> = Vec::new();
        let mut cursor = ts_tree.walk();

        loop {
            let ts_node = cursor.node();
            let index = u32::try_from(nodes.len()).map_err(|_| SyntaxError::TooManyNodes {
                nodes: nodes.len(),
            })?;
            let id = NodeId(index);
            let parent = parents.last().copied();

            if ts_node.is_error() || ts_node.is_missing() {
                let pos = ts_node.start_position();
                errors.push(ErrorNode {
                    span: Span::new(ts_node.start_byte(), ts_node.end_byte()),
                    line: pos.row + 1,
                    column: pos.column + 1,
                });
            }

            nodes.push(Node {
                kind: NodeKind::from_grammar(ts_node.kind()),
                grammar_kind: ts_node.kind(),
                span: Span::new(ts_node.start_byte(), ts_node.end_byte()),
                parent,
                field: cursor.field_name(),
                children: Vec::new(),
                named: ts_node.is_named(),
                missing: ts_node.is_missing(),
                subtree_end: index + 1,
            });
            if let Some(parent) = parent {
                nodes[parent.index()].children.push(id);
            }

            if cursor.goto_first_child() {
                parents.push(id);
                continue;
            }

            // Climb until a sibling exists, closing finished subtrees.
            let end = nodes.len() as u32;
            let mut finished = false;
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    finished = true;
                    break;
                }
                if let Some(done) = parents.pop() {
                    nodes[done.index()].subtree_end = end;
                }
            }
            if finished {
                break;
            }
        }

        let mut tree = SyntaxTree {
            source,
            nodes,
            errors,
            comments: CommentTable::default(),
            symbols: SymbolTable::default(),
        };
        tree.comments = CommentTable::build(&tree);
        tree.symbols = SymbolTable::build(&tree);
        Ok(tree)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn into_source(self) -> String {
        self.source
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node, rejecting ids that do not belong to this tree.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn text(&self, id: NodeId) -> &str {
        self.slice(self.span(id))
    }

    pub fn slice(&self, span: Span) -> &str {
        &self.source[span.start..span.end]
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_nodes(&self) -> &[ErrorNode] {
        &self.errors
    }

    pub fn comments(&self) -> &CommentTable {
        &self.comments
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// All node ids in pre-order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Named children excluding comments.
    pub fn named_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().copied().filter(move |&child| {
            let node = self.node(child);
            node.named && !node.kind.is_comment()
        })
    }

    pub fn first_named_child(&self, id: NodeId) -> Option<NodeId> {
        self.named_children(id).next()
    }

    pub fn child_by_field(&self, id: NodeId, field: &str) -> Option<NodeId> {
        self.children_by_field(id, field).next()
    }

    pub fn children_by_field<'a>(
        &'a self,
        id: NodeId,
        field: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.node(child).field == Some(field))
    }

    /// Strict descendants of `id` in pre-order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> {
        (id.0 + 1..self.node(id).subtree_end).map(NodeId)
    }

    /// `ancestor` strictly encloses `id` in the tree.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor.0 < id.0 && id.0 < self.node(ancestor).subtree_end
    }

    /// Strict ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    pub fn enclosing(&self, id: NodeId, predicate: impl Fn(NodeKind) -> bool) -> Option<NodeId> {
        self.ancestors(id).find(|&ancestor| predicate(self.kind(ancestor)))
    }

    /// Named, non-comment siblings following `id` in its parent.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.named_children(parent).find(|&sibling| sibling.0 > id.0)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.named_children(parent)
            .take_while(|&sibling| sibling.0 < id.0)
            .last()
    }

    /// Statement children of a block-like node.
    pub fn statements(&self, list: NodeId) -> Vec<NodeId> {
        self.named_children(list)
            .filter(|&child| self.kind(child).is_statement())
            .collect()
    }

    /// Smallest named node whose span covers `span`.
    pub fn smallest_covering(&self, span: Span) -> NodeId {
        let mut current = self.root();
        'descend: loop {
            for &child in self.children(current) {
                let node = self.node(child);
                if node.named && node.span.contains(span) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Whether a declaration's `modifiers` child carries the given keyword.
    pub fn has_modifier(&self, decl: NodeId, keyword: &str) -> bool {
        self.children(decl)
            .iter()
            .filter(|&&child| self.kind(child) == NodeKind::Modifiers)
            .flat_map(|&modifiers| self.children(modifiers).iter())
            .any(|&token| self.node(token).grammar_kind == keyword)
    }

    pub fn has_annotation(&self, decl: NodeId) -> bool {
        self.children(decl)
            .iter()
            .filter(|&&child| self.kind(child) == NodeKind::Modifiers)
            .flat_map(|&modifiers| self.children(modifiers).iter())
            .any(|&token| {
                matches!(
                    self.node(token).grammar_kind,
                    "marker_annotation" | "annotation"
                )
            })
    }

    /// Offset of the first byte of the line containing `offset`.
    pub fn line_start(&self, offset: usize) -> usize {
        self.source[..offset].rfind('\n').map_or(0, |pos| pos + 1)
    }

    /// Offset of the line terminator (or end of text) of the line containing `offset`.
    pub fn line_end(&self, offset: usize) -> usize {
        self.source[offset..]
            .find('\n')
            .map_or(self.source.len(), |pos| offset + pos)
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn indent_at(&self, offset: usize) -> &str {
        let start = self.line_start(offset);
        let line = &self.source[start..self.line_end(offset)];
        let trimmed = line.trim_start_matches([' ', '\t']);
        &line[..line.len() - trimmed.len()]
    }

    /// `id` starts its line: only whitespace precedes it.
    pub fn starts_line(&self, id: NodeId) -> bool {
        let start = self.span(id).start;
        self.source[self.line_start(start)..start]
            .chars()
            .all(|c| c == ' ' || c == '\t')
    }

    /// Span covering `id` together with its trailing same-line comments.
    pub fn span_with_trailing_comments(&self, id: NodeId) -> Span {
        let mut span = self.span(id);
        for comment in self.comments.trailing_of(id) {
            span = span.cover(comment.span);
        }
        span
    }

    /// Span removed when deleting `id`: the node with its trailing comments,
    /// widened to whole lines when nothing else shares them.
    pub fn deletion_span(&self, id: NodeId) -> Span {
        let span = self.span_with_trailing_comments(id);
        let line_start = self.line_start(span.start);
        let line_end = self.line_end(span.end);
        let before_blank = self.source[line_start..span.start]
            .chars()
            .all(|c| c == ' ' || c == '\t');
        let after_blank = self.source[span.end..line_end].trim().is_empty();
        if before_blank && after_blank {
            let end = if line_end < self.source.len() {
                line_end + 1
            } else {
                line_end
            };
            Span::new(line_start, end)
        } else {
            span
        }
    }
}
