//! Java syntax model.
//!
//! Source text is parsed with tree-sitter and copied into an immutable arena
//! with comment ownership and single-file name bindings, giving rules a
//! stable, id-addressed view of one compilation unit.

pub mod binder;
pub mod comments;
pub mod errors;
pub mod kind;
pub mod parser;
pub mod tree;
pub mod validator;

pub use binder::{normalize_type, Symbol, SymbolId, SymbolKind, SymbolTable};
pub use comments::{Attachment, Comment, CommentBinding, CommentTable};
pub use errors::SyntaxError;
pub use kind::NodeKind;
pub use parser::JavaParser;
pub use tree::{ErrorNode, Node, NodeId, Span, SyntaxTree};
pub use validator::{check_tree, validate_snippet, validate_syntax, SnippetCategory};
