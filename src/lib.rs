//! Java clean-up: batch source-to-source rewriting for Java built on
//! byte-span edits.
//!
//! A catalog of independently toggled rules proposes edits over a parsed
//! compilation unit. Each pass merges every proposal into one conflict-free
//! edit set, applies it, and re-parses, until no rule fires or the pass
//! budget runs out.
//!
//! # Architecture
//!
//! - [`syntax`]: tree-sitter parse copied into an immutable arena with
//!   comment ownership and single-file name bindings.
//! - [`rules`]: the rule catalog and its matchers, including user-defined
//!   `template.<id>` rules compiled to ast-grep patterns.
//! - [`edit`]: candidates, proposed edits with conflict keys, edit sets.
//! - [`compositor`]: per-pass conflict resolution by position and priority.
//! - [`apply`]: text substitution plus comment re-association checks.
//! - [`scheduler`]: the match, compose, apply loop to a fixed point.
//!
//! # Guarantees
//!
//! - Every rewrite verifies its expected before-text
//! - Untouched bytes are never rewritten
//! - Comments are conserved or dropped only when a rule marks them droppable
//! - Re-running on cleaned output is a no-op
//!
//! # Example
//!
//! ```no_run
//! use java_cleanup::{clean_up, Options};
//!
//! let options = Options::new().enable("redundant_wrapper");
//! let result = clean_up("class A { String s = new String(\"a\"); }", &options)?;
//! assert_eq!(result.text, "class A { String s = \"a\"; }");
//! for diagnostic in result.diagnostics.iter() {
//!     eprintln!("{diagnostic}");
//! }
//! # Ok::<(), java_cleanup::CleanUpError>(())
//! ```

pub mod apply;
pub mod cache;
pub mod compositor;
pub mod config;
pub mod diagnostics;
pub mod edit;
pub mod engine;
pub mod pool;
pub mod render;
pub mod rules;
pub mod safety;
pub mod scheduler;
pub mod syntax;
pub mod workspace;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, LoadedConfig, OptionValue, Options};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use edit::{Candidate, EditError, EditSet, ProposedEdit, Rewrite};
pub use engine::{clean_up, CleanUpError, CleanUpResult, Engine, EngineSettings};
pub use rules::{Catalog, CatalogError, Rule, RuleDescriptor};
pub use safety::{SafetyError, WorkspaceGuard};
pub use scheduler::{CancellationToken, SchedulerState};
pub use syntax::{JavaParser, Span, SyntaxError, SyntaxTree};
pub use workspace::{atomic_write, discover_java_files, WorkspaceError};
