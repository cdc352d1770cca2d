//! Apply engine.
//!
//! Splices a conflict-free [`EditSet`] into the source, reparses, and checks
//! that every comment still sits where it belongs. Comments that lie outside
//! all rewrites must keep their owner (or, when the owner itself was
//! rewritten, end up next to the rewritten region); comments inside a
//! rewrite must be re-emitted by the edit or explicitly marked droppable.
//! Edits that fail these checks are rejected and retried on a later pass;
//! the rest of the set still applies.

use crate::diagnostics::{Diagnostics, Severity};
use crate::edit::{EditError, EditSet, ProposedEdit, Rewrite};
use crate::pool;
use crate::render::tidy;
use crate::syntax::{check_tree, Span, SyntaxError, SyntaxTree};
use std::collections::HashMap;
use thiserror::Error;

/// Why an edit was held back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("rewrite cuts through the comment at {0}")]
    CommentCut(Span),

    #[error("comment at {0} would be deleted without being marked droppable")]
    CommentLost(Span),

    #[error("comment at {0} would lose the statement it annotates")]
    CommentOrphaned(Span),

    #[error("comment at {0} would attach to a different node")]
    CommentMoved(Span),

    #[error("comments of the result differ from the input")]
    CommentsNotConserved,

    #[error("result does not parse: {0}")]
    Syntax(#[from] SyntaxError),
}

impl Rejection {
    fn severity(&self) -> Severity {
        match self {
            Rejection::Syntax(_) | Rejection::Edit(_) => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplySettings {
    /// Tidy synthesized fragments before splicing.
    pub format_edited_regions: bool,
}

/// New text and tree of a pass.
#[derive(Debug)]
pub struct Output {
    pub text: String,
    pub tree: SyntaxTree,
}

#[derive(Debug, Default)]
pub struct Applied {
    /// `None` when every edit was rejected.
    pub output: Option<Output>,
    pub edits: Vec<ProposedEdit>,
    pub rejected: Vec<(ProposedEdit, Rejection)>,
}

/// Comment text with per-line indentation removed, so a comment moved to
/// another indentation level still compares equal.
fn comment_key(text: &str) -> String {
    text.lines().map(str::trim).collect::<Vec<_>>().join("\n")
}

fn removes(rewrite: &Rewrite, span: Span) -> bool {
    !rewrite.span.is_empty() && rewrite.span.contains(span)
}

fn emitted_text(edit: &ProposedEdit) -> String {
    edit.rewrites
        .iter()
        .map(|rewrite| comment_key(&rewrite.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Comments the edit deletes without re-emitting them.
fn dropped_comments(tree: &SyntaxTree, edit: &ProposedEdit) -> Vec<Span> {
    let emitted = emitted_text(edit);
    tree.comments()
        .all()
        .iter()
        .filter(|comment| edit.rewrites.iter().any(|rewrite| removes(rewrite, comment.span)))
        .filter(|comment| !emitted.contains(&comment_key(comment.text(tree))))
        .map(|comment| comment.span)
        .collect()
}

/// Checks that need only the old tree.
fn precheck(tree: &SyntaxTree, edit: &ProposedEdit) -> Result<(), Rejection> {
    for rewrite in &edit.rewrites {
        rewrite.validate(tree.source())?;
    }
    let dropped = dropped_comments(tree, edit);
    for (comment, binding) in tree.comments().iter() {
        let cut = edit.rewrites.iter().any(|rewrite| {
            rewrite.span.overlaps(comment.span) && !rewrite.span.contains(comment.span)
        });
        if cut {
            return Err(Rejection::CommentCut(comment.span));
        }
        if dropped.contains(&comment.span) && !edit.is_droppable(comment.span) {
            return Err(Rejection::CommentLost(comment.span));
        }
        let inside = edit.rewrites.iter().any(|rewrite| removes(rewrite, comment.span));
        let owner = tree.span(binding.owner);
        let owner_deleted = edit.rewrites.iter().any(|rewrite| removes(rewrite, owner));
        if !inside && owner_deleted && !edit.is_droppable(comment.span) {
            return Err(Rejection::CommentOrphaned(comment.span));
        }
    }
    Ok(())
}

fn prepared(edits: &[ProposedEdit], settings: ApplySettings) -> EditSet {
    let mut set = EditSet::new();
    for edit in edits {
        let mut edit = edit.clone();
        if settings.format_edited_regions {
            for rewrite in edit.rewrites.iter_mut().filter(|rewrite| rewrite.synthesized) {
                rewrite.text = tidy(&rewrite.text);
            }
        }
        // Members of an accepted set never overlap.
        let _ = set.try_insert(edit);
    }
    set
}

/// Old offset outside every rewrite to its position in the new text.
fn shifted(rewrites: &[&Rewrite], offset: usize) -> usize {
    let delta: isize = rewrites
        .iter()
        .filter(|rewrite| rewrite.span.end <= offset)
        .map(|rewrite| rewrite.delta())
        .sum();
    (offset as isize + delta) as usize
}

fn comment_counts<'a>(texts: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for text in texts {
        *counts.entry(comment_key(text)).or_insert(0) += 1;
    }
    counts
}

fn verify(old: &SyntaxTree, set: &EditSet, new: &SyntaxTree) -> Result<(), Rejection> {
    check_tree(new)?;

    let mut expected = comment_counts(old.comments().all().iter().map(|c| c.text(old)));
    for edit in set.edits() {
        for span in dropped_comments(old, edit) {
            if let Some(count) = expected.get_mut(&comment_key(old.slice(span))) {
                *count = count.saturating_sub(1);
            }
        }
    }
    expected.retain(|_, count| *count > 0);
    let actual = comment_counts(new.comments().all().iter().map(|c| c.text(new)));
    if expected != actual {
        return Err(Rejection::CommentsNotConserved);
    }

    let rewrites: Vec<&Rewrite> = set.rewrites().collect();
    let regions: Vec<Span> = rewrites
        .iter()
        .map(|rewrite| {
            let start = shifted(&rewrites, rewrite.span.start);
            Span::new(start, start + rewrite.text.len())
        })
        .collect();
    for (comment, binding) in old.comments().iter() {
        if rewrites.iter().any(|rewrite| removes(rewrite, comment.span)) {
            continue;
        }
        let start = shifted(&rewrites, comment.span.start);
        let moved = Span::new(start, start + comment.span.len());
        let Some(now) = new.comments().binding_at(moved) else {
            return Err(Rejection::CommentMoved(comment.span));
        };
        let owner = old.span(binding.owner);
        let owner_touched = rewrites.iter().any(|rewrite| rewrite.span.overlaps(owner));
        let kept = if owner_touched {
            let new_owner = new.span(now.owner);
            regions.iter().any(|region| new_owner.touches(*region))
        } else {
            now.attachment == binding.attachment && new.text(now.owner) == old.text(binding.owner)
        };
        if !kept {
            return Err(Rejection::CommentMoved(comment.span));
        }
    }
    Ok(())
}

fn try_apply(tree: &SyntaxTree, edits: &[ProposedEdit], settings: ApplySettings) -> Result<Output, Rejection> {
    let set = prepared(edits, settings);
    let text = set.apply(tree.source())?;
    let new = pool::with_parser(|parser| parser.parse_tree(&text))??;
    verify(tree, &set, &new)?;
    Ok(Output { text, tree: new })
}

fn reject(
    rejected: &mut Vec<(ProposedEdit, Rejection)>,
    edit: ProposedEdit,
    why: Rejection,
    pass: usize,
    diagnostics: &mut Diagnostics,
) {
    diagnostics.report(
        pass,
        Some(&edit.rule_id),
        why.severity(),
        Some(edit.extent()),
        format!("rejected: {why}"),
    );
    rejected.push((edit, why));
}

/// Apply `set` to the text of `tree`.
///
/// The whole set is tried first. When the result fails verification, edits
/// are admitted one at a time in set order so only the offending ones are
/// rejected.
pub fn apply(
    tree: &SyntaxTree,
    set: EditSet,
    settings: ApplySettings,
    pass: usize,
    diagnostics: &mut Diagnostics,
) -> Applied {
    let mut applied = Applied::default();
    let mut candidates = Vec::new();
    for edit in set.into_edits() {
        match precheck(tree, &edit) {
            Ok(()) => candidates.push(edit),
            Err(why) => reject(&mut applied.rejected, edit, why, pass, diagnostics),
        }
    }
    if candidates.is_empty() {
        return applied;
    }

    match try_apply(tree, &candidates, settings) {
        Ok(output) => {
            applied.output = Some(output);
            applied.edits = candidates;
        }
        Err(why) => {
            tracing::debug!(pass, %why, "edit set failed verification, admitting edits one by one");
            for edit in candidates {
                let mut trial = applied.edits.clone();
                trial.push(edit.clone());
                match try_apply(tree, &trial, settings) {
                    Ok(output) => {
                        applied.output = Some(output);
                        applied.edits = trial;
                    }
                    Err(why) => reject(&mut applied.rejected, edit, why, pass, diagnostics),
                }
            }
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::Candidate;
    use crate::syntax::{JavaParser, NodeId, NodeKind};
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> SyntaxTree {
        JavaParser::new().unwrap().parse_tree(source).unwrap()
    }

    fn first(tree: &SyntaxTree, kind: NodeKind) -> NodeId {
        tree.ids().find(|&id| tree.kind(id) == kind).unwrap()
    }

    fn set_of(tree: &SyntaxTree, candidates: Vec<Candidate>) -> EditSet {
        let mut set = EditSet::new();
        for (i, candidate) in candidates.into_iter().enumerate() {
            set.try_insert(ProposedEdit::from_candidate(tree, &format!("r{i}"), i, candidate).unwrap())
                .unwrap();
        }
        set
    }

    fn run(tree: &SyntaxTree, candidates: Vec<Candidate>) -> Applied {
        let set = set_of(tree, candidates);
        apply(tree, set, ApplySettings::default(), 1, &mut Diagnostics::new())
    }

    fn statement_deletion(tree: &SyntaxTree, kind: NodeKind) -> Candidate {
        let stmt = first(tree, kind);
        Candidate::new(stmt, Rewrite::delete(tree, tree.deletion_span(stmt)), "delete")
    }

    #[test]
    fn applies_and_reparses() {
        let tree = parse("class A { int x = 1; }");
        let literal = first(&tree, NodeKind::IntegerLiteral);
        let applied = run(&tree, vec![Candidate::replace_node(&tree, literal, "2", "bump")]);
        let output = applied.output.unwrap();
        assert_eq!(output.text, "class A { int x = 2; }");
        assert!(!output.tree.has_errors());
        assert_eq!(applied.edits.len(), 1);
    }

    #[test]
    fn deleting_statement_with_leading_comment_is_rejected() {
        let source = "class A {\n    A() {\n        // required\n        super();\n    }\n}\n";
        let tree = parse(source);
        let applied = run(&tree, vec![statement_deletion(&tree, NodeKind::ExplicitConstructorInvocation)]);
        assert!(applied.output.is_none());
        assert!(matches!(applied.rejected[0].1, Rejection::CommentOrphaned(_)));
    }

    #[test]
    fn trailing_comment_needs_droppable_mark() {
        let source = "class A {\n    A() {\n        super(); // boilerplate\n    }\n}\n";
        let tree = parse(source);
        let unmarked = run(&tree, vec![statement_deletion(&tree, NodeKind::ExplicitConstructorInvocation)]);
        assert!(matches!(unmarked.rejected[0].1, Rejection::CommentLost(_)));

        let comment = tree.comments().all()[0].span;
        let marked = statement_deletion(&tree, NodeKind::ExplicitConstructorInvocation)
            .with_droppable_comment(comment);
        let applied = run(&tree, vec![marked]);
        assert_eq!(applied.output.unwrap().text, "class A {\n    A() {\n    }\n}\n");
    }

    #[test]
    fn cutting_a_comment_is_rejected() {
        let source = "class A { int x = /* one */ 1; }";
        let tree = parse(source);
        let comment = tree.comments().all()[0].span;
        let span = Span::new(comment.start + 3, comment.end + 2);
        let candidate = Candidate::new(tree.root(), Rewrite::replace(&tree, span, ""), "cut");
        let applied = run(&tree, vec![candidate]);
        assert!(matches!(applied.rejected[0].1, Rejection::CommentCut(_)));
    }

    #[test]
    fn insertion_that_steals_a_leading_comment_is_rejected() {
        let source = "class A {\n    void f() {\n        // loop forever\n        while (true) {}\n    }\n}\n";
        let tree = parse(source);
        let stmt = first(&tree, NodeKind::WhileStatement);
        let insert = Rewrite::insert(tree.span(stmt).start, "g();\n        ");
        let applied = run(&tree, vec![Candidate::new(stmt, insert, "insert")]);
        assert!(applied.output.is_none());
        assert!(matches!(applied.rejected[0].1, Rejection::CommentMoved(_)));
    }

    #[test]
    fn broken_edit_is_rejected_and_others_survive() {
        let source = "class A { int a = 1; int b = 2; }";
        let tree = parse(source);
        let literals: Vec<NodeId> = tree
            .ids()
            .filter(|&id| tree.kind(id) == NodeKind::IntegerLiteral)
            .collect();
        let applied = run(
            &tree,
            vec![
                Candidate::replace_node(&tree, literals[0], "1 +", "break"),
                Candidate::replace_node(&tree, literals[1], "3", "bump"),
            ],
        );
        assert_eq!(applied.output.unwrap().text, "class A { int a = 1; int b = 3; }");
        assert_eq!(applied.rejected.len(), 1);
        assert!(matches!(applied.rejected[0].1, Rejection::Syntax(_)));
    }

    #[test]
    fn comments_moved_with_reindentation_are_conserved() {
        let source = "class A {\n    int f() {\n        /* a\n         * b */\n        return 1;\n    }\n}\n";
        let tree = parse(source);
        let comment = tree.comments().all()[0].span;
        let block = first(&tree, NodeKind::Block);
        let span = Span::new(tree.line_start(comment.start), tree.span(block).end);
        let candidate = Candidate::new(
            block,
            Rewrite::replace(&tree, span, "    /* a\n     * b */\n    return 1;\n    }"),
            "dedent",
        );
        let applied = run(&tree, vec![candidate]);
        assert!(applied.rejected.is_empty(), "{:?}", applied.rejected);
    }

    #[test]
    fn tidy_trims_synthesized_text_only() {
        let tree = parse("class A { int x = 1; }");
        let literal = first(&tree, NodeKind::IntegerLiteral);
        let set = set_of(&tree, vec![Candidate::replace_node(&tree, literal, "2   ", "bump")]);
        let settings = ApplySettings {
            format_edited_regions: true,
        };
        let applied = apply(&tree, set, settings, 1, &mut Diagnostics::new());
        assert_eq!(applied.output.unwrap().text, "class A { int x = 2; }");
    }
}
