//! Fixed-point scheduler.
//!
//! Runs match, compose and apply until no rule proposes an accepted edit,
//! the pass budget is spent, a pass reproduces an earlier text (a rule
//! cycle), or the caller cancels. Cancellation is honoured between passes
//! only, so the output is always the result of complete passes.

use crate::apply::{self, ApplySettings};
use crate::compositor::{self, Composition};
use crate::diagnostics::{Diagnostics, Severity};
use crate::edit::ProposedEdit;
use crate::render::Style;
use crate::rules::{ActiveRule, MatchContext, MatchError};
use crate::syntax::SyntaxTree;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use xxhash_rust::xxh3::{xxh3_64, Xxh3};

pub const DEFAULT_MAX_PASSES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Matching,
    Composing,
    Applying,
    /// Pass budget spent or a rule cycle detected while edits remained.
    Exhausted,
    Cancelled,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Matching => "matching",
            SchedulerState::Composing => "composing",
            SchedulerState::Applying => "applying",
            SchedulerState::Exhausted => "exhausted",
            SchedulerState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Shared flag checked between passes.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of a scheduler run.
#[derive(Debug)]
pub struct Outcome {
    pub text: String,
    pub applied_rules: BTreeSet<String>,
    /// Passes whose edits were applied.
    pub passes: usize,
    pub state: SchedulerState,
}

/// Identity of an edit independent of where it sits in the text.
fn fingerprint(tree: &SyntaxTree, edit: &ProposedEdit) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.update(edit.rule_id.as_bytes());
    for rewrite in &edit.rewrites {
        hasher.update(&[0]);
        hasher.update(tree.slice(rewrite.span).as_bytes());
        hasher.update(&[0]);
        hasher.update(rewrite.text.as_bytes());
    }
    hasher.digest()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct Scheduler<'a> {
    rules: &'a [ActiveRule<'a>],
    style: Style,
    max_passes: usize,
    apply_settings: ApplySettings,
    state: SchedulerState,
    /// Edits rejected by the apply engine; not proposed again.
    rejected: HashSet<u64>,
}

impl<'a> Scheduler<'a> {
    pub fn new(rules: &'a [ActiveRule<'a>], style: Style) -> Self {
        Self {
            rules,
            style,
            max_passes: DEFAULT_MAX_PASSES,
            apply_settings: ApplySettings::default(),
            state: SchedulerState::Idle,
            rejected: HashSet::new(),
        }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    pub fn with_apply_settings(mut self, settings: ApplySettings) -> Self {
        self.apply_settings = settings;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    fn transition(&mut self, next: SchedulerState) {
        tracing::trace!(from = %self.state, to = %next, "scheduler state");
        self.state = next;
    }

    /// Proposed edits of every rule for `tree`. A failing or panicking rule
    /// contributes nothing this pass.
    fn match_all(&self, tree: &SyntaxTree, pass: usize, diagnostics: &mut Diagnostics) -> Vec<ProposedEdit> {
        let mut edits = Vec::new();
        for active in self.rules {
            let cx = MatchContext {
                tree,
                settings: &active.settings,
                style: &self.style,
            };
            let found = panic::catch_unwind(AssertUnwindSafe(|| active.rule.find(&cx)))
                .unwrap_or_else(|payload| {
                    Err(MatchError::Panicked {
                        message: panic_message(payload.as_ref()),
                    })
                });
            let candidates = match found {
                Ok(candidates) => candidates,
                Err(error) => {
                    diagnostics.report(
                        pass,
                        Some(active.id()),
                        Severity::Warning,
                        None,
                        format!("matcher failed, candidates discarded: {error}"),
                    );
                    continue;
                }
            };
            for candidate in candidates {
                match ProposedEdit::from_candidate(tree, active.id(), active.priority, candidate) {
                    Ok(edit) if self.rejected.contains(&fingerprint(tree, &edit)) => {
                        tracing::trace!(rule = active.id(), "skipping previously rejected edit");
                    }
                    Ok(edit) => edits.push(edit),
                    Err(error) => diagnostics.report(
                        pass,
                        Some(active.id()),
                        Severity::Warning,
                        None,
                        format!("invalid candidate discarded: {error}"),
                    ),
                }
            }
        }
        edits
    }

    fn compose(&mut self, tree: &SyntaxTree, pass: usize, diagnostics: &mut Diagnostics) -> Composition {
        self.transition(SchedulerState::Matching);
        let edits = self.match_all(tree, pass, diagnostics);
        self.transition(SchedulerState::Composing);
        compositor::compose(edits, pass, diagnostics)
    }

    /// Run passes over `tree` until a fixed point or a stop condition.
    pub fn run(
        &mut self,
        tree: SyntaxTree,
        cancel: &CancellationToken,
        diagnostics: &mut Diagnostics,
    ) -> Outcome {
        let mut tree = tree;
        let mut applied_rules = BTreeSet::new();
        let mut seen = HashSet::from([xxh3_64(tree.source().as_bytes())]);
        let mut passes = 0;

        for pass in 1..=self.max_passes {
            if cancel.is_cancelled() {
                self.transition(SchedulerState::Cancelled);
                diagnostics.report(pass, None, Severity::Info, None, "cancelled between passes");
                return self.finish(tree, applied_rules, passes);
            }

            let composition = self.compose(&tree, pass, diagnostics);
            if composition.is_empty() {
                self.transition(SchedulerState::Idle);
                return self.finish(tree, applied_rules, passes);
            }

            self.transition(SchedulerState::Applying);
            let has_losers = composition.has_losers();
            let applied = apply::apply(&tree, composition.accepted, self.apply_settings, pass, diagnostics);
            for (edit, _) in &applied.rejected {
                self.rejected.insert(fingerprint(&tree, edit));
            }
            let Some(output) = applied.output else {
                // Everything was rejected; the blocked edits make room for
                // deferred and dropped ones next pass.
                if !has_losers {
                    self.transition(SchedulerState::Idle);
                    return self.finish(tree, applied_rules, passes);
                }
                continue;
            };

            passes += 1;
            let rules: BTreeSet<&str> = applied.edits.iter().map(|edit| edit.rule_id.as_str()).collect();
            tracing::info!(pass, edits = applied.edits.len(), rules = ?rules, "applied pass");
            applied_rules.extend(rules.into_iter().map(str::to_string));
            tree = output.tree;

            if !seen.insert(xxh3_64(output.text.as_bytes())) {
                self.transition(SchedulerState::Exhausted);
                diagnostics.report(
                    pass,
                    None,
                    Severity::Warning,
                    None,
                    format!("pass {pass} reproduced an earlier text; rules are cycling, stopping"),
                );
                return self.finish(tree, applied_rules, passes);
            }
        }

        // Budget spent: probe once more to tell a fixed point from truncation.
        let probe_pass = self.max_passes + 1;
        let probe = self.compose(&tree, probe_pass, &mut Diagnostics::new());
        if probe.is_empty() {
            self.transition(SchedulerState::Idle);
        } else {
            self.transition(SchedulerState::Exhausted);
            diagnostics.report(
                self.max_passes,
                None,
                Severity::Warning,
                None,
                format!(
                    "iteration budget of {} passes exhausted with {} edit(s) still pending",
                    self.max_passes,
                    probe.accepted.len()
                ),
            );
        }
        self.finish(tree, applied_rules, passes)
    }

    fn finish(&self, tree: SyntaxTree, applied_rules: BTreeSet<String>, passes: usize) -> Outcome {
        Outcome {
            text: tree.into_source(),
            applied_rules,
            passes,
            state: self.state,
        }
    }
}
