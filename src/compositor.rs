//! Merges the proposed edits of every active rule into one conflict-free
//! [`EditSet`] per pass.
//!
//! Edits are visited by position, then rule priority. An edit whose conflict
//! keys overlap an already accepted edit is deferred: the losing rule sees
//! the post-edit tree next pass and may propose again. Overlaps within one
//! rule are contradictory at equal priority and dropped; the rule still
//! re-matches the next tree.

use crate::diagnostics::{Diagnostics, Severity};
use crate::edit::{EditSet, ProposedEdit};
use std::cmp::Ordering;

/// Result of composing one pass.
#[derive(Debug, Default)]
pub struct Composition {
    pub accepted: EditSet,
    /// Edits that lost against an accepted edit of another rule.
    pub deferred: Vec<ProposedEdit>,
    /// Edits that overlapped an accepted edit of the same rule.
    pub dropped: Vec<ProposedEdit>,
}

impl Composition {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Edits that lost this pass and may succeed once the winners are
    /// applied or rejected.
    pub fn has_losers(&self) -> bool {
        !self.deferred.is_empty() || !self.dropped.is_empty()
    }
}

fn visit_order(a: &ProposedEdit, b: &ProposedEdit) -> Ordering {
    let (ea, eb) = (a.extent(), b.extent());
    ea.start
        .cmp(&eb.start)
        .then(a.priority.cmp(&b.priority))
        .then(ea.end.cmp(&eb.end))
        .then_with(|| a.conflict_keys.cmp(&b.conflict_keys))
}

/// Accept edits greedily in visit order.
pub fn compose(mut edits: Vec<ProposedEdit>, pass: usize, diagnostics: &mut Diagnostics) -> Composition {
    edits.sort_by(visit_order);
    let mut composition = Composition::default();
    for edit in edits {
        let winner = composition
            .accepted
            .conflict_with(&edit)
            .map(|winner| (winner.rule_id.clone(), winner.extent()));
        let Some((winner_rule, winner_extent)) = winner else {
            // Cannot fail: no accepted edit overlaps.
            if let Err(edit) = composition.accepted.try_insert(edit) {
                composition.deferred.push(edit);
            }
            continue;
        };
        if winner_rule == edit.rule_id {
            diagnostics.report(
                pass,
                Some(&edit.rule_id),
                Severity::Info,
                Some(edit.extent()),
                format!("dropped: overlaps another edit of the same rule at {winner_extent}"),
            );
            composition.dropped.push(edit);
        } else {
            diagnostics.report(
                pass,
                Some(&edit.rule_id),
                Severity::Info,
                Some(edit.extent()),
                format!("deferred: conflicts with {winner_rule} at {winner_extent}"),
            );
            composition.deferred.push(edit);
        }
    }
    tracing::debug!(
        pass,
        accepted = composition.accepted.len(),
        deferred = composition.deferred.len(),
        dropped = composition.dropped.len(),
        "composed edit set"
    );
    composition
}
