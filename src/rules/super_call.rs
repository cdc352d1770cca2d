//! Delete a no-argument `super();` at the start of a constructor.

use crate::edit::{Candidate, Rewrite};
use crate::rules::support::arguments;
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::NodeKind;

pub struct RemoveRedundantSuperCall {
    descriptor: RuleDescriptor,
}

impl RemoveRedundantSuperCall {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "remove_redundant_super_call",
                "Remove the implicit super() call from constructors",
                Shape::LocalReplace,
            ),
        }
    }
}

impl Rule for RemoveRedundantSuperCall {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        let mut found = Vec::new();
        for body in tree.ids() {
            if tree.kind(body) != NodeKind::ConstructorBody {
                continue;
            }
            let Some(&first) = tree.statements(body).first() else {
                continue;
            };
            if tree.kind(first) != NodeKind::ExplicitConstructorInvocation
                || !tree
                    .child_by_field(first, "constructor")
                    .is_some_and(|callee| tree.kind(callee) == NodeKind::Super)
                || tree.child_by_field(first, "object").is_some()
                || !arguments(tree, first).is_empty()
            {
                continue;
            }
            let mut candidate = Candidate::new(
                first,
                Rewrite::delete(tree, tree.deletion_span(first)),
                "remove redundant super()",
            );
            for comment in tree.comments().trailing_of(first) {
                candidate = candidate.with_droppable_comment(comment.span);
            }
            found.push(candidate);
        }
        Ok(found)
    }
}
