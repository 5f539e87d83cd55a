//! The policy stack (component F): a persistent, singly-linked list of
//! policies attached to a credential.
//!
//! `copy()` is just cloning the head `Arc`, so two stacks built from one
//! `copy()` call share every existing node and only diverge on pushes made
//! after the copy (see `SPEC_FULL.md` §4.F and `DESIGN.md`'s grounding
//! note).

use std::sync::Arc;

use crate::credential::CredentialInfo;
use crate::policy::Policy;
use crate::rule_name::RuleName;
use crate::{EvalArg, Verdict};

#[derive(Debug)]
struct StackNode {
    policy: Arc<Policy>,
    tail: Option<Arc<StackNode>>,
}

/// A stack of policies, evaluated head-to-tail. Cloning a `PolicyStack` is
/// O(1): it clones the `Arc` pointing at the head node, not the list.
#[derive(Debug, Clone, Default)]
pub struct PolicyStack(Option<Arc<StackNode>>);

impl PolicyStack {
    #[must_use]
    pub fn new() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Returns a new stack with `policy` pushed on top. The receiver is
    /// left unchanged — existing stacks sharing this tail are unaffected.
    #[must_use]
    pub fn push(&self, policy: Arc<Policy>) -> Self {
        Self(Some(Arc::new(StackNode {
            policy,
            tail: self.0.clone(),
        })))
    }

    /// Aliases this stack's head. The returned stack and `self` observe
    /// the same policies until one of them is pushed onto again.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    #[must_use]
    pub fn iter(&self) -> StackIter<'_> {
        StackIter {
            next: self.0.as_deref(),
        }
    }

    /// Evaluates `name` against every policy in the stack, head to tail.
    ///
    /// An explicit deny from any policy short-circuits the whole stack to
    /// `Deny`. An allow from any policy sets a pending-allow flag but does
    /// not stop the walk, since a later (lower-priority) policy could still
    /// deny. If no policy denies or allows, the result is `Defer`.
    #[must_use]
    pub fn evaluate(&self, name: &RuleName, cred: &CredentialInfo, args: &[EvalArg]) -> Verdict {
        let mut pending_allow = false;
        for policy in self.iter() {
            match policy.evaluate(name, cred, args) {
                Verdict::Deny => return Verdict::Deny,
                Verdict::Allow => pending_allow = true,
                Verdict::Defer => {}
            }
        }
        if pending_allow {
            Verdict::Allow
        } else {
            Verdict::Defer
        }
    }
}

/// Iterates a [`PolicyStack`] head to tail, yielding each policy.
pub struct StackIter<'a> {
    next: Option<&'a StackNode>,
}

impl<'a> Iterator for StackIter<'a> {
    type Item = &'a Arc<Policy>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.tail.as_deref();
        Some(&node.policy)
    }
}
