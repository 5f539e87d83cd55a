//! A policy (component E): one rule tree, one script engine, and a small
//! set of flags, reference-counted so it can be shared across credentials.

use std::sync::Arc;

use crate::credential::CredentialInfo;
use crate::rule_name::RuleName;
use crate::rule_tree::RuleTree;
use crate::{CallbackOutcome, EvalArg, ScriptEngine, Verdict};

/// Flags attached to a policy at install time (see `SPEC_FULL.md` §6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyFlags {
    /// When set, a denied request should terminate the calling context
    /// rather than merely fail the call. `sandbox-core` cannot itself
    /// deliver a signal; see [`crate::evaluator::EvalOutcome::should_abort`].
    pub on_deny_abort: bool,
}

/// One loaded policy: a rule tree built by running a script once, plus the
/// script engine instance that owns any registered callbacks.
#[derive(Debug)]
pub struct Policy {
    rule_tree: RuleTree,
    engine: Arc<dyn ScriptEngine>,
    flags: PolicyFlags,
}

impl Policy {
    /// Wraps an already-built rule tree and engine into a reference-counted
    /// policy. Building the rule tree (running the script) is
    /// `sandbox-script`'s job; this crate only owns the result.
    #[must_use]
    pub fn new(rule_tree: RuleTree, engine: Arc<dyn ScriptEngine>, flags: PolicyFlags) -> Arc<Self> {
        Arc::new(Self {
            rule_tree,
            engine,
            flags,
        })
    }

    #[must_use]
    pub fn flags(&self) -> PolicyFlags {
        self.flags
    }

    #[must_use]
    pub fn rule_tree(&self) -> &RuleTree {
        &self.rule_tree
    }

    /// Explicit reference-count bump, named to match `SPEC_FULL.md` §4.E's
    /// `hold`/`release` pair; mechanically just `Arc::clone`.
    #[must_use]
    pub fn hold(policy: &Arc<Self>) -> Arc<Self> {
        Arc::clone(policy)
    }

    /// Explicit reference-count decrement; mechanically just a drop.
    pub fn release(policy: Arc<Self>) {
        drop(policy);
    }

    /// Evaluates a single rule name against this policy's rule tree,
    /// following the fixed combinator order from `SPEC_FULL.md` §4.H: an
    /// explicit `deny` trilean short-circuits immediately; a blacklist hit
    /// short-circuits to deny, a miss counts as a provisional allow; a
    /// callback returning deny short-circuits, one returning allow counts
    /// as a provisional allow; a whitelist hit returns an explicit allow,
    /// a miss returns an explicit deny. If nothing short-circuited, the
    /// result is allow if anything above counted a provisional allow,
    /// otherwise defer.
    #[must_use]
    pub fn evaluate(&self, name: &RuleName, cred: &CredentialInfo, args: &[EvalArg]) -> Verdict {
        let Some(data) = self.rule_tree.search(name) else {
            tracing::trace!(rule = %name, "no matching rule, deferring");
            return Verdict::Defer;
        };

        let mut has_allow = false;

        if let Some(trilean) = data.trilean {
            if trilean == Verdict::Deny {
                return Verdict::Deny;
            }
            if trilean == Verdict::Allow {
                has_allow = true;
            }
        }

        if let Some(blacklist) = &data.blacklist {
            if arg_path_in_list(args, blacklist) {
                tracing::debug!(rule = %name, "blacklist hit, denying");
                return Verdict::Deny;
            }
            has_allow = true;
        }

        for callback in &data.callbacks {
            match self.engine.invoke_callback(*callback, name, cred, args) {
                CallbackOutcome::Deny => {
                    tracing::debug!(rule = %name, "callback denied");
                    return Verdict::Deny;
                }
                CallbackOutcome::Allow => has_allow = true,
            }
        }

        if let Some(whitelist) = &data.whitelist {
            if arg_path_in_list(args, whitelist) {
                tracing::trace!(rule = %name, "whitelist hit, allowing");
                return Verdict::Allow;
            }
            tracing::debug!(rule = %name, "whitelist miss, denying");
            return Verdict::Deny;
        }

        if has_allow {
            Verdict::Allow
        } else {
            Verdict::Defer
        }
    }
}

fn arg_path_in_list(args: &[EvalArg], list: &crate::path::PathList) -> bool {
    args.iter().any(|arg| match arg {
        EvalArg::Vnode(path) => match path.handle() {
            Some(handle) => list.contains_handle(handle),
            None => list.contains_text(path.text()),
        },
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::CallbackRef;
    use crate::path::{NullResolver, PathList, PathRef};
    use crate::rule_tree::RuleTree;
    use parking_lot::Mutex;

    #[derive(Debug)]
    struct StubEngine(CallbackOutcome);
    impl ScriptEngine for StubEngine {
        fn invoke_callback(
            &self,
            _callback: CallbackRef,
            _rule: &RuleName,
            _cred: &CredentialInfo,
            _args: &[EvalArg],
        ) -> CallbackOutcome {
            self.0
        }
    }

    fn name(s: &str) -> RuleName {
        RuleName::parse(s).unwrap()
    }

    fn cred() -> CredentialInfo {
        CredentialInfo::default()
    }

    #[test]
    fn explicit_deny_short_circuits() {
        let mut tree = RuleTree::new();
        tree.insert(&name("process.exec"), |d| d.trilean = Some(Verdict::Deny))
            .unwrap();
        let policy = Policy::new(tree, Arc::new(StubEngine(CallbackOutcome::Allow)), PolicyFlags::default());
        assert_eq!(policy.evaluate(&name("process.exec"), &cred(), &[]), Verdict::Deny);
    }

    #[test]
    fn blacklist_hit_denies_even_with_allow_default() {
        let mut tree = RuleTree::new();
        tree.insert(&name("vnode.execute"), |d| {
            d.trilean = Some(Verdict::Allow);
            let mut bl = PathList::new();
            bl.push(PathRef::create("/bin/rm", &NullResolver));
            d.blacklist = Some(bl);
        })
        .unwrap();
        let policy = Policy::new(tree, Arc::new(StubEngine(CallbackOutcome::Allow)), PolicyFlags::default());
        let args = [EvalArg::Vnode(PathRef::create("/bin/rm", &NullResolver))];
        assert_eq!(policy.evaluate(&name("vnode.execute"), &cred(), &args), Verdict::Deny);
    }

    #[test]
    fn whitelist_hit_allows() {
        let mut tree = RuleTree::new();
        tree.insert(&name("vnode.execute"), |d| {
            let mut wl = PathList::new();
            wl.push(PathRef::create("/bin/sh", &NullResolver));
            d.whitelist = Some(wl);
        })
        .unwrap();
        let policy = Policy::new(tree, Arc::new(StubEngine(CallbackOutcome::Allow)), PolicyFlags::default());
        let args = [EvalArg::Vnode(PathRef::create("/bin/sh", &NullResolver))];
        assert_eq!(policy.evaluate(&name("vnode.execute"), &cred(), &args), Verdict::Allow);
    }

    #[test]
    fn callback_deny_short_circuits_before_whitelist() {
        let mut tree = RuleTree::new();
        tree.insert(&name("vnode.execute"), |d| {
            d.callbacks.push(CallbackRef::new(1));
            let mut wl = PathList::new();
            wl.push(PathRef::create("/bin/sh", &NullResolver));
            d.whitelist = Some(wl);
        })
        .unwrap();
        let policy = Policy::new(tree, Arc::new(StubEngine(CallbackOutcome::Deny)), PolicyFlags::default());
        let args = [EvalArg::Vnode(PathRef::create("/bin/sh", &NullResolver))];
        assert_eq!(policy.evaluate(&name("vnode.execute"), &cred(), &args), Verdict::Deny);
    }

    #[test]
    fn whitelist_miss_denies() {
        let mut tree = RuleTree::new();
        tree.insert(&name("vnode.execute"), |d| {
            let mut wl = PathList::new();
            wl.push(PathRef::create("/bin/sh", &NullResolver));
            d.whitelist = Some(wl);
        })
        .unwrap();
        let policy = Policy::new(tree, Arc::new(StubEngine(CallbackOutcome::Allow)), PolicyFlags::default());
        let args = [EvalArg::Vnode(PathRef::create("/bin/rm", &NullResolver))];
        assert_eq!(policy.evaluate(&name("vnode.execute"), &cred(), &args), Verdict::Deny);
    }

    #[test]
    fn blacklist_miss_allows_with_no_trilean_set() {
        let mut tree = RuleTree::new();
        tree.insert(&name("vnode.execute"), |d| {
            let mut bl = PathList::new();
            bl.push(PathRef::create("/bin/rm", &NullResolver));
            d.blacklist = Some(bl);
        })
        .unwrap();
        let policy = Policy::new(tree, Arc::new(StubEngine(CallbackOutcome::Allow)), PolicyFlags::default());
        let args = [EvalArg::Vnode(PathRef::create("/bin/sh", &NullResolver))];
        assert_eq!(policy.evaluate(&name("vnode.execute"), &cred(), &args), Verdict::Allow);
    }

    #[test]
    fn callback_allow_with_no_trilean_set_allows() {
        let mut tree = RuleTree::new();
        tree.insert(&name("network.bind"), |d| {
            d.callbacks.push(CallbackRef::new(1));
        })
        .unwrap();
        let policy = Policy::new(tree, Arc::new(StubEngine(CallbackOutcome::Allow)), PolicyFlags::default());
        assert_eq!(policy.evaluate(&name("network.bind"), &cred(), &[]), Verdict::Allow);
    }

    #[test]
    fn callback_receives_the_rule_and_credential_being_evaluated() {
        #[derive(Debug)]
        struct RecordingEngine(Mutex<Option<(RuleName, CredentialInfo)>>);
        impl ScriptEngine for RecordingEngine {
            fn invoke_callback(
                &self,
                _callback: CallbackRef,
                rule: &RuleName,
                cred: &CredentialInfo,
                _args: &[EvalArg],
            ) -> CallbackOutcome {
                *self.0.lock() = Some((rule.clone(), cred.clone()));
                CallbackOutcome::Allow
            }
        }

        let mut tree = RuleTree::new();
        tree.insert(&name("network.bind"), |d| d.callbacks.push(CallbackRef::new(1)))
            .unwrap();
        let engine = Arc::new(RecordingEngine(Mutex::new(None)));
        let policy = Policy::new(tree, engine.clone(), PolicyFlags::default());
        let subject = CredentialInfo {
            uid: 1000,
            euid: 0,
            ..CredentialInfo::default()
        };
        policy.evaluate(&name("network.bind"), &subject, &[]);

        let (rule, cred) = engine.0.lock().clone().unwrap();
        assert_eq!(rule, name("network.bind"));
        assert_eq!(cred, subject);
    }

    #[derive(Debug)]
    struct PerIdEngine;
    impl ScriptEngine for PerIdEngine {
        fn invoke_callback(
            &self,
            callback: CallbackRef,
            _rule: &RuleName,
            _cred: &CredentialInfo,
            _args: &[EvalArg],
        ) -> CallbackOutcome {
            if callback.id() == 2 {
                CallbackOutcome::Deny
            } else {
                CallbackOutcome::Allow
            }
        }
    }

    #[test]
    fn second_callback_denies_even_when_first_allows() {
        let mut tree = RuleTree::new();
        tree.insert(&name("vnode.execute"), |d| {
            d.callbacks.push(CallbackRef::new(1));
            d.callbacks.push(CallbackRef::new(2));
        })
        .unwrap();
        let policy = Policy::new(tree, Arc::new(PerIdEngine), PolicyFlags::default());
        assert_eq!(policy.evaluate(&name("vnode.execute"), &cred(), &[]), Verdict::Deny);
    }

    #[test]
    fn no_matching_rule_defers() {
        let tree = RuleTree::new();
        let policy = Policy::new(tree, Arc::new(StubEngine(CallbackOutcome::Allow)), PolicyFlags::default());
        assert_eq!(policy.evaluate(&name("system"), &cred(), &[]), Verdict::Defer);
    }

    #[test]
    fn hold_and_release_track_strong_count() {
        let tree = RuleTree::new();
        let policy = Policy::new(tree, Arc::new(StubEngine(CallbackOutcome::Allow)), PolicyFlags::default());
        assert_eq!(Arc::strong_count(&policy), 1);
        let held = Policy::hold(&policy);
        assert_eq!(Arc::strong_count(&policy), 2);
        Policy::release(held);
        assert_eq!(Arc::strong_count(&policy), 1);
    }
}
