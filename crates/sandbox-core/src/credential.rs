//! Credential glue (component I): keeps a [`PolicyStack`] pinned to a
//! subject across copy, fork, and free, mirroring
//! `secmodel_sandbox_cred_cb`'s handling of `KAUTH_CRED_COPY` /
//! `KAUTH_CRED_FORK` / `KAUTH_CRED_FREE`.

use parking_lot::Mutex;

use crate::stack::PolicyStack;

/// The identity fields marshalled to scripts as the `cred` table, matching
/// the original's `sandbox_lua_pushcred` (`uid`, `euid`, `svuid`, `gid`,
/// `egid`, `svgid`, `groups`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialInfo {
    pub uid: u32,
    pub euid: u32,
    pub svuid: u32,
    pub gid: u32,
    pub egid: u32,
    pub svgid: u32,
    pub groups: Vec<u32>,
}

/// A subject's attached policy stack plus the identity fields a callback's
/// marshalled `cred` table is built from. Real kernel credentials carry a
/// great deal more than this; only the sandbox-relevant slice is modeled
/// here.
#[derive(Debug, Default)]
pub struct Credential {
    stack: Mutex<PolicyStack>,
    identity: Mutex<CredentialInfo>,
}

impl Credential {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: Mutex::new(PolicyStack::new()),
            identity: Mutex::new(CredentialInfo::default()),
        }
    }

    /// Builds a credential that starts out already carrying `stack` (used
    /// when a fresh subject inherits a stack directly, bypassing `attach`).
    #[must_use]
    pub fn with_stack(stack: PolicyStack) -> Self {
        Self {
            stack: Mutex::new(stack),
            identity: Mutex::new(CredentialInfo::default()),
        }
    }

    /// Replaces this credential's policy stack, as installation
    /// (`sandbox-device`'s `SetSpec`) does.
    pub fn attach(&self, stack: PolicyStack) {
        *self.stack.lock() = stack;
        tracing::debug!("policy stack attached to credential");
    }

    #[must_use]
    pub fn stack(&self) -> PolicyStack {
        self.stack.lock().copy()
    }

    /// Replaces this credential's identity fields.
    pub fn set_identity(&self, identity: CredentialInfo) {
        *self.identity.lock() = identity;
    }

    #[must_use]
    pub fn identity(&self) -> CredentialInfo {
        self.identity.lock().clone()
    }

    /// Evaluates `name` against this credential's attached stack, using its
    /// own identity for any callback's marshalled `cred` table.
    #[must_use]
    pub fn evaluate(&self, name: &crate::rule_name::RuleName, args: &[crate::EvalArg]) -> crate::Verdict {
        self.stack().evaluate(name, &self.identity(), args)
    }

    /// `KAUTH_CRED_COPY`: produces a new credential whose stack aliases
    /// this one's head, carrying over the same identity fields. The two
    /// credentials only diverge if one of them is later `attach`ed to or
    /// `set_identity`'d, or if a policy is pushed onto one of their stacks
    /// directly.
    #[must_use]
    pub fn on_copy(&self) -> Self {
        let copy = Self::with_stack(self.stack.lock().copy());
        copy.set_identity(self.identity());
        copy
    }

    /// `KAUTH_CRED_FORK`: in the original, fork is implemented in terms of
    /// copy — the child credential is duplicated, then the copy hook runs
    /// on it. This reimplementation preserves that relationship rather than
    /// treating fork as a distinct mechanism.
    #[must_use]
    pub fn on_fork(&self) -> Self {
        self.on_copy()
    }

    /// `KAUTH_CRED_FREE`: drops this credential's stack. Each policy's
    /// reference count is decremented automatically as the stack's `Arc`
    /// chain is dropped; there is no manual traversal to perform.
    pub fn on_free(&self) {
        *self.stack.lock() = PolicyStack::new();
    }
}
