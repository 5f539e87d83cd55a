//! Core types for the process sandboxing security module: the rule tree,
//! the per-policy and per-stack evaluators, and the credential glue that
//! keeps a policy stack attached to a subject.
//!
//! This crate knows nothing about Lua or any other embedding language — the
//! policy language binding lives in `sandbox-script`, which implements
//! [`ScriptEngine`] against this crate's types.

pub mod callback;
pub mod credential;
pub mod error;
pub mod evaluator;
pub mod path;
pub mod policy;
pub mod rule_name;
pub mod rule_tree;
pub mod stack;

pub use callback::CallbackRef;
pub use credential::CredentialInfo;
pub use error::{RuleNameError, SandboxError};
pub use path::{FsObjectHandle, PathList, PathRef, VnodeKind, VnodeResolver, VnodeStat};
pub use policy::{Policy, PolicyFlags};
pub use rule_name::RuleName;
pub use rule_tree::{RuleData, RuleTree};
pub use stack::PolicyStack;

/// The three-valued authorization verdict every evaluation ultimately
/// reduces to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
    Defer,
}

/// A typed stand-in for the kernel object a rule-name's arguments describe,
/// replacing the original's format-string-plus-`va_list` pairing (see
/// `SPEC_FULL.md` §4.G).
#[derive(Debug, Clone)]
pub enum EvalArg {
    Vnode(PathRef),
    Process(ProcessInfo),
    Int(i64),
    Socket(SocketInfo),
    Sockaddr(SockAddr),
}

/// Process identity fields marshalled to scripts for process-scope checks,
/// matching the original's `proc = { pid, ppid, nice, comm }` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: i32,
    pub ppid: i32,
    pub nice: i32,
    pub comm: String,
}

/// Socket creation fields marshalled to scripts for `network.socket` checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketInfo {
    pub domain: i32,
    pub kind: i32,
    pub protocol: i32,
}

/// A socket address marshalled to scripts for `network.bind`/`connect`
/// checks. Only the families the original source binds (`AF_INET`,
/// `AF_INET6`, `AF_UNIX`) are represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SockAddr {
    Inet { address: [u8; 4], port: u16 },
    Inet6 { address: [u8; 16], port: u16 },
    Unix { path: String },
}

/// A callback's outcome is always boolean by the time it reaches the rule
/// tree evaluator: the embedding engine is responsible for catching script
/// errors and turning them into `Deny` before this type is produced (see
/// `SPEC_FULL.md` §7, `CallbackFailure`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Allow,
    Deny,
}

/// The non-reentrant script engine a loaded policy owns, invoked only when
/// the evaluator reaches a callback rule.
///
/// Implemented by `sandbox-script::LuaEngine`; kept as a trait object here
/// so `sandbox-core` has no dependency on any particular embedding engine.
pub trait ScriptEngine: std::fmt::Debug + Send + Sync {
    /// Invokes the callback previously registered under `callback`, passing
    /// the evaluated `rule`, the subject's `cred`, and `args` as its
    /// arguments (in that order, matching `sandbox_lua_docallback`'s
    /// `rule`/`cred`-then-format-args push order), and returns the
    /// resulting verdict. Must never panic or propagate a script error;
    /// both are caught internally and mapped to [`CallbackOutcome::Deny`],
    /// matching the original's "callback errors always deny" behavior.
    fn invoke_callback(
        &self,
        callback: CallbackRef,
        rule: &RuleName,
        cred: &CredentialInfo,
        args: &[EvalArg],
    ) -> CallbackOutcome;
}
