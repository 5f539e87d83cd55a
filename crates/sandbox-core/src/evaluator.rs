//! The evaluator (component H/I): turns a kauth-style scope and action into
//! a [`RuleName`], picks the right [`EvalArg`] slice, and asks a
//! [`PolicyStack`] for a verdict.
//!
//! Action enums here replace the original's integer action codes indexed
//! into a parallel string array — the lookup the original performs at
//! runtime is, in Rust, just a `match` arm, so the "string map" becomes a
//! `segment()` method rather than a `static` array walked by index.

use crate::credential::CredentialInfo;
use crate::path::PathRef;
use crate::rule_name::RuleName;
use crate::stack::PolicyStack;
use crate::{EvalArg, ProcessInfo, SockAddr, SocketInfo, Verdict};

/// The outcome of a full evaluation: the verdict itself, plus whether the
/// owning policy's `on_deny_abort` flag was set. `sandbox-core` cannot
/// deliver a signal to terminate a calling context — that decision belongs
/// to whatever embeds this crate (see `SPEC_FULL.md` §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOutcome {
    pub verdict: Verdict,
    pub should_abort: bool,
}

fn finish(
    stack: &PolicyStack,
    name: &RuleName,
    cred: &CredentialInfo,
    args: &[EvalArg],
    on_deny_abort: bool,
) -> EvalOutcome {
    let verdict = stack.evaluate(name, cred, args);
    EvalOutcome {
        verdict,
        should_abort: on_deny_abort && verdict == Verdict::Deny,
    }
}

/// `system.*` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAction {
    Swapctl,
    Sysctl,
    Time,
    Reboot,
    Accounting,
    Chroot,
    FsQuota,
    FsSnapshot,
    Semaphore,
    Sysvipc,
    Module,
    Pset,
    Debug,
}

impl SystemAction {
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::Swapctl => "swapctl",
            Self::Sysctl => "sysctl",
            Self::Time => "time",
            Self::Reboot => "reboot",
            Self::Accounting => "accounting",
            Self::Chroot => "chroot",
            Self::FsQuota => "fs_quota",
            Self::FsSnapshot => "fs_snapshot",
            Self::Semaphore => "semaphore",
            Self::Sysvipc => "sysvipc",
            Self::Module => "module",
            Self::Pset => "pset",
            Self::Debug => "debug",
        }
    }
}

/// `process.*` actions. `Nice` carries the requested niceness value: the
/// original evaluates it with the "pi" format (process table plus a plain
/// integer), the one `process` action this reimplementation's action table
/// gives an action-specific argument to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessAction {
    Cansee,
    Corename,
    Fork,
    Exec,
    KeventFilter,
    Nice(i32),
    Ptrace,
    Rlimit,
    Scheduler,
    Setid,
    Stopflag,
    Unveil,
}

impl ProcessAction {
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::Cansee => "cansee",
            Self::Corename => "corename",
            Self::Fork => "fork",
            Self::Exec => "exec",
            Self::KeventFilter => "kevent_filter",
            Self::Nice(_) => "nice",
            Self::Ptrace => "ptrace",
            Self::Rlimit => "rlimit",
            Self::Scheduler => "scheduler",
            Self::Setid => "setid",
            Self::Stopflag => "stopflag",
            Self::Unveil => "unveil",
        }
    }
}

/// `network.*` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkAction {
    Bind,
    Connect,
    Firewall,
    Forwsrcrt,
    Interface,
    Ipv6,
    Nfs,
    Route,
    Socket,
    Bridge,
    Ipsec,
}

impl NetworkAction {
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::Bind => "bind",
            Self::Connect => "connect",
            Self::Firewall => "firewall",
            Self::Forwsrcrt => "forwsrcrt",
            Self::Interface => "interface",
            Self::Ipv6 => "ipv6",
            Self::Nfs => "nfs",
            Self::Route => "route",
            Self::Socket => "socket",
            Self::Bridge => "bridge",
            Self::Ipsec => "ipsec",
        }
    }
}

/// `machdep.*` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachdepAction {
    CpuUcode,
    Iopl,
    Ldt,
    Mtrr,
    Nvram,
    Cacheflush,
    Perfmon,
}

impl MachdepAction {
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::CpuUcode => "cpu_ucode",
            Self::Iopl => "iopl",
            Self::Ldt => "ldt",
            Self::Mtrr => "mtrr",
            Self::Nvram => "nvram",
            Self::Cacheflush => "cacheflush",
            Self::Perfmon => "perfmon",
        }
    }
}

/// `device.*` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    Bluetooth,
    Gpio,
    RawIo,
    Tty,
}

impl DeviceAction {
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::Bluetooth => "bluetooth",
            Self::Gpio => "gpio",
            Self::RawIo => "raw_io",
            Self::Tty => "tty",
        }
    }
}

/// The vnode access bits, in the fixed scan order the original evaluates
/// them in. `Execute` is scanned before every other bit and, when set,
/// short-circuits the whole vnode evaluation to `Defer` regardless of what
/// any other bit or rule would say — an intentionally-preserved historical
/// quirk with no documented rationale (see `DESIGN.md`, Open Question 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VnodeBit {
    ReadData,
    WriteData,
    Execute,
    Delete,
    AppendData,
    ReadTimes,
    WriteTimes,
    ReadFlags,
    WriteFlags,
    ReadSysflags,
    WriteSysflags,
    Rename,
    ChangeOwnership,
    ReadSecurity,
    WriteSecurity,
    ReadAttributes,
    WriteAttributes,
    ReadExtattributes,
    WriteExtattributes,
    RetainSuid,
    RegainSgid,
    Revoke,
}

impl VnodeBit {
    /// The full scan order, `Execute` first.
    pub const SCAN_ORDER: &'static [VnodeBit] = &[
        Self::Execute,
        Self::ReadData,
        Self::WriteData,
        Self::Delete,
        Self::AppendData,
        Self::ReadTimes,
        Self::WriteTimes,
        Self::ReadFlags,
        Self::WriteFlags,
        Self::ReadSysflags,
        Self::WriteSysflags,
        Self::Rename,
        Self::ChangeOwnership,
        Self::ReadSecurity,
        Self::WriteSecurity,
        Self::ReadAttributes,
        Self::WriteAttributes,
        Self::ReadExtattributes,
        Self::WriteExtattributes,
        Self::RetainSuid,
        Self::RegainSgid,
        Self::Revoke,
    ];

    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::ReadData => "read_data",
            Self::WriteData => "write_data",
            Self::Execute => "execute",
            Self::Delete => "delete",
            Self::AppendData => "append_data",
            Self::ReadTimes => "read_times",
            Self::WriteTimes => "write_times",
            Self::ReadFlags => "read_flags",
            Self::WriteFlags => "write_flags",
            Self::ReadSysflags => "read_sysflags",
            Self::WriteSysflags => "write_sysflags",
            Self::Rename => "rename",
            Self::ChangeOwnership => "change_ownership",
            Self::ReadSecurity => "read_security",
            Self::WriteSecurity => "write_security",
            Self::ReadAttributes => "read_attributes",
            Self::WriteAttributes => "write_attributes",
            Self::ReadExtattributes => "read_extattributes",
            Self::WriteExtattributes => "write_extattributes",
            Self::RetainSuid => "retain_suid",
            Self::RegainSgid => "regain_sgid",
            Self::Revoke => "revoke",
        }
    }
}

pub fn eval_system(
    stack: &PolicyStack,
    cred: &CredentialInfo,
    action: SystemAction,
    on_deny_abort: bool,
) -> EvalOutcome {
    let name = RuleName::from_segments(&["system", action.segment()]);
    finish(stack, &name, cred, &[], on_deny_abort)
}

pub fn eval_process(
    stack: &PolicyStack,
    cred: &CredentialInfo,
    action: ProcessAction,
    target: ProcessInfo,
    on_deny_abort: bool,
) -> EvalOutcome {
    let name = RuleName::from_segments(&["process", action.segment()]);
    let mut args = vec![EvalArg::Process(target)];
    if let ProcessAction::Nice(n) = action {
        args.push(EvalArg::Int(i64::from(n)));
    }
    finish(stack, &name, cred, &args, on_deny_abort)
}

pub fn eval_network_socket(
    stack: &PolicyStack,
    cred: &CredentialInfo,
    socket: SocketInfo,
    on_deny_abort: bool,
) -> EvalOutcome {
    let name = RuleName::from_segments(&["network", NetworkAction::Socket.segment()]);
    let args = [EvalArg::Int(socket.domain as i64), EvalArg::Int(socket.kind as i64), EvalArg::Int(socket.protocol as i64)];
    finish(stack, &name, cred, &args, on_deny_abort)
}

pub fn eval_network_address(
    stack: &PolicyStack,
    cred: &CredentialInfo,
    action: NetworkAction,
    socket: SocketInfo,
    addr: SockAddr,
    on_deny_abort: bool,
) -> EvalOutcome {
    let name = RuleName::from_segments(&["network", action.segment()]);
    let args = [EvalArg::Socket(socket), EvalArg::Sockaddr(addr)];
    finish(stack, &name, cred, &args, on_deny_abort)
}

pub fn eval_machdep(
    stack: &PolicyStack,
    cred: &CredentialInfo,
    action: MachdepAction,
    on_deny_abort: bool,
) -> EvalOutcome {
    let name = RuleName::from_segments(&["machdep", action.segment()]);
    finish(stack, &name, cred, &[], on_deny_abort)
}

pub fn eval_device(
    stack: &PolicyStack,
    cred: &CredentialInfo,
    action: DeviceAction,
    on_deny_abort: bool,
) -> EvalOutcome {
    let name = RuleName::from_segments(&["device", action.segment()]);
    finish(stack, &name, cred, &[], on_deny_abort)
}

/// Evaluates a vnode access request. Finds the first bit in
/// [`VnodeBit::SCAN_ORDER`] that was actually requested and evaluates only
/// that one — never more than one rule-tree lookup per call, and never a
/// second bit even if the first defers. The moment the match is `execute`,
/// the whole call returns `Defer` without consulting the rule tree at all;
/// preserved verbatim from the original, which documents no rationale for
/// the behavior. Both of these match `sandbox_list_evalvnode`, whose own
/// `/* TODO: loop through all actions */` comment confirms that evaluating
/// only the first set bit is the intended (if unfinished) behavior, not an
/// oversight to fix here.
pub fn eval_vnode(
    stack: &PolicyStack,
    cred: &CredentialInfo,
    requested: &[VnodeBit],
    path: &PathRef,
    on_deny_abort: bool,
) -> EvalOutcome {
    let Some(bit) = VnodeBit::SCAN_ORDER.iter().find(|bit| requested.contains(bit)) else {
        return EvalOutcome {
            verdict: Verdict::Defer,
            should_abort: false,
        };
    };

    if *bit == VnodeBit::Execute {
        tracing::trace!("vnode execute bit set, deferring unconditionally");
        return EvalOutcome {
            verdict: Verdict::Defer,
            should_abort: false,
        };
    }

    let name = RuleName::from_segments(&["vnode", bit.segment()]);
    let args = [EvalArg::Vnode(path.clone())];
    finish(stack, &name, cred, &args, on_deny_abort)
}
