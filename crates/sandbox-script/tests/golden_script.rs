//! A single, complete policy script exercising every DSL entry point
//! together — `default`, `allow`, `deny`, `on`, `paths_allow`,
//! `paths_deny` — loaded once and evaluated from several angles, the way
//! an installer smoke-testing a real policy file would.

use sandbox_core::credential::CredentialInfo;
use sandbox_core::path::{NullResolver, PathRef};
use sandbox_core::rule_name::RuleName;
use sandbox_core::{EvalArg, Verdict};

const SCRIPT: &str = r#"
    sandbox.default("deny")
    sandbox.on_deny_abort(true)

    sandbox.allow("process")
    sandbox.deny("process.ptrace")

    sandbox.on("network.bind", function(rule, cred, addr)
        return addr.port >= 1024
    end)

    sandbox.paths_allow("read_data", {"/etc/passwd", "/etc/hosts"})
    sandbox.paths_deny("write_data", {"/etc/shadow"})
"#;

fn rule(s: &str) -> RuleName {
    RuleName::parse(s).unwrap()
}

fn anon() -> CredentialInfo {
    CredentialInfo::default()
}

#[test]
fn golden_script_loads_and_sets_the_on_deny_abort_flag() {
    let policy = sandbox_script::load_policy(SCRIPT).unwrap();
    assert!(policy.flags().on_deny_abort);
}

#[test]
fn golden_script_root_default_denies_unlisted_scopes() {
    let policy = sandbox_script::load_policy(SCRIPT).unwrap();
    assert_eq!(policy.evaluate(&rule("machdep.cpu_control"), &anon(), &[]), Verdict::Deny);
}

#[test]
fn golden_script_allows_process_but_carves_out_ptrace() {
    let policy = sandbox_script::load_policy(SCRIPT).unwrap();
    assert_eq!(policy.evaluate(&rule("process.fork"), &anon(), &[]), Verdict::Allow);
    assert_eq!(policy.evaluate(&rule("process.ptrace"), &anon(), &[]), Verdict::Deny);
}

#[test]
fn golden_script_callback_gates_bind_by_port() {
    let policy = sandbox_script::load_policy(SCRIPT).unwrap();
    let privileged = [EvalArg::Sockaddr(sandbox_core::SockAddr::Inet {
        address: [0, 0, 0, 0],
        port: 80,
    })];
    let unprivileged = [EvalArg::Sockaddr(sandbox_core::SockAddr::Inet {
        address: [0, 0, 0, 0],
        port: 8080,
    })];
    assert_eq!(policy.evaluate(&rule("network.bind"), &anon(), &privileged), Verdict::Deny);
    assert_eq!(policy.evaluate(&rule("network.bind"), &anon(), &unprivileged), Verdict::Allow);
}

#[test]
fn golden_script_paths_allow_and_deny_gate_their_own_actions_only() {
    let policy = sandbox_script::load_policy(SCRIPT).unwrap();

    let passwd = [EvalArg::Vnode(PathRef::create("/etc/passwd", &NullResolver))];
    let unlisted_read = [EvalArg::Vnode(PathRef::create("/etc/other", &NullResolver))];
    assert_eq!(policy.evaluate(&rule("vnode.read_data"), &anon(), &passwd), Verdict::Allow);
    assert_eq!(policy.evaluate(&rule("vnode.read_data"), &anon(), &unlisted_read), Verdict::Deny);

    let shadow = [EvalArg::Vnode(PathRef::create("/etc/shadow", &NullResolver))];
    let unlisted_write = [EvalArg::Vnode(PathRef::create("/tmp/scratch", &NullResolver))];
    assert_eq!(policy.evaluate(&rule("vnode.write_data"), &anon(), &shadow), Verdict::Deny);
    assert_eq!(policy.evaluate(&rule("vnode.write_data"), &anon(), &unlisted_write), Verdict::Allow);
}
