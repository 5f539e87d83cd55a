use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sandbox_core::credential::Credential;
use sandbox_core::path::NullResolver;
use sandbox_core::rule_name::RuleName;
use sandbox_core::{EvalArg, PathRef, Verdict};
use sandbox_device::{DeviceRequest, DeviceResponse, MockDevice, SandboxDevice};

#[derive(Parser)]
#[command(name = "sandbox-cli", version, about = "Load a sandbox policy script and evaluate synthetic requests against it")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a policy script and evaluate one rule name against it.
    Check {
        /// Path to the policy script.
        script: PathBuf,

        /// Dotted rule name to evaluate, e.g. "process.fork" or
        /// "vnode.execute".
        #[arg(long)]
        rule: String,

        /// Path argument to attach, for vnode-scoped rules.
        #[arg(long)]
        path: Option<String>,

        /// Install with the `ON_DENY_ABORT` flag set.
        #[arg(long)]
        on_deny_abort: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    std::process::exit(dispatch(cli));
}

fn dispatch(cli: Cli) -> i32 {
    match cli.command {
        Command::Check { script, rule, path, on_deny_abort } => run_check(&script, &rule, path.as_deref(), on_deny_abort),
    }
}

fn run_check(script_path: &PathBuf, rule: &str, path: Option<&str>, on_deny_abort: bool) -> i32 {
    let script = match std::fs::read_to_string(script_path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: failed to read {}: {err}", script_path.display());
            return 2;
        }
    };

    let name = match RuleName::parse(rule) {
        Ok(n) => n,
        Err(err) => {
            eprintln!("error: invalid rule name '{rule}': {err}");
            return 2;
        }
    };

    let device = MockDevice::new();
    let cred = Credential::new();
    let flags = if on_deny_abort { sandbox_device::FLAG_ON_DENY_ABORT } else { 0 };
    let resp = device.ioctl(&cred, DeviceRequest::SetSpec { script, flags });
    if let DeviceResponse::SetSpec(Err(err)) = resp {
        eprintln!("error: failed to install policy: {err}");
        return 2;
    }

    let args: Vec<EvalArg> = match path {
        Some(p) => vec![EvalArg::Vnode(PathRef::create(p, &NullResolver))],
        None => Vec::new(),
    };

    let verdict = cred.evaluate(&name, &args);
    println!("{rule}: {}", format_verdict(verdict));

    match verdict {
        Verdict::Allow => 0,
        Verdict::Deny => 1,
        Verdict::Defer => 3,
    }
}

fn format_verdict(v: Verdict) -> &'static str {
    match v {
        Verdict::Allow => "allow",
        Verdict::Deny => "deny",
        Verdict::Defer => "defer",
    }
}

