use thiserror::Error;

/// Errors produced while loading or running a policy script.
///
/// Runtime callback errors never reach this type — `sandbox-core`'s
/// `ScriptEngine::invoke_callback` contract requires catching those and
/// mapping them to a deny verdict locally (see `SPEC_FULL.md` §7).
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to parse or compile script: {0}")]
    Load(#[source] mlua::Error),

    #[error("script raised an error while building the policy: {0}")]
    Runtime(#[source] mlua::Error),

    #[error("script exceeded the memory budget while loading")]
    OutOfMemory,

    #[error("sandbox.{function}() called with the wrong argument type: {detail}")]
    BadArgument { function: &'static str, detail: String },

    #[error("rule name or rule-tree structure error: {0}")]
    Sandbox(#[from] sandbox_core::error::SandboxError),
}

impl ScriptError {
    /// Maps this error to the `EINVAL`/`ENOMEM` distinction the
    /// installation transport surfaces (`SPEC_FULL.md` §6/§7).
    #[must_use]
    pub fn installer_errno(&self) -> Errno {
        match self {
            Self::OutOfMemory => Errno::Enomem,
            Self::Load(_) | Self::Runtime(_) | Self::BadArgument { .. } | Self::Sandbox(_) => {
                Errno::Einval
            }
        }
    }
}

/// The two installation error codes the original device surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    Einval,
    Enomem,
}
