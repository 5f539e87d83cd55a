//! Embedded Lua policy DSL (component G): turns a policy script into a
//! [`sandbox_core::RuleTree`] plus a live [`LuaEngine`] for later callback
//! invocations, and nothing else — `sandbox-script` exposes no way to run
//! a script against a policy that already has callbacks registered
//! elsewhere; each call to [`load_policy`] builds one self-contained
//! `Lua` state.

mod consts;
mod dsl;
mod engine;
pub mod error;
mod marshal;

use std::sync::Arc;

use mlua::Lua;
use sandbox_core::path::{NullResolver, VnodeResolver};
use sandbox_core::{Policy, PolicyFlags, RuleTree};

pub use engine::LuaEngine;
pub use error::ScriptError;

/// Loads `script`, running it against a fresh Lua state with the `sandbox`
/// DSL table and integer constants installed, and returns the resulting
/// policy — ready to be pushed onto a [`sandbox_core::PolicyStack`].
pub fn load_policy(script: &str) -> Result<Arc<Policy>, ScriptError> {
    load_policy_with_resolver(script, Arc::new(NullResolver))
}

/// As [`load_policy`], but resolving `paths_allow`/`paths_deny` entries
/// through `resolver` instead of the no-op [`NullResolver`].
pub fn load_policy_with_resolver(
    script: &str,
    resolver: Arc<dyn VnodeResolver + Send + Sync>,
) -> Result<Arc<Policy>, ScriptError> {
    let lua = Lua::new();

    let (tree, flags, callbacks) = dsl::load(&lua, script, resolver)?;
    let engine = Arc::new(LuaEngine::new(lua, callbacks));

    Ok(Policy::new(tree, engine, flags))
}

/// Builds a policy directly from an already-assembled rule tree, skipping
/// the DSL entirely. Used by tests and by `sandbox-cli`'s fixture mode,
/// which construct rule trees programmatically rather than from a script.
#[must_use]
pub fn policy_from_tree(tree: RuleTree, flags: PolicyFlags) -> Arc<Policy> {
    let lua = Lua::new();
    Policy::new(tree, Arc::new(LuaEngine::new(lua, Vec::new())), flags)
}
