//! The concrete script engine (component G): a single, non-reentrant
//! `mlua::Lua` state behind an exclusive lock, matching the original's
//! `klua_lock`/`klua_unlock` pairing around every load or call.

use mlua::{Function, Lua, RegistryKey};
use parking_lot::Mutex;
use sandbox_core::credential::CredentialInfo;
use sandbox_core::rule_name::RuleName;
use sandbox_core::{CallbackOutcome, CallbackRef};

use crate::marshal::push_callback_args;

/// Owns the Lua state a loaded policy's callbacks live in.
///
/// The state is locked for the full duration of any load or call, so two
/// threads evaluating the same policy concurrently serialize on it rather
/// than racing inside the (non-reentrant) Lua interpreter.
pub struct LuaEngine {
    lua: Mutex<Lua>,
    callbacks: Mutex<Vec<RegistryKey>>,
}

impl std::fmt::Debug for LuaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaEngine")
            .field("callbacks", &self.callbacks.lock().len())
            .finish_non_exhaustive()
    }
}

impl LuaEngine {
    /// Builds an engine from a `Lua` state that has already had a policy
    /// script run against it, adopting the registry keys `sandbox.on`
    /// collected while loading (see `dsl::load`).
    pub(crate) fn new(lua: Lua, callbacks: Vec<RegistryKey>) -> Self {
        Self {
            lua: Mutex::new(lua),
            callbacks: Mutex::new(callbacks),
        }
    }
}

impl sandbox_core::ScriptEngine for LuaEngine {
    fn invoke_callback(
        &self,
        callback: CallbackRef,
        rule: &RuleName,
        cred: &CredentialInfo,
        args: &[sandbox_core::EvalArg],
    ) -> CallbackOutcome {
        let lua = self.lua.lock();
        let callbacks = self.callbacks.lock();
        let Some(key) = callbacks.get(callback.id() as usize) else {
            tracing::error!(id = callback.id(), "callback reference out of range, denying");
            return CallbackOutcome::Deny;
        };

        let outcome = (|| -> mlua::Result<bool> {
            let function: Function<'_> = lua.registry_value(key)?;
            let lua_args = push_callback_args(&lua, rule, cred, args)?;
            let result: bool = function.call(mlua::MultiValue::from_vec(lua_args))?;
            Ok(result)
        })();

        match outcome {
            Ok(true) => CallbackOutcome::Allow,
            Ok(false) => CallbackOutcome::Deny,
            Err(err) => {
                tracing::warn!(error = %err, "policy callback raised an error, denying");
                CallbackOutcome::Deny
            }
        }
    }
}
