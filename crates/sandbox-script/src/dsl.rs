//! Installs the `sandbox` global DSL table a policy script runs against:
//! `default`, `on_deny_abort`, `allow`, `deny`, `on`, `paths_allow`,
//! `paths_deny`. Grounded on the six DSL functions registered in
//! `sandbox_lua_open` in the original source.
//!
//! Every function closes over the shared rule-tree builder rather than
//! taking it as an argument, so script code has no way to target any
//! policy but the one being built — the Rust closure's capture *is* the
//! "hidden upvalue" the original binds each function to.

use std::sync::Arc;

use mlua::{Function, Lua, RegistryKey, Table};
use mlua::String as LuaString;
use parking_lot::Mutex;
use sandbox_core::path::{PathList, PathRef, VnodeResolver};
use sandbox_core::rule_name::RuleName;
use sandbox_core::rule_tree::RuleTree;
use sandbox_core::{CallbackRef, PolicyFlags, Verdict};

use crate::consts;
use crate::error::ScriptError;

pub(crate) struct Builder {
    pub tree: RuleTree,
    pub flags: PolicyFlags,
}

impl Builder {
    /// A fresh ruleset starts life denying everything, matching
    /// `sandbox_ruleset_create(KAUTH_RESULT_DENY)`: a script that never
    /// calls `sandbox.default` still gets a fail-closed root.
    fn new() -> Self {
        let mut tree = RuleTree::new();
        tree.set_default(Verdict::Deny);
        Self {
            tree,
            flags: PolicyFlags::default(),
        }
    }
}

fn parse_verdict(s: &str) -> Result<Verdict, ScriptError> {
    match s {
        "allow" => Ok(Verdict::Allow),
        "deny" => Ok(Verdict::Deny),
        "defer" => Ok(Verdict::Defer),
        other => Err(ScriptError::BadArgument {
            function: "default",
            detail: format!("unrecognized verdict '{other}', expected allow/deny/defer"),
        }),
    }
}

fn parse_rule_name(function: &'static str, s: &str) -> mlua::Result<RuleName> {
    RuleName::parse(s).map_err(|e| {
        mlua::Error::external(ScriptError::BadArgument {
            function,
            detail: e.to_string(),
        })
    })
}

/// `paths_allow`/`paths_deny` take a bare vnode action (`"read_data"`, not
/// `"vnode.read_data"`) and anchor the whitelist/blacklist under the
/// `vnode` scope themselves, matching `sandbox.paths_allow('read_data',
/// {...})` in the original DSL.
fn parse_vnode_action(function: &'static str, action: &str) -> mlua::Result<RuleName> {
    let parsed = parse_rule_name(function, action)?;
    if parsed.size() != 1 {
        return Err(mlua::Error::external(ScriptError::BadArgument {
            function,
            detail: format!("'{action}' must be a single vnode action, not a dotted rule name"),
        }));
    }
    Ok(RuleName::from_segments(&["vnode", action]))
}

/// Installs the `sandbox` table and runs `script` against it, returning the
/// rule tree it built, the flags it set, and the callback registry entries
/// it registered (in the order `sandbox.on` was called).
pub(crate) fn load(
    lua: &Lua,
    script: &str,
    resolver: Arc<dyn VnodeResolver + Send + Sync>,
) -> Result<(RuleTree, PolicyFlags, Vec<RegistryKey>), ScriptError> {
    let builder = Arc::new(Mutex::new(Builder::new()));
    let callbacks: Arc<Mutex<Vec<RegistryKey>>> = Arc::new(Mutex::new(Vec::new()));

    install_table(lua, builder.clone(), callbacks.clone(), resolver).map_err(ScriptError::Load)?;

    lua.load(script).set_name("policy").exec().map_err(ScriptError::Runtime)?;

    // Every DSL closure installed into `lua`'s globals holds its own clone
    // of `builder`, so the `Arc` never drops to one strong reference here;
    // take the tree and flags out from behind the lock instead of trying
    // to unwrap the `Arc`.
    let (tree, flags) = {
        let mut builder = builder.lock();
        (std::mem::replace(&mut builder.tree, RuleTree::new()), builder.flags)
    };
    let callbacks = std::mem::take(&mut *callbacks.lock());

    Ok((tree, flags, callbacks))
}

fn install_table(
    lua: &Lua,
    builder: Arc<Mutex<Builder>>,
    callbacks: Arc<Mutex<Vec<RegistryKey>>>,
    resolver: Arc<dyn VnodeResolver + Send + Sync>,
) -> mlua::Result<()> {
    let table: Table<'_> = lua.create_table()?;
    consts::install(&table)?;

    {
        let builder = builder.clone();
        table.set(
            "default",
            lua.create_function(move |_, verdict: String| {
                let verdict = parse_verdict(&verdict).map_err(mlua::Error::external)?;
                builder.lock().tree.set_default(verdict);
                Ok(())
            })?,
        )?;
    }

    {
        let builder = builder.clone();
        table.set(
            "on_deny_abort",
            lua.create_function(move |_, flag: bool| {
                builder.lock().flags.on_deny_abort = flag;
                Ok(())
            })?,
        )?;
    }

    {
        let builder = builder.clone();
        table.set(
            "allow",
            lua.create_function(move |_, name: LuaString<'_>| {
                let rule = parse_rule_name("allow", name.to_str()?)?;
                builder
                    .lock()
                    .tree
                    .insert(&rule, |d| d.trilean = Some(Verdict::Allow))
                    .map_err(mlua::Error::external)?;
                Ok(())
            })?,
        )?;
    }

    {
        let builder = builder.clone();
        table.set(
            "deny",
            lua.create_function(move |_, name: LuaString<'_>| {
                let rule = parse_rule_name("deny", name.to_str()?)?;
                builder
                    .lock()
                    .tree
                    .insert(&rule, |d| d.trilean = Some(Verdict::Deny))
                    .map_err(mlua::Error::external)?;
                Ok(())
            })?,
        )?;
    }

    {
        let builder = builder.clone();
        let callbacks = callbacks.clone();
        table.set(
            "on",
            lua.create_function(move |lua_ctx, (name, func): (LuaString<'_>, Function<'_>)| {
                let rule = parse_rule_name("on", name.to_str()?)?;
                let key = lua_ctx.create_registry_value(func)?;
                let id = {
                    let mut callbacks = callbacks.lock();
                    callbacks.push(key);
                    (callbacks.len() - 1) as u64
                };
                builder
                    .lock()
                    .tree
                    .insert(&rule, |d| d.callbacks.push(CallbackRef::new(id)))
                    .map_err(mlua::Error::external)?;
                Ok(())
            })?,
        )?;
    }

    {
        let builder = builder.clone();
        let resolver = resolver.clone();
        table.set(
            "paths_allow",
            lua.create_function(move |_, (name, paths): (LuaString<'_>, Vec<String>)| {
                let rule = parse_vnode_action("paths_allow", name.to_str()?)?;
                let mut list = PathList::new();
                for path in paths {
                    list.push(PathRef::create(path, resolver.as_ref()));
                }
                builder
                    .lock()
                    .tree
                    .insert(&rule, |d| d.whitelist = Some(list))
                    .map_err(mlua::Error::external)?;
                Ok(())
            })?,
        )?;
    }

    {
        table.set(
            "paths_deny",
            lua.create_function(move |_, (name, paths): (LuaString<'_>, Vec<String>)| {
                let rule = parse_vnode_action("paths_deny", name.to_str()?)?;
                let mut list = PathList::new();
                for path in paths {
                    list.push(PathRef::create(path, resolver.as_ref()));
                }
                builder
                    .lock()
                    .tree
                    .insert(&rule, |d| d.blacklist = Some(list))
                    .map_err(mlua::Error::external)?;
                Ok(())
            })?,
        )?;
    }

    lua.globals().set("sandbox", table)?;
    Ok(())
}

