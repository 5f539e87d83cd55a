//! Marshals [`sandbox_core::EvalArg`] values, rule names, and credentials
//! into Lua tables/values, grounded on `sandbox_lua_pushvnode`/`pushproc`/
//! `pushsocket`/`pushsockaddr_in`/`in6`/`un`/`pushrule`/`pushcred` in the
//! original source.

use mlua::{Lua, Result as LuaResult, Table, Value};
use sandbox_core::credential::CredentialInfo;
use sandbox_core::rule_name::RuleName;
use sandbox_core::{EvalArg, SockAddr};

/// Converts one evaluation argument into the Lua value a callback receives
/// for it.
pub fn push_eval_arg<'lua>(lua: &'lua Lua, arg: &EvalArg) -> LuaResult<Value<'lua>> {
    match arg {
        EvalArg::Vnode(path) => push_vnode(lua, path).map(Value::Table),
        EvalArg::Process(proc) => {
            let t = lua.create_table()?;
            t.set("pid", proc.pid)?;
            t.set("ppid", proc.ppid)?;
            t.set("nice", proc.nice)?;
            t.set("comm", proc.comm.as_str())?;
            Ok(Value::Table(t))
        }
        EvalArg::Int(i) => Ok(Value::Integer(*i as mlua::Integer)),
        EvalArg::Socket(_sock) => {
            // The original's `sandbox_lua_pushsocket` is an empty
            // `lua_newtable` with a `/* TODO: implement */` left in place;
            // no socket fields are actually marshalled.
            Ok(Value::Table(lua.create_table()?))
        }
        EvalArg::Sockaddr(addr) => push_sockaddr(lua, addr).map(Value::Table),
    }
}

fn push_vnode<'lua>(lua: &'lua Lua, path: &sandbox_core::PathRef) -> LuaResult<Table<'lua>> {
    let t = lua.create_table()?;
    let name = path.text().rsplit('/').next().unwrap_or_else(|| path.text());
    t.set("name", name)?;
    if let Some(stat) = path.stat() {
        t.set("type", stat.kind.as_str())?;
        t.set("mode", stat.mode)?;
        t.set("nlink", stat.nlink)?;
        t.set("uid", stat.uid)?;
        t.set("gid", stat.gid)?;
        t.set("size", stat.size)?;
        t.set("atime", stat.atime)?;
        t.set("mtime", stat.mtime)?;
        t.set("ctime", stat.ctime)?;
        t.set("birthtime", stat.birthtime)?;
        t.set("blksize", stat.blksize)?;
        t.set("blocks", stat.blocks)?;
        t.set("ino", stat.ino)?;
    }
    Ok(t)
}

fn push_sockaddr<'lua>(lua: &'lua Lua, addr: &SockAddr) -> LuaResult<Table<'lua>> {
    let t = lua.create_table()?;
    match addr {
        SockAddr::Inet { address, port } => {
            t.set("family", "inet")?;
            t.set(
                "address",
                format!("{}.{}.{}.{}", address[0], address[1], address[2], address[3]),
            )?;
            t.set("port", *port)?;
        }
        SockAddr::Inet6 { address, port } => {
            t.set("family", "inet6")?;
            let groups: Vec<String> = address
                .chunks(2)
                .map(|c| format!("{:02x}{:02x}", c[0], c[1]))
                .collect();
            t.set("address", groups.join(":"))?;
            t.set("port", *port)?;
        }
        SockAddr::Unix { path } => {
            t.set("family", "unix")?;
            t.set("path", path.as_str())?;
        }
    }
    Ok(t)
}

/// Builds the `rule = {scope, action, subaction}` table pushed ahead of
/// every callback's format-specific arguments, matching
/// `sandbox_lua_pushrule`.
pub fn push_rule<'lua>(lua: &'lua Lua, rule: &RuleName) -> LuaResult<Table<'lua>> {
    let t = lua.create_table()?;
    let segments = rule.segments();
    t.set("scope", segments.first().map(String::as_str).unwrap_or(""))?;
    t.set("action", segments.get(1).map(String::as_str).unwrap_or(""))?;
    t.set("subaction", segments.get(2).map(String::as_str).unwrap_or(""))?;
    Ok(t)
}

/// Builds the `cred = {uid, euid, svuid, gid, egid, svgid, groups}` table
/// pushed ahead of every callback's format-specific arguments, matching
/// `sandbox_lua_pushcred`.
pub fn push_cred<'lua>(lua: &'lua Lua, cred: &CredentialInfo) -> LuaResult<Table<'lua>> {
    let t = lua.create_table()?;
    t.set("uid", cred.uid)?;
    t.set("euid", cred.euid)?;
    t.set("svuid", cred.svuid)?;
    t.set("gid", cred.gid)?;
    t.set("egid", cred.egid)?;
    t.set("svgid", cred.svgid)?;
    t.set("groups", cred.groups.clone())?;
    Ok(t)
}

/// Converts a full argument slice into an `mlua::MultiValue`-compatible
/// `Vec`, prefixed by the `rule` and `cred` tables, in the order a callback
/// receives them: `rule, cred, <format args...>`.
pub fn push_callback_args<'lua>(
    lua: &'lua Lua,
    rule: &RuleName,
    cred: &CredentialInfo,
    args: &[EvalArg],
) -> LuaResult<Vec<Value<'lua>>> {
    let mut out = Vec::with_capacity(args.len() + 2);
    out.push(Value::Table(push_rule(lua, rule)?));
    out.push(Value::Table(push_cred(lua, cred)?));
    for arg in args {
        out.push(push_eval_arg(lua, arg)?);
    }
    Ok(out)
}
