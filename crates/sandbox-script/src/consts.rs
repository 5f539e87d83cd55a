//! The fixed integer constants a policy script sees, grounded on
//! `sandbox_lua_consts[]` in the original source, which `sandbox_lua_open`
//! installs into the very same table it registers as the `sandbox` global
//! — scripts read `sandbox.AF_INET`, never a bare `AF_INET`.

use mlua::{Result as LuaResult, Table};

/// Sets every address-family, socket-type, protocol, and permission-bit
/// constant onto `table`, which the caller then installs as the `sandbox`
/// global.
pub fn install(table: &Table<'_>) -> LuaResult<()> {
    let consts: &[(&str, i64)] = &[
        ("AF_UNIX", 1),
        ("AF_INET", 2),
        ("AF_INET6", 28),
        ("SOCK_STREAM", 1),
        ("SOCK_DGRAM", 2),
        ("SOCK_RAW", 3),
        ("SOCK_SEQPACKET", 5),
        ("IPPROTO_TCP", 6),
        ("IPPROTO_UDP", 17),
        ("IPPROTO_RAW", 255),
        ("S_IRUSR", 0o400),
        ("S_IWUSR", 0o200),
        ("S_IXUSR", 0o100),
        ("S_IRGRP", 0o040),
        ("S_IWGRP", 0o020),
        ("S_IXGRP", 0o010),
        ("S_IROTH", 0o004),
        ("S_IWOTH", 0o002),
        ("S_IXOTH", 0o001),
        ("S_ISUID", 0o4000),
        ("S_ISGID", 0o2000),
        ("S_IFREG", 0o100000),
        ("S_IFDIR", 0o040000),
        ("S_IFLNK", 0o120000),
    ];

    for (name, value) in consts {
        table.set(*name, *value)?;
    }
    Ok(())
}
