//! Reference-counted path references (component A).
//!
//! A [`PathRef`] pairs the textual path a policy script named with an
//! optional resolved filesystem object handle. Resolution happens once, at
//! construction time; a miss is retained rather than retried (see
//! `DESIGN.md`, Open Question 3).

use std::sync::Arc;

/// Opaque handle to a resolved filesystem object, compared by identity.
///
/// Stands in for a real vnode pointer — this crate has no kernel adapter, so
/// resolution is supplied by whatever [`VnodeResolver`] the caller provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FsObjectHandle(pub u64);

/// The vnode type bit, as decoded from `st_mode & S_IFMT` in the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VnodeKind {
    Dir,
    Chr,
    Blk,
    Reg,
    Fifo,
    Sock,
    Lnk,
    Unknown,
}

impl VnodeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dir => "dir",
            Self::Chr => "chr",
            Self::Blk => "blk",
            Self::Reg => "reg",
            Self::Fifo => "fifo",
            Self::Sock => "sock",
            Self::Lnk => "lnk",
            Self::Unknown => "",
        }
    }
}

/// Filesystem attributes for a resolved vnode, matching the `vattr`-derived
/// `stat` fields the original marshals into a vnode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VnodeStat {
    pub kind: VnodeKind,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub birthtime: i64,
    pub blksize: u32,
    pub blocks: u64,
    pub ino: u64,
}

/// Resolves a path string to a filesystem object handle, or reports a miss.
pub trait VnodeResolver {
    fn resolve(&self, text: &str) -> Option<FsObjectHandle>;

    /// Best-effort attribute fetch for a resolved handle, used only for
    /// marshalling a vnode table to a script. A resolver with no attribute
    /// source (like [`NullResolver`]) reports attributes as unavailable
    /// rather than erroring, matching the original's "best-effort" table.
    fn stat(&self, _handle: FsObjectHandle) -> Option<VnodeStat> {
        None
    }
}

/// A resolver that never resolves anything; useful in tests that only care
/// about rule-tree matching, not path-to-vnode identity.
#[derive(Debug, Default)]
pub struct NullResolver;

impl VnodeResolver for NullResolver {
    fn resolve(&self, _text: &str) -> Option<FsObjectHandle> {
        None
    }
}

#[derive(Debug, PartialEq, Eq)]
struct PathRefInner {
    text: String,
    handle: Option<FsObjectHandle>,
    stat: Option<VnodeStat>,
}

/// A reference-counted path, as named by a policy script's `paths_allow` /
/// `paths_deny` argument lists.
#[derive(Debug, Clone)]
pub struct PathRef(Arc<PathRefInner>);

impl PathRef {
    /// Builds a new path reference, resolving `text` through `resolver`.
    /// A resolution miss is not an error (see `DESIGN.md`); it is logged and
    /// the path is kept with an empty handle.
    pub fn create(text: impl Into<String>, resolver: &dyn VnodeResolver) -> Self {
        let text = text.into();
        let handle = resolver.resolve(&text);
        if handle.is_none() {
            tracing::debug!(path = %text, "path reference did not resolve to a filesystem object");
        }
        let stat = handle.and_then(|h| resolver.stat(h));
        Self(Arc::new(PathRefInner { text, handle, stat }))
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.0.text
    }

    #[must_use]
    pub fn handle(&self) -> Option<FsObjectHandle> {
        self.0.handle
    }

    /// Best-effort attributes for this path, `None` if the resolver never
    /// resolved it or has no attribute source.
    #[must_use]
    pub fn stat(&self) -> Option<VnodeStat> {
        self.0.stat
    }

    /// Two path references are equal iff their text matches, regardless of
    /// whether either resolved to a filesystem object.
    #[must_use]
    pub fn text_eq(&self, other: &PathRef) -> bool {
        self.0.text == other.0.text
    }

    /// `true` if this reference resolved to the same filesystem object as
    /// `handle`. A reference that never resolved never matches by handle.
    #[must_use]
    pub fn matches_handle(&self, handle: FsObjectHandle) -> bool {
        self.0.handle == Some(handle)
    }
}

/// An ordered list of path references, as attached to a whitelist or
/// blacklist rule node.
#[derive(Debug, Clone, Default)]
pub struct PathList(Vec<PathRef>);

impl PathList {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, path: PathRef) {
        self.0.push(path);
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &PathRef> {
        self.0.iter()
    }

    #[must_use]
    pub fn contains_handle(&self, handle: FsObjectHandle) -> bool {
        self.0.iter().any(|p| p.matches_handle(handle))
    }

    #[must_use]
    pub fn contains_text(&self, text: &str) -> bool {
        self.0.iter().any(|p| p.text() == text)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver(Option<FsObjectHandle>);
    impl VnodeResolver for FixedResolver {
        fn resolve(&self, _text: &str) -> Option<FsObjectHandle> {
            self.0
        }
    }

    #[test]
    fn text_equality_ignores_resolution() {
        let resolved = PathRef::create("/etc/passwd", &FixedResolver(Some(FsObjectHandle(1))));
        let unresolved = PathRef::create("/etc/passwd", &NullResolver);
        assert!(resolved.text_eq(&unresolved));
    }

    #[test]
    fn unresolved_path_never_matches_a_handle() {
        let unresolved = PathRef::create("/etc/passwd", &NullResolver);
        assert!(!unresolved.matches_handle(FsObjectHandle(1)));
    }

    #[test]
    fn path_list_contains_by_handle_identity() {
        let mut list = PathList::new();
        list.push(PathRef::create("/a", &FixedResolver(Some(FsObjectHandle(7)))));
        assert!(list.contains_handle(FsObjectHandle(7)));
        assert!(!list.contains_handle(FsObjectHandle(8)));
    }
}
