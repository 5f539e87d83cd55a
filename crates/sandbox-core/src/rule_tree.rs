//! Hierarchical rule store (component D): a prefix tree keyed by dotted
//! [`RuleName`] segments, searched by longest matching prefix.
//!
//! Rule kinds are not simulated as bits in a host integer (see
//! `DESIGN.md`'s note on the `!=`/`~=` open question and the rule-kind
//! design note in `SPEC_FULL.md`); a node instead carries up to four
//! independent sub-stores, one per kind.

use crate::callback::CallbackRef;
use crate::error::SandboxError;
use crate::path::PathList;
use crate::rule_name::RuleName;
use crate::Verdict;

/// The kind-specific data attached to a terminal rule node. Each field is
/// independent: a node can carry a trilean default *and* a whitelist *and*
/// callbacks at once, each consulted by the evaluator in a fixed order.
///
/// `callbacks` is a list, not a single slot: registering a second callback
/// on the same rule name (a script calling `sandbox.on` twice) appends
/// rather than overwrites, and both run in the order they were installed.
#[derive(Debug, Clone, Default)]
pub struct RuleData {
    pub trilean: Option<Verdict>,
    pub whitelist: Option<PathList>,
    pub blacklist: Option<PathList>,
    pub callbacks: Vec<CallbackRef>,
}

impl RuleData {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trilean.is_none()
            && self.whitelist.is_none()
            && self.blacklist.is_none()
            && self.callbacks.is_empty()
    }
}

#[derive(Debug)]
struct RuleNode {
    segment: String,
    data: Option<RuleData>,
    children: Vec<RuleNode>,
}

impl RuleNode {
    fn new(segment: String) -> Self {
        Self {
            segment,
            data: None,
            children: Vec::new(),
        }
    }

    /// Finds the child with this exact segment name, if any.
    fn child(&self, segment: &str) -> Option<&RuleNode> {
        self.children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.children[i])
    }

    fn child_mut(&mut self, segment: &str) -> Option<&mut RuleNode> {
        match self
            .children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
        {
            Ok(i) => Some(&mut self.children[i]),
            Err(_) => None,
        }
    }

    /// Finds or creates the child with this segment, keeping `children`
    /// sorted lexicographically by segment name.
    fn child_or_insert(&mut self, segment: &str) -> &mut RuleNode {
        match self
            .children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
        {
            Ok(i) => &mut self.children[i],
            Err(i) => {
                self.children.insert(i, RuleNode::new(segment.to_owned()));
                &mut self.children[i]
            }
        }
    }
}

/// The rule tree itself: one interior root node whose children are the
/// top-level scope names (`system`, `process`, `network`, ...).
#[derive(Debug)]
pub struct RuleTree {
    root: RuleNode,
}

impl Default for RuleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleTree {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: RuleNode::new(String::new()),
        }
    }

    /// Walks (creating interior nodes as needed) to the node named by
    /// `name`, then lets `mutate` populate or update its [`RuleData`].
    ///
    /// `mutate` sees whatever was already installed at this exact name (if
    /// anything) and decides for itself whether to overwrite a kind or
    /// leave it; the tree itself does not reject a second install at the
    /// same name, matching a script that calls `sandbox.allow` twice on
    /// the same rule.
    ///
    /// One structural rule is enforced here rather than left to `mutate`:
    /// whitelists and blacklists only make sense on vnode-scoped rules (a
    /// path list has no meaning for, say, `network.bind`). `mutate` runs
    /// against a scratch copy first; if it sets either list on a
    /// non-vnode-scoped name the whole call is rejected and the tree is
    /// left exactly as it was.
    pub fn insert(
        &mut self,
        name: &RuleName,
        mutate: impl FnOnce(&mut RuleData),
    ) -> Result<(), SandboxError> {
        let mut node = &mut self.root;
        for segment in name.segments() {
            node = node.child_or_insert(segment);
        }
        let mut data = node.data.clone().unwrap_or_default();
        mutate(&mut data);
        if !name.is_vnode_scoped() && (data.whitelist.is_some() || data.blacklist.is_some()) {
            return Err(SandboxError::InvalidRuleStructure(format!(
                "whitelists and blacklists are only valid on vnode-scoped rules, not '{name}'"
            )));
        }
        node.data = Some(data);
        tracing::trace!(rule = %name, "rule tree updated");
        Ok(())
    }

    /// Sets the root-level default verdict, consulted when no installed
    /// rule matches any prefix of a request at all. This is what a policy
    /// script's `sandbox.default(...)` call mutates.
    pub fn set_default(&mut self, verdict: Verdict) {
        let data = self.root.data.get_or_insert_with(RuleData::default);
        data.trilean = Some(verdict);
    }

    /// Finds the longest-prefix node along `name`'s path that carries any
    /// rule data, and returns a reference to that data.
    ///
    /// An interior node with no data (a pure path-continuation node) is
    /// never returned; the search keeps descending through it looking for
    /// a longer, more specific match, falling back to the last node with
    /// data if no deeper match exists.
    #[must_use]
    pub fn search(&self, name: &RuleName) -> Option<&RuleData> {
        let mut node = &self.root;
        let mut best: Option<&RuleData> = None;
        if let Some(data) = &node.data {
            best = Some(data);
        }
        for segment in name.segments() {
            match node.child(segment) {
                Some(child) => {
                    node = child;
                    if let Some(data) = &node.data {
                        best = Some(data);
                    }
                }
                None => break,
            }
        }
        best
    }

    /// Test/debug helper: exact-match lookup, bypassing prefix search.
    #[must_use]
    pub fn get_exact(&self, name: &RuleName) -> Option<&RuleData> {
        let mut node = &self.root;
        for segment in name.segments() {
            node = node.child(segment)?;
        }
        node.data.as_ref()
    }

    #[allow(dead_code)]
    fn child_mut_path(&mut self, name: &RuleName) -> Option<&mut RuleNode> {
        let mut node = &mut self.root;
        for segment in name.segments() {
            node = node.child_mut(segment)?;
        }
        Some(node)
    }
}
