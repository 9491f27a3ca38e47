// src/graph/mod.rs

//! Identity-keyed navigation trees over a resolved runtime.
//!
//! A `GroupTree` is an arena of `GroupNode`s: builders own the arena and a
//! memo of Identity -> node while constructing, then hand out the finished
//! tree read-only. Because nodes are shared by id, a "tree" is really a
//! rooted graph: diamonds collapse to one node and package-dependency
//! cycles are representable without recursion hazards.

mod features;
mod packages;

pub use features::{FeatureGroupsBuilder, FeatureSpecsBuilder};
pub use packages::{PackageGroupsBuilder, PackageResolver, ResolvedPackage};

use crate::container::{FeatureInfo, FeatureSpecInfo, PackageInfo};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Cross-feature-pack reference key: an origin (empty for "local to the
/// current feature-pack") plus a name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub origin: String,
    pub name: String,
}

impl Identity {
    pub fn new(origin: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            name: name.into(),
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self {
            origin: String::new(),
            name: name.into(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.origin.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}#{}", self.origin, self.name)
        }
    }
}

/// Index of a node in its `GroupTree` arena.
pub type GroupId = usize;

/// A tree node keyed by `Identity`, holding at most one payload.
#[derive(Debug, Clone)]
pub struct GroupNode {
    identity: Identity,
    parent: Option<GroupId>,
    children: BTreeMap<String, GroupId>,
    package: Option<PackageInfo>,
    feature_spec: Option<FeatureSpecInfo>,
    feature: Option<FeatureInfo>,
}

impl GroupNode {
    fn new(identity: Identity, parent: Option<GroupId>) -> Self {
        Self {
            identity,
            parent,
            children: BTreeMap::new(),
            package: None,
            feature_spec: None,
            feature: None,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    /// Ordered children: (display key, node).
    pub fn children(&self) -> impl Iterator<Item = (&str, GroupId)> {
        self.children.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn package(&self) -> Option<&PackageInfo> {
        self.package.as_ref()
    }

    pub fn feature_spec(&self) -> Option<&FeatureSpecInfo> {
        self.feature_spec.as_ref()
    }

    pub fn feature(&self) -> Option<&FeatureInfo> {
        self.feature.as_ref()
    }
}

/// Arena of groups. Mutable only through the builders in this module;
/// read-only once published in a `FeatureContainer`.
#[derive(Debug, Clone, Default)]
pub struct GroupTree {
    nodes: Vec<GroupNode>,
    roots: BTreeMap<String, GroupId>,
}

impl GroupTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: GroupId) -> &GroupNode {
        &self.nodes[id]
    }

    pub fn roots(&self) -> impl Iterator<Item = (&str, GroupId)> {
        self.roots.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (GroupId, &GroupNode)> {
        self.nodes.iter().enumerate()
    }

    fn push(&mut self, identity: Identity, parent: Option<GroupId>) -> GroupId {
        let id = self.nodes.len();
        self.nodes.push(GroupNode::new(identity, parent));
        id
    }

    fn link_root(&mut self, key: &str, id: GroupId) {
        self.roots.insert(key.to_string(), id);
    }

    fn link_child(&mut self, parent: GroupId, key: &str, child: GroupId) {
        self.nodes[parent].children.insert(key.to_string(), child);
    }

    fn node_mut(&mut self, id: GroupId) -> &mut GroupNode {
        &mut self.nodes[id]
    }

    /// Record `provider` (the identity of a spec or feature) on every
    /// package reachable from `root` through dependency edges.
    ///
    /// Depth-first with a visited set: safe over arbitrary, including
    /// cyclic, package graphs and bounded to one visit per node.
    pub(crate) fn attach_provider(&mut self, root: GroupId, provider: &Identity) {
        let mut visited: HashSet<GroupId> = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = &mut self.nodes[id];
            if let Some(package) = node.package.as_mut() {
                package.providers.insert(provider.clone());
            }
            stack.extend(node.children.values().copied());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        assert_eq!(Identity::local("docs").to_string(), "docs");
        assert_eq!(Identity::new("base", "docs").to_string(), "base#docs");
        assert!(Identity::local("docs").is_local());
    }

    #[test]
    fn test_identity_equality_is_origin_and_name() {
        assert_eq!(Identity::local("p"), Identity::new("", "p"));
        assert_ne!(Identity::local("p"), Identity::new("base", "p"));
    }
}
