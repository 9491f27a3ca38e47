// src/graph/features.rs

//! Feature-spec and feature-instance trees.
//!
//! Both trees are shaped by dotted spec names: `subsystem.logging.logger`
//! becomes a three-level path, with intermediate groups created on demand
//! and shared between specs under the same prefix. Feature instances extend
//! the path with their id-parameter values, so two loggers named `FILE` and
//! `CONSOLE` land as siblings under the same spec group.

use super::{GroupId, GroupTree, Identity};
use crate::container::{FeatureInfo, FeatureSpecInfo};
use std::collections::HashMap;

/// Shared path-tree plumbing: nodes memoized by full dotted prefix.
struct PathTree {
    tree: GroupTree,
    memo: HashMap<String, GroupId>,
}

impl PathTree {
    fn new() -> Self {
        Self {
            tree: GroupTree::new(),
            memo: HashMap::new(),
        }
    }

    fn ensure_path<'s>(&mut self, segments: impl Iterator<Item = &'s str>) -> Option<GroupId> {
        let mut prefix = String::new();
        let mut parent: Option<GroupId> = None;
        for segment in segments {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);
            let id = match self.memo.get(&prefix) {
                Some(&id) => id,
                None => {
                    let id = self.tree.push(Identity::local(segment), parent);
                    match parent {
                        Some(parent) => self.tree.link_child(parent, segment, id),
                        None => self.tree.link_root(segment, id),
                    }
                    self.memo.insert(prefix.clone(), id);
                    id
                }
            };
            parent = Some(id);
        }
        parent
    }
}

/// Builds the feature-spec `GroupTree` of one origin.
pub struct FeatureSpecsBuilder {
    inner: PathTree,
}

impl FeatureSpecsBuilder {
    pub fn new() -> Self {
        Self {
            inner: PathTree::new(),
        }
    }

    /// Place a spec at the path given by its dotted name. Re-adding the same
    /// name replaces the payload.
    pub fn add_spec(&mut self, info: FeatureSpecInfo) -> GroupId {
        // Spec names are non-empty, so the path always has a terminal node.
        let id = self
            .inner
            .ensure_path(info.id.name.split('.'))
            .unwrap_or_else(|| self.inner.tree.push(Identity::local(""), None));
        self.inner.tree.node_mut(id).feature_spec = Some(info);
        id
    }

    pub fn group(&self, spec_name: &str) -> Option<GroupId> {
        self.inner.memo.get(spec_name).copied()
    }

    pub fn finish(self) -> GroupTree {
        self.inner.tree
    }
}

impl Default for FeatureSpecsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the feature-instance `GroupTree` of one config.
pub struct FeatureGroupsBuilder {
    inner: PathTree,
}

impl FeatureGroupsBuilder {
    pub fn new() -> Self {
        Self {
            inner: PathTree::new(),
        }
    }

    /// Place a feature at its precomputed path (spec name segments followed
    /// by id-parameter values).
    pub fn add_feature(&mut self, info: FeatureInfo) -> GroupId {
        let id = self
            .inner
            .ensure_path(info.path.iter().map(String::as_str))
            .unwrap_or_else(|| self.inner.tree.push(Identity::local(""), None));
        self.inner.tree.node_mut(id).feature = Some(info);
        id
    }

    pub fn finish(self) -> GroupTree {
        self.inner.tree
    }
}

impl Default for FeatureGroupsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigId, FeatureId, FeaturePackLocation};
    use crate::spec::FeatureSpec;
    use semver::Version;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn spec_info(name: &str) -> FeatureSpecInfo {
        FeatureSpecInfo::new(
            Identity::local(name),
            FeaturePackLocation::new("core", Version::new(1, 0, 0)),
            Arc::new(FeatureSpec::new(name)),
        )
    }

    #[test]
    fn test_dotted_names_share_prefix_groups() {
        let mut builder = FeatureSpecsBuilder::new();
        builder.add_spec(spec_info("subsystem.logging.logger"));
        builder.add_spec(spec_info("subsystem.logging.handler"));
        builder.add_spec(spec_info("subsystem.web"));
        let tree = builder.finish();

        // subsystem, logging, logger, handler, web.
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.roots().count(), 1);
        let (key, root) = tree.roots().next().unwrap();
        assert_eq!(key, "subsystem");
        assert!(tree.node(root).feature_spec().is_none());
        assert_eq!(tree.node(root).children().count(), 2);
    }

    #[test]
    fn test_intermediate_group_can_carry_spec() {
        let mut builder = FeatureSpecsBuilder::new();
        builder.add_spec(spec_info("subsystem.logging.logger"));
        builder.add_spec(spec_info("subsystem.logging"));
        let tree = builder.finish();

        assert_eq!(tree.len(), 3);
        let logging = builder_path(&tree, &["subsystem", "logging"]);
        assert!(tree.node(logging).feature_spec().is_some());
        assert!(tree.node(logging).has_children());
    }

    #[test]
    fn test_feature_instances_are_siblings_under_spec_path() {
        let mut builder = FeatureGroupsBuilder::new();
        for name in ["FILE", "CONSOLE"] {
            let mut params = BTreeMap::new();
            params.insert("name".to_string(), name.to_string());
            builder.add_feature(FeatureInfo::new(
                FeatureId {
                    spec: "subsystem.logging.logger".to_string(),
                    params: params.clone(),
                },
                Identity::local("subsystem.logging.logger"),
                params,
                vec![
                    "subsystem".to_string(),
                    "logging".to_string(),
                    "logger".to_string(),
                    name.to_string(),
                ],
                ConfigId::new("standalone", "main"),
            ));
        }
        let tree = builder.finish();

        let logger = builder_path(&tree, &["subsystem", "logging", "logger"]);
        assert!(tree.node(logger).feature().is_none());
        let names: Vec<&str> = tree.node(logger).children().map(|(k, _)| k).collect();
        assert_eq!(names, ["CONSOLE", "FILE"]);
    }

    fn builder_path(tree: &GroupTree, path: &[&str]) -> GroupId {
        let mut id = None;
        for segment in path {
            let children: Vec<(&str, GroupId)> = match id {
                None => tree.roots().collect(),
                Some(id) => tree.node(id).children().collect(),
            };
            id = Some(
                children
                    .into_iter()
                    .find(|(k, _)| k == segment)
                    .map(|(_, v)| v)
                    .unwrap(),
            );
        }
        id.unwrap()
    }
}
