// src/graph/packages.rs

//! Package dependency trees.
//!
//! One tree per origin: roots are the packages the origin's pack selects,
//! children are dependency edges. Nodes are memoized by `Identity`, and the
//! memo is filled before a node's dependencies are expanded, so shared
//! subtrees collapse and dependency cycles terminate.

use super::{GroupId, GroupTree, Identity};
use crate::config::FeaturePackLocation;
use crate::container::PackageInfo;
use crate::error::{Error, Result};
use crate::spec::PackageDependencySpec;
use std::collections::HashMap;

/// A package dependency resolved to the pack that actually provides it.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    /// Producer of the providing pack.
    pub producer: String,
    pub location: FeaturePackLocation,
    pub name: String,
    pub deps: Vec<PackageDependencySpec>,
    pub content: Vec<String>,
}

/// Maps a package dependency, in the context of the declaring producer, to
/// the package that provides it. `Ok(None)` means an optional dependency
/// nothing provides.
pub trait PackageResolver {
    fn resolve_dep(
        &self,
        parent_producer: &str,
        dep: &PackageDependencySpec,
    ) -> Result<Option<ResolvedPackage>>;
}

/// Builds the package `GroupTree` of one origin.
pub struct PackageGroupsBuilder<'r, R: PackageResolver> {
    resolver: &'r R,
    /// Producer whose packages appear under local identities.
    origin_producer: String,
    tree: GroupTree,
    memo: HashMap<Identity, GroupId>,
}

impl<'r, R: PackageResolver> PackageGroupsBuilder<'r, R> {
    pub fn new(resolver: &'r R, origin_producer: impl Into<String>) -> Self {
        Self {
            resolver,
            origin_producer: origin_producer.into(),
            tree: GroupTree::new(),
            memo: HashMap::new(),
        }
    }

    /// Add a selected package as a root of the tree, expanding its
    /// dependency subtree.
    pub fn add_root(&mut self, package: ResolvedPackage) -> Result<GroupId> {
        let key = self.identity_of(&package).to_string();
        let id = self.add_package(package)?;
        self.tree.link_root(&key, id);
        Ok(id)
    }

    /// Node already built for an identity, if any.
    pub fn group(&self, identity: &Identity) -> Option<GroupId> {
        self.memo.get(identity).copied()
    }

    /// Record `provider` on every package reachable from `identity`.
    pub fn attach_provider(&mut self, identity: &Identity, provider: &Identity) -> Result<()> {
        let root = self.group(identity).ok_or_else(|| {
            Error::InconsistentPackageGraph(format!("no package group for {identity}"))
        })?;
        self.tree.attach_provider(root, provider);
        Ok(())
    }

    pub fn finish(self) -> GroupTree {
        self.tree
    }

    fn identity_of(&self, package: &ResolvedPackage) -> Identity {
        if package.producer == self.origin_producer {
            Identity::local(&package.name)
        } else {
            Identity::new(&package.producer, &package.name)
        }
    }

    fn add_package(&mut self, package: ResolvedPackage) -> Result<GroupId> {
        let identity = self.identity_of(&package);
        if let Some(&id) = self.memo.get(&identity) {
            return Ok(id);
        }

        let mut content = package.content.clone();
        content.sort();
        let id = self.tree.push(identity.clone(), None);
        self.tree.node_mut(id).package = Some(PackageInfo::new(
            identity.clone(),
            package.location.clone(),
            content,
        ));
        // Memoize before expanding deps so cycles close on this node.
        self.memo.insert(identity, id);

        for dep in &package.deps {
            let Some(child) = self.resolver.resolve_dep(&package.producer, dep)? else {
                continue;
            };
            let key = self.identity_of(&child).to_string();
            let child_id = self.add_package(child)?;
            self.tree.link_child(id, &key, child_id);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;
    use std::collections::BTreeMap;

    struct MapResolver {
        packages: BTreeMap<String, ResolvedPackage>,
    }

    impl MapResolver {
        fn new() -> Self {
            Self {
                packages: BTreeMap::new(),
            }
        }

        fn package(&mut self, name: &str, deps: &[&str]) -> ResolvedPackage {
            let pkg = ResolvedPackage {
                producer: "core".to_string(),
                location: FeaturePackLocation::new("core", Version::new(1, 0, 0)),
                name: name.to_string(),
                deps: deps
                    .iter()
                    .map(|d| PackageDependencySpec::local(*d))
                    .collect(),
                content: vec![format!("bin/{name}")],
            };
            self.packages.insert(name.to_string(), pkg.clone());
            pkg
        }
    }

    impl PackageResolver for MapResolver {
        fn resolve_dep(
            &self,
            _parent: &str,
            dep: &PackageDependencySpec,
        ) -> Result<Option<ResolvedPackage>> {
            match self.packages.get(&dep.package) {
                Some(pkg) => Ok(Some(pkg.clone())),
                None if dep.optional => Ok(None),
                None => Err(Error::UnresolvedPackageDependency {
                    package: dep.package.clone(),
                    required_by: "core".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_diamond_collapses_to_shared_node() {
        let mut resolver = MapResolver::new();
        resolver.package("common", &[]);
        resolver.package("left", &["common"]);
        resolver.package("right", &["common"]);
        let root = resolver.package("app", &["left", "right"]);

        let mut builder = PackageGroupsBuilder::new(&resolver, "core");
        builder.add_root(root).unwrap();
        let tree = builder.finish();

        // app, left, right, common: one node each.
        assert_eq!(tree.len(), 4);
        let (_, app) = tree.roots().next().unwrap();
        let shared: Vec<GroupId> = tree
            .node(app)
            .children()
            .map(|(_, child)| tree.node(child).children().next().unwrap().1)
            .collect();
        assert_eq!(shared[0], shared[1]);
    }

    #[test]
    fn test_dependency_cycle_terminates() {
        let mut resolver = MapResolver::new();
        resolver.package("a", &["b"]);
        resolver.package("b", &["a"]);
        let root = resolver.packages.get("a").cloned().unwrap();

        let mut builder = PackageGroupsBuilder::new(&resolver, "core");
        builder.add_root(root).unwrap();
        let tree = builder.finish();

        assert_eq!(tree.len(), 2);
        let (_, a) = tree.roots().next().unwrap();
        let (_, b) = tree.node(a).children().next().unwrap();
        assert_eq!(tree.node(b).children().next().unwrap().1, a);
    }

    #[test]
    fn test_attach_provider_marks_cyclic_subtree() {
        let mut resolver = MapResolver::new();
        resolver.package("a", &["b"]);
        resolver.package("b", &["a"]);
        let root = resolver.packages.get("a").cloned().unwrap();

        let mut builder = PackageGroupsBuilder::new(&resolver, "core");
        builder.add_root(root).unwrap();
        let provider = Identity::local("subsystem.logging");
        builder
            .attach_provider(&Identity::local("a"), &provider)
            .unwrap();
        let tree = builder.finish();

        for (_, node) in tree.nodes() {
            assert!(node.package().unwrap().providers.contains(&provider));
        }
    }

    #[test]
    fn test_missing_required_dep_fails() {
        let mut resolver = MapResolver::new();
        let root = resolver.package("app", &["ghost"]);

        let mut builder = PackageGroupsBuilder::new(&resolver, "core");
        assert!(matches!(
            builder.add_root(root),
            Err(Error::UnresolvedPackageDependency { .. })
        ));
    }
}
