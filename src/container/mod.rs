// src/container/mod.rs

//! Resolved-state navigation: containers and the session cache.
//!
//! A `FeatureContainer` is an immutable, navigable snapshot of a resolved
//! runtime: per-origin package and feature-spec trees, per-config feature
//! trees, and flat lookup maps. The editing session rebuilds its container
//! after every committed edit; standalone per-pack containers are built once
//! and shared through a `ContainerCache` owned by the session.

mod info;

pub use info::{ConfigInfo, FeatureInfo, FeatureSpecInfo, PackageInfo};

use crate::config::{ConfigId, FeaturePackConfig, FeaturePackLocation, ProvisioningConfigBuilder};
use crate::error::{Error, Result};
use crate::graph::{
    FeatureGroupsBuilder, FeatureSpecsBuilder, GroupTree, Identity, PackageGroupsBuilder,
    PackageResolver, ResolvedPackage,
};
use crate::runtime::{ProvisioningResolver, ProvisioningRuntime};
use crate::spec::PackageDependencySpec;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Adapts a resolved runtime to dependency-edge resolution for the package
/// tree builders.
struct RuntimePackages<'a> {
    runtime: &'a ProvisioningRuntime,
}

impl PackageResolver for RuntimePackages<'_> {
    fn resolve_dep(
        &self,
        parent_producer: &str,
        dep: &PackageDependencySpec,
    ) -> Result<Option<ResolvedPackage>> {
        let Some((producer, package)) = self.runtime.resolve_package_dep(parent_producer, dep)?
        else {
            return Ok(None);
        };
        let rt = self
            .runtime
            .feature_pack(&producer)
            .ok_or_else(|| Error::UnknownProducer(producer.clone()))?;
        let spec = rt.spec.package(&package).ok_or_else(|| Error::UnknownPackage {
            producer: producer.clone(),
            package: package.clone(),
        })?;
        Ok(Some(ResolvedPackage {
            producer,
            location: rt.location().clone(),
            name: spec.name.clone(),
            deps: spec.deps.clone(),
            content: spec.content.clone(),
        }))
    }
}

/// Immutable navigable view of one resolved runtime.
#[derive(Debug)]
pub struct FeatureContainer {
    /// Producer -> package dependency tree of that origin.
    package_trees: BTreeMap<String, GroupTree>,
    /// Producer -> feature-spec tree of that origin.
    spec_trees: BTreeMap<String, GroupTree>,
    /// Config id (display form) -> feature tree of that config.
    feature_trees: BTreeMap<String, GroupTree>,
    /// Qualified identity (display form) -> package, across all origins.
    packages: BTreeMap<String, PackageInfo>,
    /// Qualified identity (display form) -> spec, across all origins.
    specs: BTreeMap<String, FeatureSpecInfo>,
    /// Model -> layer names declared by any pack in the runtime.
    layers: BTreeMap<String, BTreeSet<String>>,
    configs: Vec<ConfigInfo>,
    /// Producer -> standalone container of that pack.
    full_dependencies: BTreeMap<String, Arc<FeatureContainer>>,
    /// True when disabled specs are included in the spec trees.
    all_specs: bool,
    /// True for the container of an editing session.
    edit: bool,
}

impl FeatureContainer {
    fn build(runtime: &ProvisioningRuntime, all_specs: bool, edit: bool) -> Result<Self> {
        let resolver = RuntimePackages { runtime };

        // Package trees first: spec scanning attaches providers into them.
        let mut package_builders: BTreeMap<String, PackageGroupsBuilder<'_, RuntimePackages<'_>>> =
            BTreeMap::new();
        for rt in runtime.feature_packs() {
            let producer = rt.producer().to_string();
            let mut builder = PackageGroupsBuilder::new(&resolver, &producer);
            for name in &rt.packages {
                let spec = rt.spec.package(name).ok_or_else(|| {
                    Error::InconsistentPackageGraph(format!(
                        "selected package {producer}:{name} has no spec"
                    ))
                })?;
                builder.add_root(ResolvedPackage {
                    producer: producer.clone(),
                    location: rt.location().clone(),
                    name: spec.name.clone(),
                    deps: spec.deps.clone(),
                    content: spec.content.clone(),
                })?;
            }
            package_builders.insert(producer, builder);
        }

        let mut spec_trees = BTreeMap::new();
        let mut specs = BTreeMap::new();
        let mut layers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for rt in runtime.feature_packs() {
            let producer = rt.producer();
            let mut spec_builder = FeatureSpecsBuilder::new();
            for (name, fspec) in &rt.spec.feature_specs {
                let qualified = Identity::new(producer, name);
                let mut missing = Vec::new();
                for dep in &fspec.packages {
                    match runtime.resolve_package_dep(producer, dep) {
                        Ok(Some((target, package))) => {
                            let selected = runtime
                                .feature_pack(&target)
                                .is_some_and(|t| t.has_package(&package));
                            if selected {
                                if let Some(builder) = package_builders.get_mut(&target) {
                                    builder
                                        .attach_provider(&Identity::local(&package), &qualified)?;
                                }
                            } else {
                                missing.push(package);
                            }
                        }
                        Ok(None) => {}
                        Err(Error::UnresolvedPackageDependency { .. }) => {
                            missing.push(dep.package.clone());
                        }
                        Err(e) => return Err(e),
                    }
                }
                let info = FeatureSpecInfo::new(
                    Identity::local(name),
                    rt.location().clone(),
                    Arc::new(fspec.clone()),
                )
                .with_missing_packages(missing);
                if all_specs || info.enabled {
                    specs.insert(qualified.to_string(), info.clone());
                    spec_builder.add_spec(info);
                }
            }
            spec_trees.insert(producer.to_string(), spec_builder.finish());

            for layer in &rt.spec.layers {
                layers
                    .entry(layer.model.clone())
                    .or_default()
                    .insert(layer.name.clone());
            }
        }

        let mut package_trees = BTreeMap::new();
        let mut packages = BTreeMap::new();
        for (producer, builder) in package_builders {
            let tree = builder.finish();
            for (_, node) in tree.nodes() {
                if let Some(info) = node.package() {
                    let qualified = if info.identity.is_local() {
                        Identity::new(&producer, &info.identity.name)
                    } else {
                        info.identity.clone()
                    };
                    // The same package can show up in several origins'
                    // trees; the flat view accumulates every provider.
                    packages
                        .entry(qualified.to_string())
                        .and_modify(|existing: &mut PackageInfo| {
                            existing.providers.extend(info.providers.iter().cloned());
                        })
                        .or_insert_with(|| info.clone());
                }
            }
            package_trees.insert(producer, tree);
        }

        let mut feature_trees = BTreeMap::new();
        let mut configs = Vec::new();
        for cfg in runtime.configs() {
            let mut builder = FeatureGroupsBuilder::new();
            let mut ids = Vec::new();
            for feature in cfg.features() {
                let fspec = runtime
                    .feature_pack(&feature.spec_origin)
                    .and_then(|fp| fp.spec.feature_spec(&feature.spec))
                    .ok_or_else(|| Error::UnknownFeatureSpec(feature.spec.clone()))?;
                let mut path: Vec<String> =
                    feature.spec.split('.').map(str::to_string).collect();
                // Path suffix follows the spec's declared id-param order.
                for param in fspec.id_params() {
                    if let Some(value) = feature.id.params.get(&param.name) {
                        path.push(value.clone());
                    }
                }
                builder.add_feature(FeatureInfo::new(
                    feature.id.clone(),
                    Identity::new(&feature.spec_origin, &feature.spec),
                    feature.params.clone(),
                    path,
                    cfg.id.clone(),
                ));
                ids.push(feature.id.clone());
            }
            feature_trees.insert(cfg.id.to_string(), builder.finish());
            configs.push(ConfigInfo {
                id: cfg.id.clone(),
                layers: cfg.layers.clone(),
                features: ids,
            });
        }

        Ok(Self {
            package_trees,
            spec_trees,
            feature_trees,
            packages,
            specs,
            layers,
            configs,
            full_dependencies: BTreeMap::new(),
            all_specs,
            edit,
        })
    }

    pub fn package_tree(&self, producer: &str) -> Option<&GroupTree> {
        self.package_trees.get(producer)
    }

    pub fn package_trees(&self) -> impl Iterator<Item = (&str, &GroupTree)> {
        self.package_trees.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn spec_tree(&self, producer: &str) -> Option<&GroupTree> {
        self.spec_trees.get(producer)
    }

    pub fn spec_trees(&self) -> impl Iterator<Item = (&str, &GroupTree)> {
        self.spec_trees.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn feature_tree(&self, config: &ConfigId) -> Option<&GroupTree> {
        self.feature_trees.get(&config.to_string())
    }

    /// Package by producer and name.
    pub fn package(&self, producer: &str, name: &str) -> Option<&PackageInfo> {
        self.packages.get(&Identity::new(producer, name).to_string())
    }

    /// Feature spec by producer and dotted name.
    pub fn feature_spec(&self, producer: &str, name: &str) -> Option<&FeatureSpecInfo> {
        self.specs.get(&Identity::new(producer, name).to_string())
    }

    /// Feature spec by dotted name, searched across all origins.
    pub fn find_feature_spec(&self, name: &str) -> Option<&FeatureSpecInfo> {
        self.specs.values().find(|info| info.id.name == name)
    }

    pub fn has_layer(&self, model: &str, name: &str) -> bool {
        self.layers
            .get(model)
            .is_some_and(|names| names.contains(name))
    }

    pub fn layers(&self, model: &str) -> impl Iterator<Item = &str> {
        self.layers
            .get(model)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    pub fn configs(&self) -> &[ConfigInfo] {
        &self.configs
    }

    pub fn config(&self, id: &ConfigId) -> Option<&ConfigInfo> {
        self.configs.iter().find(|c| &c.id == id)
    }

    /// Standalone containers of the packs this one was resolved with,
    /// keyed by producer.
    pub fn full_dependencies(&self) -> impl Iterator<Item = (&str, &Arc<FeatureContainer>)> {
        self.full_dependencies.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn dependency(&self, producer: &str) -> Option<&Arc<FeatureContainer>> {
        self.full_dependencies.get(producer)
    }

    pub fn includes_all_specs(&self) -> bool {
        self.all_specs
    }

    pub fn is_edit(&self) -> bool {
        self.edit
    }
}

/// Session-owned cache of standalone per-pack containers, keyed by
/// feature-pack location. Entries are shared as `Arc` and survive for the
/// life of the session.
#[derive(Debug, Default)]
pub struct ContainerCache {
    standalone: HashMap<FeaturePackLocation, Arc<FeatureContainer>>,
}

impl ContainerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standalone container of a single pack: the pack resolved with its
    /// default customization, disabled specs omitted.
    pub fn get_or_build<R: ProvisioningResolver>(
        &mut self,
        resolver: &R,
        location: &FeaturePackLocation,
    ) -> Result<Arc<FeatureContainer>> {
        if let Some(container) = self.standalone.get(location) {
            return Ok(Arc::clone(container));
        }

        let mut builder = ProvisioningConfigBuilder::new();
        builder.add_feature_pack(FeaturePackConfig::new(location.clone()))?;
        let runtime = resolver.resolve(&builder.build())?;
        let mut container = FeatureContainer::build(&runtime, false, false)?;
        // Pack dependency graphs are acyclic (resolution rejects cycles),
        // so recursing here terminates.
        for rt in runtime.feature_packs() {
            if rt.producer() == location.producer {
                continue;
            }
            let dep = self.get_or_build(resolver, rt.location())?;
            container
                .full_dependencies
                .insert(rt.producer().to_string(), dep);
        }
        debug!(location = %location, "built standalone container");
        let container = Arc::new(container);
        self.standalone
            .insert(location.clone(), Arc::clone(&container));
        Ok(container)
    }

    /// Container of an editing session: built over the session's full
    /// runtime, disabled specs included, standalone dependency containers
    /// drawn from (and added to) the cache.
    pub fn session<R: ProvisioningResolver>(
        &mut self,
        resolver: &R,
        runtime: &ProvisioningRuntime,
    ) -> Result<Arc<FeatureContainer>> {
        let mut container = FeatureContainer::build(runtime, true, true)?;
        for rt in runtime.feature_packs() {
            let dep = self.get_or_build(resolver, rt.location())?;
            container
                .full_dependencies
                .insert(rt.producer().to_string(), dep);
        }
        Ok(Arc::new(container))
    }

    pub fn len(&self) -> usize {
        self.standalone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standalone.is_empty()
    }
}
