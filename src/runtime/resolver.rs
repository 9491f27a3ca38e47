// src/runtime/resolver.rs

//! Reference resolver over a `FeaturePackRepository`.
//!
//! Resolution proceeds in four passes: feature-pack layout (transitive
//! closure, dependencies first), package selection (inheritance filters plus
//! dependency closure), config assembly (default-config inheritance merged
//! with user-defined configs), and layer expansion plus feature
//! instantiation. Any inconsistency fails the whole resolve; the editing
//! session treats that failure as "the edit was invalid".

use super::{
    FeaturePackRuntime, ProvisionedConfig, ProvisionedFeature, ProvisioningResolver,
    ProvisioningRuntime,
};
use crate::config::{
    ConfigId, ConfigModel, FeatureConfig, FeatureId, FeaturePackConfig, FeaturePackLocation,
    ProvisioningConfig,
};
use crate::error::{Error, Result};
use crate::repository::FeaturePackRepository;
use crate::spec::{FeaturePackSpec, FeatureSpec, LayerSpec};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Resolves compositions against an in-memory feature-pack repository.
#[derive(Debug, Clone)]
pub struct RepositoryResolver {
    repo: FeaturePackRepository,
}

impl RepositoryResolver {
    pub fn new(repo: FeaturePackRepository) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &FeaturePackRepository {
        &self.repo
    }

    /// Compute the feature-pack layout: the transitive closure of the
    /// config's dependencies, dependencies before dependents, each producer
    /// resolved once. A transitive entry in the config overrides the version
    /// a dependency would otherwise be resolved at.
    fn layout(&self, config: &ProvisioningConfig) -> Result<Vec<Arc<FeaturePackSpec>>> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut visiting = HashSet::new();
        for fp in config.feature_packs() {
            self.visit(config, &fp.location, &mut order, &mut seen, &mut visiting)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        config: &ProvisioningConfig,
        location: &FeaturePackLocation,
        order: &mut Vec<Arc<FeaturePackSpec>>,
        seen: &mut HashSet<String>,
        visiting: &mut HashSet<String>,
    ) -> Result<()> {
        let producer = location.producer.clone();
        if seen.contains(&producer) {
            return Ok(());
        }
        if !visiting.insert(producer.clone()) {
            return Err(Error::CircularFeaturePackDependency(producer));
        }

        // A transitive customization may pin a different version than the
        // one the dependent pack declares.
        let effective = match config.transitive(&producer) {
            Some(t) if !config.has_feature_pack(&producer) => t.location.clone(),
            _ => location.clone(),
        };
        let spec = self.repo.get(&effective)?;
        for dep in &spec.deps {
            self.visit(config, &dep.location, order, seen, visiting)?;
        }

        visiting.remove(&producer);
        seen.insert(producer);
        order.push(spec);
        Ok(())
    }

    /// Build per-pack runtimes with their effective customization, origin
    /// maps, and initially selected packages; validates that every
    /// customization refers to things the pack actually declares.
    fn effective_runtimes(
        &self,
        config: &ProvisioningConfig,
        layout: Vec<Arc<FeaturePackSpec>>,
    ) -> Result<Vec<FeaturePackRuntime>> {
        let producers: HashSet<&str> = layout.iter().map(|s| s.producer()).collect();

        for t in config.transitives() {
            if config.has_feature_pack(t.producer()) {
                return Err(Error::FeaturePackAlreadyAdded(t.producer().to_string()));
            }
            if !producers.contains(t.producer()) {
                return Err(Error::UnknownProducer(t.producer().to_string()));
            }
        }

        let mut packs = Vec::with_capacity(layout.len());
        for spec in layout {
            let producer = spec.producer();
            let effective = config
                .feature_pack(producer)
                .or_else(|| config.transitive(producer))
                .cloned()
                .unwrap_or_else(|| FeaturePackConfig::transitive(spec.location.clone()));

            // The builder's mutators keep these sets disjoint, but a
            // deserialized composition bypasses them.
            if let Some(package) = effective
                .included_packages
                .intersection(&effective.excluded_packages)
                .next()
            {
                return Err(Error::PackageIncludeExcludeConflict(package.clone()));
            }
            if let Some(id) = effective
                .included_configs
                .iter()
                .find(|id| effective.excluded_configs.contains(id))
            {
                return Err(Error::ConfigIncludeExcludeConflict(id.clone()));
            }

            for package in effective
                .included_packages
                .iter()
                .chain(effective.excluded_packages.iter())
            {
                if spec.package(package).is_none() {
                    return Err(Error::UnknownPackage {
                        producer: producer.to_string(),
                        package: package.clone(),
                    });
                }
            }
            for id in effective
                .included_configs
                .iter()
                .chain(effective.excluded_configs.iter())
            {
                if spec.default_config(id).is_none() {
                    return Err(Error::UnknownConfig {
                        producer: producer.to_string(),
                        config: id.clone(),
                    });
                }
            }
            for package in &spec.default_packages {
                if spec.package(package).is_none() {
                    return Err(Error::UnknownPackage {
                        producer: producer.to_string(),
                        package: package.clone(),
                    });
                }
            }

            let mut origins = BTreeMap::new();
            let mut originless = Vec::new();
            for dep in &spec.deps {
                match &dep.origin {
                    Some(origin) => {
                        origins.insert(origin.clone(), dep.location.producer.clone());
                    }
                    None => originless.push(dep.location.producer.clone()),
                }
            }

            let mut selected = BTreeSet::new();
            if effective.inherit_packages {
                for package in &spec.default_packages {
                    if !effective.excluded_packages.contains(package) {
                        selected.insert(package.clone());
                    }
                }
            }
            selected.extend(effective.included_packages.iter().cloned());

            packs.push(FeaturePackRuntime {
                spec,
                config: effective,
                packages: selected,
                origins,
                originless,
            });
        }
        Ok(packs)
    }

    /// Close the package selection over declared package dependencies.
    /// An excluded package that a required dependency lands on fails the
    /// resolve; optional dependencies are skipped instead.
    fn close_packages(&self, runtime: &mut ProvisioningRuntime) -> Result<()> {
        let mut queue: VecDeque<(String, String)> = VecDeque::new();
        for fp in runtime.feature_packs() {
            for package in &fp.packages {
                queue.push_back((fp.producer().to_string(), package.clone()));
            }
        }

        let mut done: HashSet<(String, String)> = HashSet::new();
        while let Some((producer, package)) = queue.pop_front() {
            if !done.insert((producer.clone(), package.clone())) {
                continue;
            }
            let fp = runtime
                .feature_pack(&producer)
                .ok_or_else(|| Error::UnknownProducer(producer.clone()))?;
            let spec = fp.spec.package(&package).ok_or_else(|| Error::UnknownPackage {
                producer: producer.clone(),
                package: package.clone(),
            })?;
            let deps = spec.deps.clone();

            for dep in deps {
                let Some((target_producer, target_package)) =
                    runtime.resolve_package_dep(&producer, &dep)?
                else {
                    continue;
                };
                let target = runtime
                    .feature_pack(&target_producer)
                    .ok_or_else(|| Error::UnknownProducer(target_producer.clone()))?;
                if target.config.excluded_packages.contains(&target_package) {
                    if dep.optional {
                        continue;
                    }
                    return Err(Error::UnresolvedPackageDependency {
                        package: target_package,
                        required_by: format!("{}:{}", producer, package),
                    });
                }
                if !target.has_package(&target_package) {
                    runtime
                        .feature_pack_mut(&target_producer)
                        .ok_or_else(|| Error::UnknownProducer(target_producer.clone()))?
                        .packages
                        .insert(target_package.clone());
                }
                queue.push_back((target_producer, target_package));
            }
        }
        Ok(())
    }

    /// Merge default configs (subject to inheritance filters) with the
    /// user-defined configs, in contribution order.
    fn merge_configs(
        &self,
        config: &ProvisioningConfig,
        runtime: &ProvisioningRuntime,
    ) -> Vec<MergedConfig> {
        let mut merged: Vec<MergedConfig> = Vec::new();
        let mut by_id: HashMap<ConfigId, usize> = HashMap::new();

        let mut merge = |model: &ConfigModel, merged: &mut Vec<MergedConfig>| {
            let index = *by_id.entry(model.id.clone()).or_insert_with(|| {
                merged.push(MergedConfig::new(model.id.clone()));
                merged.len() - 1
            });
            merged[index].absorb(model);
        };

        for fp in runtime.feature_packs() {
            for model in &fp.spec.configs {
                if fp.config.is_config_excluded(&model.id) {
                    continue;
                }
                if !fp.config.inherit_configs && !fp.config.is_config_included(&model.id) {
                    continue;
                }
                merge(model, &mut merged);
            }
        }
        for model in config.defined_configs() {
            merge(model, &mut merged);
        }
        merged
    }

    fn provision_config(
        &self,
        runtime: &ProvisioningRuntime,
        merged: MergedConfig,
    ) -> Result<ProvisionedConfig> {
        // Excluded layers must at least exist for the model.
        for layer in &merged.layer_excludes {
            find_layer(runtime, &merged.id.model, layer).ok_or_else(|| Error::UnknownLayer {
                model: merged.id.model.clone(),
                name: layer.clone(),
            })?;
        }

        let mut layers = Vec::new();
        let mut layer_features = Vec::new();
        let mut visited = HashSet::new();
        for layer in &merged.layer_includes {
            if merged.layer_excludes.contains(layer) {
                continue;
            }
            self.expand_layer(
                runtime,
                &merged.id.model,
                layer,
                &merged.layer_excludes,
                &mut visited,
                &mut layers,
                &mut layer_features,
            )?;
        }

        let mut features: Vec<ProvisionedFeature> = Vec::new();
        let mut positions: HashMap<FeatureId, usize> = HashMap::new();
        for fc in layer_features.iter().chain(merged.features.iter()) {
            let (origin, spec) = find_feature_spec(runtime, &fc.spec)
                .ok_or_else(|| Error::UnknownFeatureSpec(fc.spec.clone()))?;
            let id = spec.resolve_id(fc)?;
            if merged.excluded_features.contains(&id) {
                continue;
            }

            let mut params: BTreeMap<String, String> = spec
                .params
                .iter()
                .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
                .collect();
            params.extend(fc.params.clone());
            params.extend(id.params.clone());

            let feature = ProvisionedFeature {
                spec_origin: origin.to_string(),
                spec: spec.name.clone(),
                id: id.clone(),
                params,
            };
            match positions.entry(id) {
                Entry::Occupied(entry) => features[*entry.get()] = feature,
                Entry::Vacant(entry) => {
                    entry.insert(features.len());
                    features.push(feature);
                }
            }
        }

        Ok(ProvisionedConfig::new(merged.id, layers, features))
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_layer(
        &self,
        runtime: &ProvisioningRuntime,
        model: &str,
        name: &str,
        excludes: &BTreeSet<String>,
        visited: &mut HashSet<String>,
        layers: &mut Vec<String>,
        features: &mut Vec<FeatureConfig>,
    ) -> Result<()> {
        if !visited.insert(name.to_string()) {
            return Ok(());
        }
        let layer = find_layer(runtime, model, name).ok_or_else(|| Error::UnknownLayer {
            model: model.to_string(),
            name: name.to_string(),
        })?;
        for dep in &layer.deps {
            if !excludes.contains(dep) {
                self.expand_layer(runtime, model, dep, excludes, visited, layers, features)?;
            }
        }
        layers.push(name.to_string());
        features.extend(layer.features.iter().cloned());
        Ok(())
    }
}

impl ProvisioningResolver for RepositoryResolver {
    fn resolve(&self, config: &ProvisioningConfig) -> Result<ProvisioningRuntime> {
        let layout = self.layout(config)?;
        let packs = self.effective_runtimes(config, layout)?;
        let mut runtime = ProvisioningRuntime::new(packs, Vec::new());
        self.close_packages(&mut runtime)?;

        let mut configs = Vec::new();
        for merged in self.merge_configs(config, &runtime) {
            configs.push(self.provision_config(&runtime, merged)?);
        }
        runtime.set_configs(configs);

        debug!(
            feature_packs = runtime.feature_packs().len(),
            configs = runtime.configs().len(),
            "resolved provisioning runtime"
        );
        Ok(runtime)
    }
}

fn find_layer<'r>(runtime: &'r ProvisioningRuntime, model: &str, name: &str) -> Option<&'r LayerSpec> {
    runtime
        .feature_packs()
        .iter()
        .find_map(|fp| fp.spec.layer(model, name))
}

fn find_feature_spec<'r>(
    runtime: &'r ProvisioningRuntime,
    name: &str,
) -> Option<(&'r str, &'r FeatureSpec)> {
    runtime
        .feature_packs()
        .iter()
        .find_map(|fp| fp.spec.feature_spec(name).map(|s| (fp.producer(), s)))
}

/// A config id's accumulated contributions before layer expansion.
struct MergedConfig {
    id: ConfigId,
    layer_includes: Vec<String>,
    layer_excludes: BTreeSet<String>,
    features: Vec<FeatureConfig>,
    excluded_features: BTreeSet<FeatureId>,
}

impl MergedConfig {
    fn new(id: ConfigId) -> Self {
        Self {
            id,
            layer_includes: Vec::new(),
            layer_excludes: BTreeSet::new(),
            features: Vec::new(),
            excluded_features: BTreeSet::new(),
        }
    }

    fn absorb(&mut self, model: &ConfigModel) {
        for layer in &model.included_layers {
            if !self.layer_includes.contains(layer) {
                self.layer_includes.push(layer.clone());
            }
            self.layer_excludes.remove(layer);
        }
        for layer in &model.excluded_layers {
            self.layer_excludes.insert(layer.clone());
            self.layer_includes.retain(|l| l != layer);
        }
        self.features.extend(model.features.iter().cloned());
        self.excluded_features
            .extend(model.excluded_features.iter().cloned());
    }
}
