// src/runtime/mod.rs

//! The fully resolved, ready-to-materialize form of a `ProvisioningConfig`.
//!
//! Resolution is the editor's sole validation oracle: an edit is valid
//! exactly when the edited config still resolves. The algorithm lives behind
//! the `ProvisioningResolver` trait; `RepositoryResolver` is the reference
//! implementation over a `FeaturePackRepository`.
//!
//! A runtime is a scoped resource: the editing session holds at most one at
//! a time and drops the previous one when an edit commits.

mod resolver;

pub use resolver::RepositoryResolver;

use crate::config::{ConfigId, FeatureId, FeaturePackConfig, FeaturePackLocation, ProvisioningConfig};
use crate::error::{Error, Result};
use crate::spec::{FeaturePackSpec, PackageDependencySpec};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Resolves a desired composition into a runtime, validating it completely
/// in the process.
pub trait ProvisioningResolver {
    fn resolve(&self, config: &ProvisioningConfig) -> Result<ProvisioningRuntime>;
}

/// One feature-pack inside a resolved runtime.
#[derive(Debug, Clone)]
pub struct FeaturePackRuntime {
    pub spec: Arc<FeaturePackSpec>,

    /// The customization in effect for this pack (direct entry, transitive
    /// entry, or the default).
    pub config: FeaturePackConfig,

    /// Names of the packages selected for installation from this pack.
    pub packages: BTreeSet<String>,

    /// Declared origin name -> producer of the dependency.
    pub origins: BTreeMap<String, String>,

    /// Producers of dependencies declared without an origin, in declaration
    /// order (searched when resolving origin-less package dependencies).
    pub originless: Vec<String>,
}

impl FeaturePackRuntime {
    pub fn producer(&self) -> &str {
        self.spec.producer()
    }

    pub fn location(&self) -> &FeaturePackLocation {
        &self.spec.location
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.packages.contains(name)
    }
}

/// A feature instance yielded by a provisioned config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedFeature {
    /// Producer of the pack defining the feature spec.
    pub spec_origin: String,
    /// Dotted spec type name.
    pub spec: String,
    /// Resolved identity (id-parameter values).
    pub id: FeatureId,
    /// All resolved parameter values, id and non-id.
    pub params: BTreeMap<String, String>,
}

/// One final resolved named configuration.
#[derive(Debug, Clone)]
pub struct ProvisionedConfig {
    pub id: ConfigId,
    /// Resolved layer names, dependency order.
    pub layers: Vec<String>,
    features: Vec<ProvisionedFeature>,
}

impl ProvisionedConfig {
    pub(crate) fn new(id: ConfigId, layers: Vec<String>, features: Vec<ProvisionedFeature>) -> Self {
        Self { id, layers, features }
    }

    /// The config's features as a finite, restartable sequence.
    pub fn features(&self) -> impl Iterator<Item = &ProvisionedFeature> {
        self.features.iter()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }
}

/// The fully resolved composition.
#[derive(Debug, Clone)]
pub struct ProvisioningRuntime {
    feature_packs: Vec<FeaturePackRuntime>,
    by_producer: HashMap<String, usize>,
    configs: Vec<ProvisionedConfig>,
}

impl ProvisioningRuntime {
    pub(crate) fn new(
        feature_packs: Vec<FeaturePackRuntime>,
        configs: Vec<ProvisionedConfig>,
    ) -> Self {
        let by_producer = feature_packs
            .iter()
            .enumerate()
            .map(|(i, fp)| (fp.producer().to_string(), i))
            .collect();
        Self {
            feature_packs,
            by_producer,
            configs,
        }
    }

    /// Feature-packs in runtime order (dependencies before dependents).
    pub fn feature_packs(&self) -> &[FeaturePackRuntime] {
        &self.feature_packs
    }

    pub fn feature_pack(&self, producer: &str) -> Option<&FeaturePackRuntime> {
        self.by_producer
            .get(producer)
            .map(|&i| &self.feature_packs[i])
    }

    pub fn configs(&self) -> &[ProvisionedConfig] {
        &self.configs
    }

    pub(crate) fn feature_pack_mut(&mut self, producer: &str) -> Option<&mut FeaturePackRuntime> {
        self.by_producer
            .get(producer)
            .copied()
            .map(|i| &mut self.feature_packs[i])
    }

    pub(crate) fn set_configs(&mut self, configs: Vec<ProvisionedConfig>) {
        self.configs = configs;
    }

    /// Resolve a package dependency declared by `parent` into the producer
    /// actually providing it.
    ///
    /// Three origin cases: local to the parent pack; origin-less, searched
    /// across the parent's origin-less dependencies in order; and an
    /// explicitly named origin resolved through the parent's declared
    /// origin mapping. Returns `None` for an optional dependency nothing
    /// provides.
    pub fn resolve_package_dep(
        &self,
        parent: &str,
        dep: &PackageDependencySpec,
    ) -> Result<Option<(String, String)>> {
        let parent_rt = self
            .feature_pack(parent)
            .ok_or_else(|| Error::UnknownProducer(parent.to_string()))?;

        match &dep.origin {
            Some(origin) => {
                let target = parent_rt.origins.get(origin).ok_or_else(|| Error::UnknownOrigin {
                    producer: parent.to_string(),
                    origin: origin.clone(),
                })?;
                let target_rt = self
                    .feature_pack(target)
                    .ok_or_else(|| Error::UnknownProducer(target.clone()))?;
                if target_rt.spec.package(&dep.package).is_some() {
                    Ok(Some((target.clone(), dep.package.clone())))
                } else if dep.optional {
                    Ok(None)
                } else {
                    Err(Error::UnresolvedPackageDependency {
                        package: dep.package.clone(),
                        required_by: parent.to_string(),
                    })
                }
            }
            None => {
                if parent_rt.spec.package(&dep.package).is_some() {
                    return Ok(Some((parent.to_string(), dep.package.clone())));
                }
                for producer in &parent_rt.originless {
                    if let Some(rt) = self.feature_pack(producer) {
                        if rt.spec.package(&dep.package).is_some() {
                            return Ok(Some((producer.clone(), dep.package.clone())));
                        }
                    }
                }
                if dep.optional {
                    Ok(None)
                } else {
                    Err(Error::UnresolvedPackageDependency {
                        package: dep.package.clone(),
                        required_by: parent.to_string(),
                    })
                }
            }
        }
    }
}
