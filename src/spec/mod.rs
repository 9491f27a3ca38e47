// src/spec/mod.rs

//! The definition side of a feature-pack: what a released pack declares,
//! as opposed to what a composition selects from it (`crate::config`).
//!
//! A `FeaturePackSpec` contributes packages (units of installable content
//! with declared dependencies), feature specs (typed schemas for config
//! features), layers, and default configs. Specs are loaded from TOML
//! descriptors by `crate::repository` and shared as `Arc` across runtimes.

use crate::config::{ConfigModel, FeatureConfig, FeatureId, FeaturePackLocation};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A declared dependency on another feature-pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePackDepSpec {
    pub location: FeaturePackLocation,

    /// The name under which this pack refers to the dependency. Origin-less
    /// dependencies are still searched, in declaration order, when resolving
    /// package dependencies that name no origin.
    #[serde(default)]
    pub origin: Option<String>,
}

/// A package's declared dependency on another package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependencySpec {
    pub package: String,

    /// `None` means local to the declaring pack, falling back to a search of
    /// the pack's origin-less dependencies.
    #[serde(default)]
    pub origin: Option<String>,

    #[serde(default)]
    pub optional: bool,
}

impl PackageDependencySpec {
    pub fn local(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            origin: None,
            optional: false,
        }
    }

    pub fn external(origin: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            origin: Some(origin.into()),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A named unit of installable content with declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    #[serde(default)]
    pub deps: Vec<PackageDependencySpec>,
    /// Content listing, kept sorted for stable display.
    #[serde(default)]
    pub content: Vec<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            content: Vec::new(),
        }
    }

    pub fn with_dep(mut self, dep: PackageDependencySpec) -> Self {
        self.deps.push(dep);
        self
    }

    pub fn with_content(mut self, path: impl Into<String>) -> Self {
        self.content.push(path.into());
        self
    }
}

/// One parameter of a feature spec. Id parameters identify feature
/// instances; the rest configure them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureParamSpec {
    pub name: String,
    #[serde(default)]
    pub id: bool,
    #[serde(default)]
    pub default: Option<String>,
}

impl FeatureParamSpec {
    pub fn id(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: true,
            default: None,
        }
    }

    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: false,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// A typed schema for a configuration feature. The dotted `name`
/// (e.g. `subsystem.logging.logger`) doubles as the path of the feature in
/// the navigation trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(default)]
    pub params: Vec<FeatureParamSpec>,
    /// Packages this spec's features require.
    #[serde(default)]
    pub packages: Vec<PackageDependencySpec>,
}

impl FeatureSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            packages: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: FeatureParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_package(mut self, dep: PackageDependencySpec) -> Self {
        self.packages.push(dep);
        self
    }

    pub fn param(&self, name: &str) -> Option<&FeatureParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn id_params(&self) -> impl Iterator<Item = &FeatureParamSpec> {
        self.params.iter().filter(|p| p.id)
    }

    /// Resolve a feature placement into its identity: validate that every
    /// given parameter is declared, then collect id-parameter values,
    /// applying declared defaults.
    pub fn resolve_id(&self, feature: &FeatureConfig) -> Result<FeatureId> {
        for param in feature.params.keys() {
            if self.param(param).is_none() {
                return Err(Error::ParamNotDefined {
                    spec: self.name.clone(),
                    param: param.clone(),
                });
            }
        }
        let mut params = BTreeMap::new();
        for spec_param in self.id_params() {
            let value = feature
                .params
                .get(&spec_param.name)
                .cloned()
                .or_else(|| spec_param.default.clone())
                .ok_or_else(|| Error::MissingIdParam {
                    spec: self.name.clone(),
                    param: spec_param.name.clone(),
                })?;
            params.insert(spec_param.name.clone(), value);
        }
        Ok(FeatureId {
            spec: self.name.clone(),
            params,
        })
    }
}

/// A named, composable bundle of features expanded when included in a
/// config of the matching model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub features: Vec<FeatureConfig>,
    /// Other layers this layer pulls in.
    #[serde(default)]
    pub deps: Vec<String>,
}

/// Everything one released feature-pack declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePackSpec {
    pub location: FeaturePackLocation,
    #[serde(default)]
    pub deps: Vec<FeaturePackDepSpec>,
    /// Packages installed by default when the pack is provisioned with
    /// `inherit_packages`.
    #[serde(default)]
    pub default_packages: BTreeSet<String>,
    #[serde(default)]
    pub packages: BTreeMap<String, PackageSpec>,
    #[serde(default)]
    pub feature_specs: BTreeMap<String, FeatureSpec>,
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
    /// Default configs shipped by the pack.
    #[serde(default)]
    pub configs: Vec<ConfigModel>,
}

impl FeaturePackSpec {
    pub fn new(location: FeaturePackLocation) -> Self {
        Self {
            location,
            deps: Vec::new(),
            default_packages: BTreeSet::new(),
            packages: BTreeMap::new(),
            feature_specs: BTreeMap::new(),
            layers: Vec::new(),
            configs: Vec::new(),
        }
    }

    pub fn producer(&self) -> &str {
        &self.location.producer
    }

    pub fn package(&self, name: &str) -> Option<&PackageSpec> {
        self.packages.get(name)
    }

    pub fn feature_spec(&self, name: &str) -> Option<&FeatureSpec> {
        self.feature_specs.get(name)
    }

    pub fn layer(&self, model: &str, name: &str) -> Option<&LayerSpec> {
        self.layers
            .iter()
            .find(|l| l.model == model && l.name == name)
    }

    pub fn default_config(&self, id: &crate::config::ConfigId) -> Option<&ConfigModel> {
        self.configs.iter().find(|c| &c.id == id)
    }
}
