// src/config/model.rs

//! Named configurations: the modeled bundles of features and layers that a
//! composition provisions. A `ConfigModel` is either shipped by a
//! feature-pack (a default config) or defined by the user on top of the
//! composition; both forms share this representation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifies a configuration by (model, name), e.g. `standalone/main`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigId {
    pub model: String,
    pub name: String,
}

impl ConfigId {
    pub fn new(model: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model, self.name)
    }
}

impl Default for ConfigId {
    fn default() -> Self {
        Self::new("", "")
    }
}

/// A concrete feature placement inside a config: the dotted spec type name
/// plus parameter values. Id parameters are told apart from the rest only by
/// the feature spec, at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub spec: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl FeatureConfig {
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Identity of a feature instance: its spec name plus the resolved values of
/// the spec's id parameters. Two features with equal `FeatureId` are the same
/// feature as far as replacement and exclusion are concerned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureId {
    pub spec: String,
    pub params: BTreeMap<String, String>,
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec)?;
        if !self.params.is_empty() {
            write!(f, ":")?;
            for (i, (k, v)) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", k, v)?;
            }
        }
        Ok(())
    }
}

/// A named, modeled bundle of features plus included/excluded layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigModel {
    pub id: ConfigId,
    #[serde(default)]
    pub included_layers: BTreeSet<String>,
    #[serde(default)]
    pub excluded_layers: BTreeSet<String>,
    #[serde(default)]
    pub features: Vec<FeatureConfig>,
    #[serde(default)]
    pub excluded_features: BTreeSet<FeatureId>,
    #[serde(default)]
    pub props: BTreeMap<String, String>,
}

impl ConfigModel {
    pub fn new(id: ConfigId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// True if this config carries no customization at all.
    pub fn is_empty(&self) -> bool {
        self.included_layers.is_empty()
            && self.excluded_layers.is_empty()
            && self.features.is_empty()
            && self.excluded_features.is_empty()
            && self.props.is_empty()
    }

    pub fn include_layer(&mut self, layer: &str) -> Result<()> {
        if self.included_layers.contains(layer) {
            return Err(Error::LayerAlreadyIncluded(layer.to_string()));
        }
        self.excluded_layers.remove(layer);
        self.included_layers.insert(layer.to_string());
        Ok(())
    }

    pub fn exclude_layer(&mut self, layer: &str) -> Result<()> {
        if self.excluded_layers.contains(layer) {
            return Err(Error::LayerAlreadyExcluded(layer.to_string()));
        }
        self.included_layers.remove(layer);
        self.excluded_layers.insert(layer.to_string());
        Ok(())
    }

    pub fn remove_included_layer(&mut self, layer: &str) -> Result<()> {
        if !self.included_layers.remove(layer) {
            return Err(Error::LayerNotIncluded(layer.to_string()));
        }
        Ok(())
    }

    pub fn remove_excluded_layer(&mut self, layer: &str) -> Result<()> {
        if !self.excluded_layers.remove(layer) {
            return Err(Error::LayerNotExcluded(layer.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_mutual_exclusion() {
        let mut config = ConfigModel::new(ConfigId::new("standalone", "main"));
        config.include_layer("web").unwrap();
        config.exclude_layer("web").unwrap();
        assert!(!config.included_layers.contains("web"));
        assert!(config.excluded_layers.contains("web"));
    }

    #[test]
    fn test_redundant_layer_ops_rejected() {
        let mut config = ConfigModel::new(ConfigId::new("standalone", "main"));
        config.include_layer("web").unwrap();
        assert!(matches!(
            config.include_layer("web"),
            Err(Error::LayerAlreadyIncluded(_))
        ));
        assert!(matches!(
            config.remove_excluded_layer("web"),
            Err(Error::LayerNotExcluded(_))
        ));
    }

    #[test]
    fn test_empty_config() {
        let mut config = ConfigModel::new(ConfigId::new("standalone", "main"));
        assert!(config.is_empty());
        config.include_layer("web").unwrap();
        assert!(!config.is_empty());
    }
}
