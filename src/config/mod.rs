// src/config/mod.rs

//! The desired-composition data model.
//!
//! A `ProvisioningConfig` is an immutable snapshot of everything the user
//! asked for: which feature-packs (in which order), which transitive
//! dependencies carry customization, which configs are defined on top, and
//! the registered universes. Snapshots are built only through
//! `ProvisioningConfigBuilder` and replaced, never mutated, on every
//! successful edit.

mod feature_pack;
mod location;
mod model;

pub use feature_pack::FeaturePackConfig;
pub use location::FeaturePackLocation;
pub use model::{ConfigId, ConfigModel, FeatureConfig, FeatureId};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable snapshot of the whole desired composition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Direct feature-pack dependencies. Order is user-visible and persisted.
    #[serde(default)]
    feature_packs: Vec<FeaturePackConfig>,

    /// Transitive dependencies carrying customization.
    #[serde(default)]
    transitives: Vec<FeaturePackConfig>,

    /// Named universe registrations (name -> universe spec).
    #[serde(default)]
    universes: BTreeMap<String, String>,

    /// Configs defined on top of the composition, in definition order.
    #[serde(default)]
    configs: Vec<ConfigModel>,

    /// Provisioning options.
    #[serde(default)]
    options: BTreeMap<String, String>,
}

impl ProvisioningConfig {
    pub fn feature_packs(&self) -> &[FeaturePackConfig] {
        &self.feature_packs
    }

    pub fn transitives(&self) -> &[FeaturePackConfig] {
        &self.transitives
    }

    pub fn universes(&self) -> &BTreeMap<String, String> {
        &self.universes
    }

    pub fn defined_configs(&self) -> &[ConfigModel] {
        &self.configs
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn has_feature_pack(&self, producer: &str) -> bool {
        self.feature_packs.iter().any(|fp| fp.producer() == producer)
    }

    pub fn feature_pack(&self, producer: &str) -> Option<&FeaturePackConfig> {
        self.feature_packs.iter().find(|fp| fp.producer() == producer)
    }

    pub fn transitive(&self, producer: &str) -> Option<&FeaturePackConfig> {
        self.transitives.iter().find(|fp| fp.producer() == producer)
    }

    pub fn defined_config(&self, id: &ConfigId) -> Option<&ConfigModel> {
        self.configs.iter().find(|c| &c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.feature_packs.is_empty()
            && self.transitives.is_empty()
            && self.universes.is_empty()
            && self.configs.is_empty()
            && self.options.is_empty()
    }
}

/// Mutable builder for `ProvisioningConfig`. The editing session keeps one
/// live builder; every committed edit produces a fresh immutable snapshot
/// via `build()`.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningConfigBuilder {
    feature_packs: Vec<FeaturePackConfig>,
    transitives: Vec<FeaturePackConfig>,
    universes: BTreeMap<String, String>,
    configs: Vec<ConfigModel>,
    options: BTreeMap<String, String>,
}

impl ProvisioningConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ProvisioningConfig) -> Self {
        Self {
            feature_packs: config.feature_packs.clone(),
            transitives: config.transitives.clone(),
            universes: config.universes.clone(),
            configs: config.configs.clone(),
            options: config.options.clone(),
        }
    }

    /// Snapshot the current builder state into an immutable config.
    pub fn build(&self) -> ProvisioningConfig {
        ProvisioningConfig {
            feature_packs: self.feature_packs.clone(),
            transitives: self.transitives.clone(),
            universes: self.universes.clone(),
            configs: self.configs.clone(),
            options: self.options.clone(),
        }
    }

    // --- feature-pack dependencies ------------------------------------------

    pub fn has_feature_pack(&self, producer: &str) -> bool {
        self.feature_packs.iter().any(|fp| fp.producer() == producer)
    }

    pub fn add_feature_pack(&mut self, config: FeaturePackConfig) -> Result<()> {
        if self.has_feature_pack(config.producer()) {
            return Err(Error::FeaturePackAlreadyAdded(config.producer().to_string()));
        }
        self.feature_packs.push(config);
        Ok(())
    }

    /// Restore a dependency at an exact position (undo path).
    pub fn insert_feature_pack(&mut self, index: usize, config: FeaturePackConfig) -> Result<()> {
        if self.has_feature_pack(config.producer()) {
            return Err(Error::FeaturePackAlreadyAdded(config.producer().to_string()));
        }
        let index = index.min(self.feature_packs.len());
        self.feature_packs.insert(index, config);
        Ok(())
    }

    /// Remove a direct dependency, returning its position and config so undo
    /// can restore the exact prior state.
    pub fn remove_feature_pack(&mut self, producer: &str) -> Result<(usize, FeaturePackConfig)> {
        match self
            .feature_packs
            .iter()
            .position(|fp| fp.producer() == producer)
        {
            Some(index) => Ok((index, self.feature_packs.remove(index))),
            None => Err(Error::FeaturePackNotAdded(producer.to_string())),
        }
    }

    pub fn feature_pack_mut(&mut self, producer: &str) -> Result<&mut FeaturePackConfig> {
        self.feature_packs
            .iter_mut()
            .find(|fp| fp.producer() == producer)
            .ok_or_else(|| Error::FeaturePackNotAdded(producer.to_string()))
    }

    // --- transitive dependencies --------------------------------------------

    pub fn has_transitive(&self, producer: &str) -> bool {
        self.transitives.iter().any(|fp| fp.producer() == producer)
    }

    pub fn add_transitive(&mut self, config: FeaturePackConfig) -> Result<()> {
        if self.has_transitive(config.producer()) {
            return Err(Error::TransitiveAlreadyDefined(config.producer().to_string()));
        }
        self.transitives.push(config);
        Ok(())
    }

    pub fn remove_transitive(&mut self, producer: &str) -> Result<FeaturePackConfig> {
        match self
            .transitives
            .iter()
            .position(|fp| fp.producer() == producer)
        {
            Some(index) => Ok(self.transitives.remove(index)),
            None => Err(Error::TransitiveNotDefined(producer.to_string())),
        }
    }

    pub fn transitive_mut(&mut self, producer: &str) -> Result<&mut FeaturePackConfig> {
        self.transitives
            .iter_mut()
            .find(|fp| fp.producer() == producer)
            .ok_or_else(|| Error::TransitiveNotDefined(producer.to_string()))
    }

    /// Drop a transitive entry if it no longer carries any customization,
    /// returning the dropped config for the undo record.
    pub fn collapse_empty_transitive(&mut self, producer: &str) -> Option<FeaturePackConfig> {
        let index = self
            .transitives
            .iter()
            .position(|fp| fp.producer() == producer && fp.is_empty_customization())?;
        Some(self.transitives.remove(index))
    }

    // --- defined configs ----------------------------------------------------

    pub fn has_config(&self, id: &ConfigId) -> bool {
        self.configs.iter().any(|c| &c.id == id)
    }

    pub fn add_config(&mut self, config: ConfigModel) -> Result<()> {
        if self.has_config(&config.id) {
            return Err(Error::ConfigAlreadyDefined(config.id));
        }
        self.configs.push(config);
        Ok(())
    }

    pub fn remove_config(&mut self, id: &ConfigId) -> Result<ConfigModel> {
        match self.configs.iter().position(|c| &c.id == id) {
            Some(index) => Ok(self.configs.remove(index)),
            None => Err(Error::ConfigNotDefined(id.clone())),
        }
    }

    pub fn config_mut(&mut self, id: &ConfigId) -> Result<&mut ConfigModel> {
        self.configs
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| Error::ConfigNotDefined(id.clone()))
    }

    pub fn defined_configs(&self) -> &[ConfigModel] {
        &self.configs
    }

    /// Replace the whole defined-config list (undo path of a config reset).
    pub fn set_defined_configs(&mut self, configs: Vec<ConfigModel>) {
        self.configs = configs;
    }

    // --- universes ----------------------------------------------------------

    /// Register a universe, returning any previous spec under that name.
    pub fn add_universe(&mut self, name: &str, spec: &str) -> Result<Option<String>> {
        if let Some(existing) = self.universes.get(name) {
            if existing == spec {
                return Err(Error::UniverseAlreadyRegistered(name.to_string()));
            }
        }
        Ok(self.universes.insert(name.to_string(), spec.to_string()))
    }

    pub fn remove_universe(&mut self, name: &str) -> Result<String> {
        self.universes
            .remove(name)
            .ok_or_else(|| Error::UnknownUniverse(name.to_string()))
    }

    pub fn restore_universe(&mut self, name: &str, spec: String) {
        self.universes.insert(name.to_string(), spec);
    }

    // --- options ------------------------------------------------------------

    pub fn set_option(&mut self, name: &str, value: &str) -> Option<String> {
        self.options.insert(name.to_string(), value.to_string())
    }

    pub fn remove_option(&mut self, name: &str) -> Option<String> {
        self.options.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    fn loc(producer: &str) -> FeaturePackLocation {
        FeaturePackLocation::new(producer, Version::new(1, 0, 0))
    }

    #[test]
    fn test_builder_snapshot_is_detached() {
        let mut builder = ProvisioningConfigBuilder::new();
        builder
            .add_feature_pack(FeaturePackConfig::new(loc("core")))
            .unwrap();
        let snapshot = builder.build();

        builder
            .add_feature_pack(FeaturePackConfig::new(loc("extras")))
            .unwrap();

        assert_eq!(snapshot.feature_packs().len(), 1);
        assert_eq!(builder.build().feature_packs().len(), 2);
    }

    #[test]
    fn test_duplicate_feature_pack_rejected() {
        let mut builder = ProvisioningConfigBuilder::new();
        builder
            .add_feature_pack(FeaturePackConfig::new(loc("core")))
            .unwrap();
        assert!(matches!(
            builder.add_feature_pack(FeaturePackConfig::new(loc("core"))),
            Err(Error::FeaturePackAlreadyAdded(_))
        ));
    }

    #[test]
    fn test_remove_restores_exact_index() {
        let mut builder = ProvisioningConfigBuilder::new();
        for name in ["a", "b", "c"] {
            builder
                .add_feature_pack(FeaturePackConfig::new(loc(name)))
                .unwrap();
        }
        let (index, removed) = builder.remove_feature_pack("b").unwrap();
        assert_eq!(index, 1);
        builder.insert_feature_pack(index, removed).unwrap();

        let order: Vec<_> = builder
            .build()
            .feature_packs()
            .iter()
            .map(|fp| fp.producer().to_string())
            .collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn test_collapse_empty_transitive() {
        let mut builder = ProvisioningConfigBuilder::new();
        let mut transitive = FeaturePackConfig::transitive(loc("base"));
        transitive.exclude_package("docs").unwrap();
        builder.add_transitive(transitive).unwrap();

        assert!(builder.collapse_empty_transitive("base").is_none());
        builder
            .transitive_mut("base")
            .unwrap()
            .remove_excluded_package("docs")
            .unwrap();
        let dropped = builder.collapse_empty_transitive("base").unwrap();
        assert_eq!(dropped.producer(), "base");
        assert!(builder.build().transitives().is_empty());
    }

    #[test]
    fn test_duplicate_config_definition_rejected() {
        let mut builder = ProvisioningConfigBuilder::new();
        let id = ConfigId::new("standalone", "main");
        builder.add_config(ConfigModel::new(id.clone())).unwrap();
        assert!(matches!(
            builder.add_config(ConfigModel::new(id)),
            Err(Error::ConfigAlreadyDefined(_))
        ));
    }
}
