// src/config/feature_pack.rs

//! Per-feature-pack contribution config: which of a feature-pack's packages
//! and default configs take part in the composition.

use super::location::FeaturePackLocation;
use super::model::ConfigId;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn default_true() -> bool {
    true
}

/// One feature-pack's contribution to the composition.
///
/// A package or default-config name can never be simultaneously included and
/// excluded; the mutators below enforce that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePackConfig {
    pub location: FeaturePackLocation,

    /// Whether the pack's default packages take part (included/excluded
    /// filters apply on top).
    #[serde(default = "default_true")]
    pub inherit_packages: bool,

    /// Whether the pack's default configs take part.
    #[serde(default = "default_true")]
    pub inherit_configs: bool,

    #[serde(default)]
    pub included_packages: BTreeSet<String>,
    #[serde(default)]
    pub excluded_packages: BTreeSet<String>,

    /// Explicitly included default configs, in inclusion order.
    #[serde(default)]
    pub included_configs: Vec<ConfigId>,
    #[serde(default)]
    pub excluded_configs: BTreeSet<ConfigId>,

    /// A transitive dependency: pulled in by another feature-pack, listed
    /// here only to carry customization. Collapses to nothing when the
    /// customization is removed.
    #[serde(default)]
    pub transitive: bool,

    #[serde(default)]
    pub patches: Vec<FeaturePackLocation>,
}

impl FeaturePackConfig {
    pub fn new(location: FeaturePackLocation) -> Self {
        Self {
            location,
            inherit_packages: true,
            inherit_configs: true,
            included_packages: BTreeSet::new(),
            excluded_packages: BTreeSet::new(),
            included_configs: Vec::new(),
            excluded_configs: BTreeSet::new(),
            transitive: false,
            patches: Vec::new(),
        }
    }

    pub fn transitive(location: FeaturePackLocation) -> Self {
        let mut config = Self::new(location);
        config.transitive = true;
        config
    }

    pub fn producer(&self) -> &str {
        &self.location.producer
    }

    /// True if this entry carries no customization beyond naming the pack.
    /// An empty transitive entry is dropped from the persisted config rather
    /// than inflating it.
    pub fn is_empty_customization(&self) -> bool {
        self.inherit_packages
            && self.inherit_configs
            && self.included_packages.is_empty()
            && self.excluded_packages.is_empty()
            && self.included_configs.is_empty()
            && self.excluded_configs.is_empty()
            && self.patches.is_empty()
    }

    pub fn include_package(&mut self, package: &str) -> Result<()> {
        if self.excluded_packages.contains(package) {
            return Err(Error::PackageIncludeExcludeConflict(package.to_string()));
        }
        if !self.included_packages.insert(package.to_string()) {
            return Err(Error::PackageAlreadyIncluded(package.to_string()));
        }
        Ok(())
    }

    pub fn exclude_package(&mut self, package: &str) -> Result<()> {
        if self.included_packages.contains(package) {
            return Err(Error::PackageIncludeExcludeConflict(package.to_string()));
        }
        if !self.excluded_packages.insert(package.to_string()) {
            return Err(Error::PackageAlreadyExcluded(package.to_string()));
        }
        Ok(())
    }

    pub fn remove_included_package(&mut self, package: &str) -> Result<()> {
        if !self.included_packages.remove(package) {
            return Err(Error::PackageNotIncluded(package.to_string()));
        }
        Ok(())
    }

    pub fn remove_excluded_package(&mut self, package: &str) -> Result<()> {
        if !self.excluded_packages.remove(package) {
            return Err(Error::PackageNotExcluded(package.to_string()));
        }
        Ok(())
    }

    pub fn is_config_included(&self, id: &ConfigId) -> bool {
        self.included_configs.contains(id)
    }

    pub fn is_config_excluded(&self, id: &ConfigId) -> bool {
        self.excluded_configs.contains(id)
    }

    pub fn include_config(&mut self, id: ConfigId) -> Result<()> {
        if self.excluded_configs.contains(&id) {
            return Err(Error::ConfigIncludeExcludeConflict(id));
        }
        if self.included_configs.contains(&id) {
            return Err(Error::ConfigAlreadyIncluded(id));
        }
        self.included_configs.push(id);
        Ok(())
    }

    pub fn exclude_config(&mut self, id: ConfigId) -> Result<()> {
        if self.included_configs.contains(&id) {
            return Err(Error::ConfigIncludeExcludeConflict(id));
        }
        if !self.excluded_configs.insert(id.clone()) {
            return Err(Error::ConfigAlreadyExcluded(id));
        }
        Ok(())
    }

    /// Remove an explicit config include, returning its position so undo can
    /// restore it at the same index.
    pub fn remove_included_config(&mut self, id: &ConfigId) -> Result<usize> {
        match self.included_configs.iter().position(|c| c == id) {
            Some(index) => {
                self.included_configs.remove(index);
                Ok(index)
            }
            None => Err(Error::ConfigNotIncluded(id.clone())),
        }
    }

    /// Restore a config include at an exact position (undo path).
    pub fn insert_included_config(&mut self, index: usize, id: ConfigId) {
        let index = index.min(self.included_configs.len());
        self.included_configs.insert(index, id);
    }

    pub fn remove_excluded_config(&mut self, id: &ConfigId) -> Result<()> {
        if !self.excluded_configs.remove(id) {
            return Err(Error::ConfigNotExcluded(id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    fn fp() -> FeaturePackConfig {
        FeaturePackConfig::new(FeaturePackLocation::new("core", Version::new(1, 0, 0)))
    }

    #[test]
    fn test_package_include_exclude_conflict() {
        let mut config = fp();
        config.include_package("docs").unwrap();
        assert!(matches!(
            config.exclude_package("docs"),
            Err(Error::PackageIncludeExcludeConflict(_))
        ));
        assert!(config.included_packages.contains("docs"));
        assert!(!config.excluded_packages.contains("docs"));
    }

    #[test]
    fn test_config_include_order_preserved() {
        let mut config = fp();
        config.include_config(ConfigId::new("standalone", "a")).unwrap();
        config.include_config(ConfigId::new("standalone", "b")).unwrap();
        config.include_config(ConfigId::new("standalone", "c")).unwrap();

        let index = config
            .remove_included_config(&ConfigId::new("standalone", "b"))
            .unwrap();
        assert_eq!(index, 1);

        config.insert_included_config(index, ConfigId::new("standalone", "b"));
        let names: Vec<_> = config.included_configs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_empty_customization() {
        let mut config = FeaturePackConfig::transitive(FeaturePackLocation::new(
            "base",
            Version::new(2, 0, 0),
        ));
        assert!(config.is_empty_customization());
        config.exclude_package("docs").unwrap();
        assert!(!config.is_empty_customization());
        config.remove_excluded_package("docs").unwrap();
        assert!(config.is_empty_customization());
    }
}
