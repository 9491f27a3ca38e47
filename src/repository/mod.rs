// src/repository/mod.rs

//! Feature-pack repository: the versioned registry the resolver draws from.
//!
//! Packs are registered in memory or loaded from TOML descriptors, one
//! descriptor per released feature-pack:
//!
//! ```toml
//! [location]
//! producer = "core"
//! version = "1.0.0"
//!
//! [[deps]]
//! origin = "base"
//! location = { producer = "base", version = "1.0.0" }
//!
//! default_packages = ["server"]
//!
//! [packages.server]
//! name = "server"
//! deps = [{ package = "launcher" }]
//! content = ["bin/server"]
//!
//! [feature_specs."subsystem.logging.logger"]
//! name = "subsystem.logging.logger"
//! params = [{ name = "name", id = true }]
//!
//! [[layers]]
//! name = "web"
//! model = "standalone"
//!
//! [[configs]]
//! id = { model = "standalone", name = "main" }
//! ```

use crate::config::FeaturePackLocation;
use crate::error::{Error, Result};
use crate::spec::FeaturePackSpec;
use semver::Version;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// In-memory registry of feature-pack specs, keyed by producer and version.
#[derive(Debug, Clone, Default)]
pub struct FeaturePackRepository {
    packs: BTreeMap<String, BTreeMap<Version, Arc<FeaturePackSpec>>>,
}

impl FeaturePackRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature-pack spec. Re-registering the same
    /// producer/version replaces the previous spec.
    pub fn add(&mut self, spec: FeaturePackSpec) -> Arc<FeaturePackSpec> {
        let spec = Arc::new(spec);
        self.packs
            .entry(spec.producer().to_string())
            .or_default()
            .insert(spec.location.version.clone(), Arc::clone(&spec));
        spec
    }

    pub fn get(&self, location: &FeaturePackLocation) -> Result<Arc<FeaturePackSpec>> {
        self.packs
            .get(&location.producer)
            .and_then(|versions| versions.get(&location.version))
            .cloned()
            .ok_or_else(|| Error::UnknownFeaturePack(location.clone()))
    }

    /// Latest registered version of a producer.
    pub fn latest(&self, producer: &str) -> Result<Arc<FeaturePackSpec>> {
        self.packs
            .get(producer)
            .and_then(|versions| versions.values().next_back())
            .cloned()
            .ok_or_else(|| Error::UnknownProducer(producer.to_string()))
    }

    pub fn producers(&self) -> impl Iterator<Item = &str> {
        self.packs.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    /// Load a single TOML feature-pack descriptor.
    pub fn load_file(&mut self, path: &Path) -> Result<Arc<FeaturePackSpec>> {
        let text = fs::read_to_string(path)?;
        let spec: FeaturePackSpec = toml::from_str(&text)?;
        debug!(descriptor = %path.display(), location = %spec.location, "loaded feature-pack");
        Ok(self.add(spec))
    }

    /// Load every `*.toml` descriptor in a directory (non-recursive).
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut loaded = 0;
        let mut entries: Vec<_> = fs::read_dir(dir)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        entries.sort();
        for path in entries {
            self.load_file(&path)?;
            loaded += 1;
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn spec(producer: &str, version: Version) -> FeaturePackSpec {
        FeaturePackSpec::new(FeaturePackLocation::new(producer, version))
    }

    #[test]
    fn test_get_exact_version() {
        let mut repo = FeaturePackRepository::new();
        repo.add(spec("core", Version::new(1, 0, 0)));
        repo.add(spec("core", Version::new(2, 0, 0)));

        let loc = FeaturePackLocation::new("core", Version::new(1, 0, 0));
        assert_eq!(repo.get(&loc).unwrap().location, loc);
        assert!(matches!(
            repo.get(&FeaturePackLocation::new("core", Version::new(3, 0, 0))),
            Err(Error::UnknownFeaturePack(_))
        ));
    }

    #[test]
    fn test_latest_picks_highest_version() {
        let mut repo = FeaturePackRepository::new();
        repo.add(spec("core", Version::new(1, 0, 0)));
        repo.add(spec("core", Version::new(1, 10, 0)));
        repo.add(spec("core", Version::new(1, 2, 0)));

        assert_eq!(
            repo.latest("core").unwrap().location.version,
            Version::new(1, 10, 0)
        );
        assert!(matches!(
            repo.latest("missing"),
            Err(Error::UnknownProducer(_))
        ));
    }

    #[test]
    fn test_load_dir_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("core.toml")).unwrap();
        writeln!(
            file,
            r#"
default_packages = ["server"]

[location]
producer = "core"
version = "1.0.0"

[packages.server]
name = "server"
content = ["bin/server"]
"#
        )
        .unwrap();

        let mut repo = FeaturePackRepository::new();
        assert_eq!(repo.load_dir(dir.path()).unwrap(), 1);
        let pack = repo.latest("core").unwrap();
        assert!(pack.package("server").is_some());
        assert!(pack.default_packages.contains("server"));
    }
}
