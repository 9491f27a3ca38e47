// src/container/info.rs

//! Read-only payloads carried by group nodes.

use crate::config::{ConfigId, FeatureId, FeaturePackLocation};
use crate::graph::Identity;
use crate::spec::FeatureSpec;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A package as seen through a container: where it came from, what it
/// installs, and which specs pull it in.
#[derive(Debug, Clone)]
pub struct PackageInfo {
    pub identity: Identity,
    pub location: FeaturePackLocation,
    /// Sorted content listing.
    pub content: Vec<String>,
    /// Identities of the feature specs whose package requirements reach
    /// this package.
    pub providers: BTreeSet<Identity>,
}

impl PackageInfo {
    pub fn new(identity: Identity, location: FeaturePackLocation, content: Vec<String>) -> Self {
        Self {
            identity,
            location,
            content,
            providers: BTreeSet::new(),
        }
    }
}

/// A feature spec as seen through a container.
#[derive(Debug, Clone)]
pub struct FeatureSpecInfo {
    pub id: Identity,
    pub location: FeaturePackLocation,
    pub spec: Arc<FeatureSpec>,
    /// False when some required package is not selected in the runtime the
    /// container was built from.
    pub enabled: bool,
    pub missing_packages: Vec<String>,
}

impl FeatureSpecInfo {
    pub fn new(id: Identity, location: FeaturePackLocation, spec: Arc<FeatureSpec>) -> Self {
        Self {
            id,
            location,
            spec,
            enabled: true,
            missing_packages: Vec::new(),
        }
    }

    pub fn with_missing_packages(mut self, missing: Vec<String>) -> Self {
        self.enabled = missing.is_empty();
        self.missing_packages = missing;
        self
    }
}

/// One feature instance of a provisioned config.
#[derive(Debug, Clone)]
pub struct FeatureInfo {
    pub id: FeatureId,
    pub spec_id: Identity,
    /// All resolved parameter values.
    pub params: BTreeMap<String, String>,
    /// Group path: the spec's dotted-name segments followed by the feature's
    /// id-parameter values.
    pub path: Vec<String>,
    pub config: ConfigId,
}

impl FeatureInfo {
    pub fn new(
        id: FeatureId,
        spec_id: Identity,
        params: BTreeMap<String, String>,
        path: Vec<String>,
        config: ConfigId,
    ) -> Self {
        Self {
            id,
            spec_id,
            params,
            path,
            config,
        }
    }
}

/// Summary of one resolved named config.
#[derive(Debug, Clone)]
pub struct ConfigInfo {
    pub id: ConfigId,
    /// Resolved layers, dependency order.
    pub layers: Vec<String>,
    /// Feature identities, resolution order.
    pub features: Vec<FeatureId>,
}
