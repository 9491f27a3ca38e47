// src/state/feature_pack.rs

//! Edit factories for feature-pack level operations.
//!
//! Factories only describe the request; all validation and undo recording
//! happens when the action is pushed onto a `State`.

use super::Action;
use crate::config::{ConfigId, FeaturePackConfig};

pub fn add(config: FeaturePackConfig) -> Action {
    Action::AddFeaturePack {
        config,
        displaced_transitive: None,
        applied: false,
    }
}

/// Remove one or more feature-packs, direct or transitive, in one edit.
pub fn remove(producers: impl IntoIterator<Item = String>) -> Action {
    Action::RemoveFeaturePacks {
        producers: producers.into_iter().collect(),
        removed: Vec::new(),
    }
}

pub fn include_default_config(
    id: ConfigId,
    producers: impl IntoIterator<Item = String>,
) -> Action {
    Action::IncludeDefaultConfig {
        id,
        producers: producers.into_iter().collect(),
        applied: Vec::new(),
    }
}

pub fn exclude_default_config(
    id: ConfigId,
    producers: impl IntoIterator<Item = String>,
) -> Action {
    Action::ExcludeDefaultConfig {
        id,
        producers: producers.into_iter().collect(),
        applied: Vec::new(),
    }
}

pub fn remove_included_default_config(
    id: ConfigId,
    producers: impl IntoIterator<Item = String>,
) -> Action {
    Action::RemoveIncludedConfig {
        id,
        producers: producers.into_iter().collect(),
        applied: Vec::new(),
    }
}

pub fn remove_excluded_default_config(
    id: ConfigId,
    producers: impl IntoIterator<Item = String>,
) -> Action {
    Action::RemoveExcludedConfig {
        id,
        producers: producers.into_iter().collect(),
        applied: Vec::new(),
    }
}

pub fn include_packages(
    producer: impl Into<String>,
    packages: impl IntoIterator<Item = String>,
) -> Action {
    Action::IncludePackages {
        producer: producer.into(),
        packages: packages.into_iter().collect(),
        entry: None,
        applied: Vec::new(),
    }
}

pub fn exclude_packages(
    producer: impl Into<String>,
    packages: impl IntoIterator<Item = String>,
) -> Action {
    Action::ExcludePackages {
        producer: producer.into(),
        packages: packages.into_iter().collect(),
        entry: None,
        applied: Vec::new(),
    }
}

pub fn remove_included_packages(
    producer: impl Into<String>,
    packages: impl IntoIterator<Item = String>,
) -> Action {
    Action::RemoveIncludedPackages {
        producer: producer.into(),
        packages: packages.into_iter().collect(),
        entry: None,
        applied: Vec::new(),
    }
}

pub fn remove_excluded_packages(
    producer: impl Into<String>,
    packages: impl IntoIterator<Item = String>,
) -> Action {
    Action::RemoveExcludedPackages {
        producer: producer.into(),
        packages: packages.into_iter().collect(),
        entry: None,
        applied: Vec::new(),
    }
}
