// src/state/config.rs

//! Edit factories for named-config level operations.

use super::Action;
use crate::config::{ConfigId, ConfigModel, FeatureConfig};

/// Define a new config on top of the composition. Fails on push if the id
/// is already defined.
pub fn define(config: ConfigModel) -> Action {
    Action::DefineConfig {
        config,
        applied: false,
    }
}

/// Drop the local definition of a config, restoring whatever the
/// feature-packs ship for that id.
pub fn reset(id: ConfigId) -> Action {
    Action::ResetConfig { id, prior: None }
}

pub fn include_layers(id: ConfigId, layers: impl IntoIterator<Item = String>) -> Action {
    Action::IncludeLayers {
        id,
        layers: layers.into_iter().collect(),
        created_config: false,
        applied: Vec::new(),
    }
}

pub fn exclude_layers(id: ConfigId, layers: impl IntoIterator<Item = String>) -> Action {
    Action::ExcludeLayers {
        id,
        layers: layers.into_iter().collect(),
        created_config: false,
        applied: Vec::new(),
    }
}

pub fn remove_included_layer(id: ConfigId, layer: impl Into<String>) -> Action {
    Action::RemoveIncludedLayer {
        id,
        layer: layer.into(),
        applied: false,
    }
}

pub fn remove_excluded_layer(id: ConfigId, layer: impl Into<String>) -> Action {
    Action::RemoveExcludedLayer {
        id,
        layer: layer.into(),
        applied: false,
    }
}

/// Add a feature to a config. Replaces an existing feature with the same
/// identity, or lifts an exclusion covering it.
pub fn add_feature(id: ConfigId, feature: FeatureConfig) -> Action {
    Action::AddFeature {
        id,
        feature,
        created_config: false,
        undo: None,
    }
}

/// Remove a feature from a config: deletes a locally defined feature, or
/// records an exclusion for an inherited one.
pub fn remove_feature(id: ConfigId, feature: FeatureConfig) -> Action {
    Action::RemoveFeature {
        id,
        feature,
        created_config: false,
        undo: None,
    }
}
