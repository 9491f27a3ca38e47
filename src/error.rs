// src/error.rs

//! Crate-wide error type for provisioning operations.
//!
//! Errors fall into three families (see the state machine in `crate::state`):
//!
//! - **Description errors**: a malformed edit request (duplicate config id,
//!   excluding an already-included item, unknown parameter). Detected before
//!   any builder mutation is committed, so they never require rollback.
//! - **Resolution errors**: the edited configuration cannot be fully
//!   resolved (missing feature-pack, broken package dependency). Detected
//!   during the post-edit rebuild and always trigger rollback.
//! - **Consistency errors**: an already-resolved runtime turned out to be
//!   internally inconsistent while building the navigation graphs. These are
//!   data errors, not user errors, and are not part of the retry protocol.

use crate::config::{ConfigId, FeaturePackLocation};
use thiserror::Error;

/// Result type for provisioning operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing or resolving a provisioning state
#[derive(Debug, Error)]
pub enum Error {
    // --- description errors -------------------------------------------------
    #[error("feature-pack '{0}' is already a dependency")]
    FeaturePackAlreadyAdded(String),

    #[error("feature-pack '{0}' is not a dependency")]
    FeaturePackNotAdded(String),

    #[error("transitive dependency on '{0}' is already defined")]
    TransitiveAlreadyDefined(String),

    #[error("transitive dependency on '{0}' is not defined")]
    TransitiveNotDefined(String),

    #[error("package '{0}' is already included")]
    PackageAlreadyIncluded(String),

    #[error("package '{0}' is already excluded")]
    PackageAlreadyExcluded(String),

    #[error("package '{0}' is not included")]
    PackageNotIncluded(String),

    #[error("package '{0}' is not excluded")]
    PackageNotExcluded(String),

    #[error("package '{0}' cannot be both included and excluded")]
    PackageIncludeExcludeConflict(String),

    #[error("configuration {0} already exists")]
    ConfigAlreadyDefined(ConfigId),

    #[error("configuration {0} is not defined")]
    ConfigNotDefined(ConfigId),

    #[error("configuration {0} is already included")]
    ConfigAlreadyIncluded(ConfigId),

    #[error("configuration {0} is already excluded")]
    ConfigAlreadyExcluded(ConfigId),

    #[error("configuration {0} is not included")]
    ConfigNotIncluded(ConfigId),

    #[error("configuration {0} is not excluded")]
    ConfigNotExcluded(ConfigId),

    #[error("configuration {0} cannot be both included and excluded")]
    ConfigIncludeExcludeConflict(ConfigId),

    #[error("layer '{0}' is already included")]
    LayerAlreadyIncluded(String),

    #[error("layer '{0}' is not included")]
    LayerNotIncluded(String),

    #[error("layer '{0}' is already excluded")]
    LayerAlreadyExcluded(String),

    #[error("layer '{0}' is not excluded")]
    LayerNotExcluded(String),

    #[error("feature spec '{0}' not found in the current composition")]
    UnknownFeatureSpec(String),

    #[error("parameter '{param}' is not defined by feature spec '{spec}'")]
    ParamNotDefined { spec: String, param: String },

    #[error("id parameter '{param}' of feature spec '{spec}' has no value and no default")]
    MissingIdParam { spec: String, param: String },

    #[error("feature '{0}' not found in the current composition")]
    FeatureNotFound(String),

    #[error("universe '{0}' is not registered")]
    UnknownUniverse(String),

    #[error("universe '{0}' is already registered")]
    UniverseAlreadyRegistered(String),

    // --- resolution errors --------------------------------------------------
    #[error("feature-pack {0} not found in the repository")]
    UnknownFeaturePack(FeaturePackLocation),

    #[error("producer '{0}' is not part of the current composition")]
    UnknownProducer(String),

    #[error("circular feature-pack dependency involving '{0}'")]
    CircularFeaturePackDependency(String),

    #[error("feature-pack '{producer}' does not define package '{package}'")]
    UnknownPackage { producer: String, package: String },

    #[error("feature-pack '{producer}' does not ship configuration {config}")]
    UnknownConfig { producer: String, config: ConfigId },

    #[error("no layer '{name}' for model '{model}' in the current composition")]
    UnknownLayer { model: String, name: String },

    #[error("feature-pack '{producer}' declares no origin named '{origin}'")]
    UnknownOrigin { producer: String, origin: String },

    #[error("package '{package}' required by '{required_by}' could not be resolved")]
    UnresolvedPackageDependency {
        package: String,
        required_by: String,
    },

    // --- consistency errors -------------------------------------------------
    #[error("inconsistent package graph: '{0}' has no resolved package")]
    InconsistentPackageGraph(String),

    // --- rollback -----------------------------------------------------------
    /// A failed edit could not be rolled back. The original failure is
    /// preserved and the rollback failure attached as the secondary cause;
    /// the session is left in a best-effort pre-edit state.
    #[error("edit failed ({original}) and rollback also failed ({secondary})")]
    RollbackFailed {
        original: Box<Error>,
        secondary: Box<Error>,
    },

    // --- i/o and formats ----------------------------------------------------
    #[error("invalid feature-pack location '{0}', expected 'producer@version'")]
    InvalidLocation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse feature-pack descriptor: {0}")]
    Descriptor(#[from] toml::de::Error),
}
