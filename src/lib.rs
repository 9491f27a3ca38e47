// src/lib.rs

//! Provisioning state editor and dependency graph builder.
//!
//! Composes installable artifacts out of versioned, reusable feature-packs,
//! each contributing packages, feature specs, layers, and named configs.
//!
//! # Architecture
//!
//! - Immutable snapshots: the desired composition (`ProvisioningConfig`) is
//!   replaced, never mutated; every edit produces a fresh snapshot
//! - Transactional edits: `State::push` applies an `Action`, re-resolves the
//!   whole composition as the validation oracle, and rolls back on any
//!   failure; `State::pop` is the exact inverse
//! - Resolution oracle: `ProvisioningResolver` turns a composition into a
//!   `ProvisioningRuntime` or fails with a typed error
//! - Navigation graphs: resolved packages, feature specs, and features are
//!   reorganized into deduplicated, cycle-safe identity trees inside a
//!   `FeatureContainer`

pub mod config;
pub mod container;
mod error;
pub mod graph;
pub mod repository;
pub mod runtime;
pub mod spec;
pub mod state;

pub use config::{
    ConfigId, ConfigModel, FeatureConfig, FeatureId, FeaturePackConfig, FeaturePackLocation,
    ProvisioningConfig, ProvisioningConfigBuilder,
};
pub use container::{ContainerCache, FeatureContainer};
pub use error::{Error, Result};
pub use graph::{GroupId, GroupNode, GroupTree, Identity};
pub use repository::FeaturePackRepository;
pub use runtime::{ProvisioningResolver, ProvisioningRuntime, RepositoryResolver};
pub use state::{Action, State};
