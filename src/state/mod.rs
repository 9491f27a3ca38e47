// src/state/mod.rs

//! The transactional editing session.
//!
//! A `State` owns the current immutable `ProvisioningConfig`, a live builder
//! mirroring it, the LIFO undo stack, and the resolved runtime/container of
//! the current committed state. Every `push` is all-or-nothing: the edit is
//! applied to the builder, the candidate config is fully re-resolved as the
//! validation oracle, and on any failure the edit is reverted so config,
//! runtime, container, and stack are exactly as before.

mod action;
pub mod config;
pub mod feature_pack;

pub use action::Action;

use crate::config::{ProvisioningConfig, ProvisioningConfigBuilder};
use crate::container::{ContainerCache, FeatureContainer};
use crate::error::{Error, Result};
use crate::runtime::{ProvisioningResolver, ProvisioningRuntime};
use action::EditContext;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Register a universe under a name, replacing any previous registration.
pub fn add_universe(name: impl Into<String>, spec: impl Into<String>) -> Action {
    Action::AddUniverse {
        name: name.into(),
        spec: spec.into(),
        prior: None,
        applied: false,
    }
}

pub fn remove_universe(name: impl Into<String>) -> Action {
    Action::RemoveUniverse {
        name: name.into(),
        removed: None,
    }
}

/// A provisioning editing session.
///
/// At most one resolved runtime is live at a time; committing an edit drops
/// the previous runtime and container when the new ones are adopted.
#[derive(Debug)]
pub struct State<R: ProvisioningResolver> {
    resolver: R,
    config: ProvisioningConfig,
    builder: ProvisioningConfigBuilder,
    stack: Vec<Action>,
    runtime: ProvisioningRuntime,
    container: Arc<FeatureContainer>,
    cache: ContainerCache,
}

impl<R: ProvisioningResolver> State<R> {
    /// Open a session over an empty composition.
    pub fn new(resolver: R) -> Result<Self> {
        Self::from_config(resolver, ProvisioningConfig::default())
    }

    /// Open a session over an existing composition, resolving it up front.
    pub fn from_config(resolver: R, config: ProvisioningConfig) -> Result<Self> {
        let runtime = resolver.resolve(&config)?;
        let mut cache = ContainerCache::new();
        let container = cache.session(&resolver, &runtime)?;
        info!(
            feature_packs = config.feature_packs().len(),
            "opened provisioning session"
        );
        Ok(Self {
            builder: ProvisioningConfigBuilder::from_config(&config),
            resolver,
            config,
            stack: Vec::new(),
            runtime,
            container,
            cache,
        })
    }

    /// Read a previously exported composition and open a session over it.
    pub fn import_from(resolver: R, path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: ProvisioningConfig = serde_json::from_str(&text)?;
        Self::from_config(resolver, config)
    }

    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    pub fn runtime(&self) -> &ProvisioningRuntime {
        &self.runtime
    }

    pub fn container(&self) -> &FeatureContainer {
        &self.container
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn has_actions(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn action_count(&self) -> usize {
        self.stack.len()
    }

    /// Apply an edit. On success the action lands on the undo stack and the
    /// session adopts the new config, runtime, and container. On any failure
    /// the edit is rolled back and the session is left untouched.
    pub fn push(&mut self, mut action: Action) -> Result<()> {
        debug!(action = action.name(), "applying edit");
        let applied = {
            let mut ctx = EditContext {
                builder: &mut self.builder,
                container: &self.container,
                runtime: &self.runtime,
            };
            action.apply(&mut ctx)
        };
        if let Err(original) = applied {
            return Err(self.rollback(&action, original));
        }
        match self.revalidate() {
            Ok(()) => {
                self.stack.push(action);
                Ok(())
            }
            Err(original) => Err(self.rollback(&action, original)),
        }
    }

    /// Undo the most recent edit. Returns `false` on an empty stack. If the
    /// reverted composition fails to revalidate, the pre-revert builder is
    /// restored and the error propagated, leaving the stack unchanged.
    pub fn pop(&mut self) -> Result<bool> {
        let Some(action) = self.stack.pop() else {
            return Ok(false);
        };
        debug!(action = action.name(), "reverting edit");
        // Re-applying the action would run its guards against the committed
        // container, which still reflects the action; a checkpoint restores
        // the exact pre-revert builder instead.
        let checkpoint = self.builder.clone();
        if let Err(e) = action.revert(&mut self.builder) {
            self.builder = checkpoint;
            self.stack.push(action);
            return Err(e);
        }
        match self.revalidate() {
            Ok(()) => Ok(true),
            Err(original) => {
                warn!(action = action.name(), error = %original, "undo failed to revalidate");
                self.builder = checkpoint;
                self.stack.push(action);
                Err(original)
            }
        }
    }

    /// Write the current composition as JSON, atomically (write to a temp
    /// file in the target directory, then rename into place).
    pub fn export_to(&self, path: &Path) -> Result<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
            None => tempfile::NamedTempFile::new_in(".")?,
        };
        serde_json::to_writer_pretty(&mut tmp, &self.config)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        info!(path = %path.display(), "exported provisioning config");
        Ok(())
    }

    fn rollback(&mut self, action: &Action, original: Error) -> Error {
        warn!(action = action.name(), error = %original, "edit failed, rolling back");
        match action.revert(&mut self.builder) {
            Ok(()) => original,
            Err(secondary) => Error::RollbackFailed {
                original: Box::new(original),
                secondary: Box::new(secondary),
            },
        }
    }

    /// Re-resolve the builder's composition and, on success, adopt it as the
    /// committed state. The previous runtime and container are dropped here.
    fn revalidate(&mut self) -> Result<()> {
        let candidate = self.builder.build();
        let runtime = self.resolver.resolve(&candidate)?;
        let container = self.cache.session(&self.resolver, &runtime)?;
        self.config = candidate;
        self.runtime = runtime;
        self.container = container;
        Ok(())
    }
}
