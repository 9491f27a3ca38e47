// src/state/action.rs

//! The closed set of edit operations.
//!
//! Every variant carries its request payload plus the undo records `apply`
//! fills in while mutating the builder. `apply` records incrementally, so
//! `revert` undoes exactly what was committed even after a mid-batch
//! failure. Guarded no-ops (e.g. including an already-included config)
//! mutate nothing and record nothing, but the edit still revalidates.

use crate::config::{
    ConfigId, ConfigModel, FeatureConfig, FeatureId, FeaturePackConfig, ProvisioningConfigBuilder,
};
use crate::container::FeatureContainer;
use crate::error::{Error, Result};
use crate::runtime::ProvisioningRuntime;
use std::sync::Arc;

/// Everything an edit may consult while applying: the live builder it
/// mutates, plus the container and runtime of the current committed state.
pub(crate) struct EditContext<'a> {
    pub builder: &'a mut ProvisioningConfigBuilder,
    pub container: &'a FeatureContainer,
    pub runtime: &'a ProvisioningRuntime,
}

/// How an edit reached a feature-pack entry, recorded per target so undo
/// restores the exact prior shape.
#[derive(Debug, Clone)]
pub enum PackEntry {
    /// A direct dependency entry.
    Direct,
    /// A pre-existing transitive entry.
    Transitive,
    /// A transitive entry created by this edit; undo removes it whole.
    CreatedTransitive,
    /// A transitive entry this edit emptied and collapsed; undo re-adds it.
    CollapsedTransitive(FeaturePackConfig),
}

/// Removal record of one feature-pack target.
#[derive(Debug, Clone)]
pub enum PackRemoval {
    Direct { index: usize, config: FeaturePackConfig },
    Transitive { config: FeaturePackConfig },
}

/// Per-layer undo record: whether the opposite set held the layer before.
#[derive(Debug, Clone)]
pub struct LayerUndo {
    pub layer: String,
    pub opposite_was_set: bool,
}

#[derive(Debug, Clone)]
pub enum AddFeatureUndo {
    Added { index: usize },
    Replaced { index: usize, feature: FeatureConfig },
    Unexcluded { id: FeatureId },
}

#[derive(Debug, Clone)]
pub enum RemoveFeatureUndo {
    RemovedLocal { index: usize, feature: FeatureConfig },
    Excluded { id: FeatureId },
}

/// One atomic edit of the provisioning state.
#[derive(Debug)]
pub enum Action {
    AddFeaturePack {
        config: FeaturePackConfig,
        displaced_transitive: Option<FeaturePackConfig>,
        applied: bool,
    },
    RemoveFeaturePacks {
        producers: Vec<String>,
        removed: Vec<(String, PackRemoval)>,
    },
    IncludeDefaultConfig {
        id: ConfigId,
        producers: Vec<String>,
        applied: Vec<(String, PackEntry)>,
    },
    ExcludeDefaultConfig {
        id: ConfigId,
        producers: Vec<String>,
        applied: Vec<(String, PackEntry)>,
    },
    RemoveIncludedConfig {
        id: ConfigId,
        producers: Vec<String>,
        applied: Vec<(String, usize, PackEntry)>,
    },
    RemoveExcludedConfig {
        id: ConfigId,
        producers: Vec<String>,
        applied: Vec<(String, PackEntry)>,
    },
    IncludePackages {
        producer: String,
        packages: Vec<String>,
        entry: Option<PackEntry>,
        applied: Vec<String>,
    },
    ExcludePackages {
        producer: String,
        packages: Vec<String>,
        entry: Option<PackEntry>,
        applied: Vec<String>,
    },
    RemoveIncludedPackages {
        producer: String,
        packages: Vec<String>,
        entry: Option<PackEntry>,
        applied: Vec<String>,
    },
    RemoveExcludedPackages {
        producer: String,
        packages: Vec<String>,
        entry: Option<PackEntry>,
        applied: Vec<String>,
    },
    DefineConfig {
        config: ConfigModel,
        applied: bool,
    },
    ResetConfig {
        id: ConfigId,
        prior: Option<Vec<ConfigModel>>,
    },
    IncludeLayers {
        id: ConfigId,
        layers: Vec<String>,
        created_config: bool,
        applied: Vec<LayerUndo>,
    },
    ExcludeLayers {
        id: ConfigId,
        layers: Vec<String>,
        created_config: bool,
        applied: Vec<LayerUndo>,
    },
    RemoveIncludedLayer {
        id: ConfigId,
        layer: String,
        applied: bool,
    },
    RemoveExcludedLayer {
        id: ConfigId,
        layer: String,
        applied: bool,
    },
    AddFeature {
        id: ConfigId,
        feature: FeatureConfig,
        created_config: bool,
        undo: Option<AddFeatureUndo>,
    },
    RemoveFeature {
        id: ConfigId,
        feature: FeatureConfig,
        created_config: bool,
        undo: Option<RemoveFeatureUndo>,
    },
    AddUniverse {
        name: String,
        spec: String,
        prior: Option<String>,
        applied: bool,
    },
    RemoveUniverse {
        name: String,
        removed: Option<String>,
    },
}

/// The feature-pack entry for `producer`, creating a transitive entry when
/// the producer is only reachable through the resolved runtime.
fn entry_mut<'b>(
    builder: &'b mut ProvisioningConfigBuilder,
    runtime: &ProvisioningRuntime,
    producer: &str,
    create: bool,
) -> Result<(&'b mut FeaturePackConfig, PackEntry)> {
    if builder.has_feature_pack(producer) {
        return Ok((builder.feature_pack_mut(producer)?, PackEntry::Direct));
    }
    if builder.has_transitive(producer) {
        return Ok((builder.transitive_mut(producer)?, PackEntry::Transitive));
    }
    if !create {
        return Err(Error::FeaturePackNotAdded(producer.to_string()));
    }
    let rt = runtime
        .feature_pack(producer)
        .ok_or_else(|| Error::UnknownProducer(producer.to_string()))?;
    builder.add_transitive(FeaturePackConfig::transitive(rt.location().clone()))?;
    Ok((
        builder.transitive_mut(producer)?,
        PackEntry::CreatedTransitive,
    ))
}

fn existing_mut<'b>(
    builder: &'b mut ProvisioningConfigBuilder,
    producer: &str,
) -> Result<&'b mut FeaturePackConfig> {
    if builder.has_feature_pack(producer) {
        builder.feature_pack_mut(producer)
    } else {
        builder.transitive_mut(producer)
    }
}

fn has_entry(builder: &ProvisioningConfigBuilder, producer: &str) -> bool {
    builder.has_feature_pack(producer) || builder.has_transitive(producer)
}

/// The defined config for `id`, creating an empty local definition (and
/// flagging it for undo) when only an inherited config exists.
fn config_entry<'b>(
    builder: &'b mut ProvisioningConfigBuilder,
    id: &ConfigId,
    created: &mut bool,
) -> Result<&'b mut ConfigModel> {
    if !builder.has_config(id) {
        builder.add_config(ConfigModel::new(id.clone()))?;
        *created = true;
    }
    builder.config_mut(id)
}

/// After a removal on a transitive entry, collapse it if it carries nothing
/// anymore and upgrade the undo record accordingly.
fn collapse_after_removal(
    builder: &mut ProvisioningConfigBuilder,
    producer: &str,
    kind: PackEntry,
) -> PackEntry {
    if matches!(kind, PackEntry::Transitive) {
        if let Some(config) = builder.collapse_empty_transitive(producer) {
            return PackEntry::CollapsedTransitive(config);
        }
    }
    kind
}

impl Action {
    /// Short operation name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddFeaturePack { .. } => "add-feature-pack",
            Action::RemoveFeaturePacks { .. } => "remove-feature-packs",
            Action::IncludeDefaultConfig { .. } => "include-default-config",
            Action::ExcludeDefaultConfig { .. } => "exclude-default-config",
            Action::RemoveIncludedConfig { .. } => "remove-included-config",
            Action::RemoveExcludedConfig { .. } => "remove-excluded-config",
            Action::IncludePackages { .. } => "include-packages",
            Action::ExcludePackages { .. } => "exclude-packages",
            Action::RemoveIncludedPackages { .. } => "remove-included-packages",
            Action::RemoveExcludedPackages { .. } => "remove-excluded-packages",
            Action::DefineConfig { .. } => "define-config",
            Action::ResetConfig { .. } => "reset-config",
            Action::IncludeLayers { .. } => "include-layers",
            Action::ExcludeLayers { .. } => "exclude-layers",
            Action::RemoveIncludedLayer { .. } => "remove-included-layer",
            Action::RemoveExcludedLayer { .. } => "remove-excluded-layer",
            Action::AddFeature { .. } => "add-feature",
            Action::RemoveFeature { .. } => "remove-feature",
            Action::AddUniverse { .. } => "add-universe",
            Action::RemoveUniverse { .. } => "remove-universe",
        }
    }

    pub(crate) fn apply(&mut self, ctx: &mut EditContext<'_>) -> Result<()> {
        match self {
            Action::AddFeaturePack {
                config,
                displaced_transitive,
                applied,
            } => {
                *displaced_transitive = None;
                *applied = false;
                if ctx.builder.has_transitive(config.producer()) {
                    *displaced_transitive =
                        Some(ctx.builder.remove_transitive(config.producer())?);
                }
                if let Err(e) = ctx.builder.add_feature_pack(config.clone()) {
                    if let Some(displaced) = displaced_transitive.take() {
                        ctx.builder.add_transitive(displaced)?;
                    }
                    return Err(e);
                }
                *applied = true;
                Ok(())
            }

            Action::RemoveFeaturePacks { producers, removed } => {
                removed.clear();
                for producer in producers.iter() {
                    if ctx.builder.has_feature_pack(producer) {
                        let (index, config) = ctx.builder.remove_feature_pack(producer)?;
                        removed.push((producer.clone(), PackRemoval::Direct { index, config }));
                    } else {
                        let config = ctx
                            .builder
                            .remove_transitive(producer)
                            .map_err(|_| Error::FeaturePackNotAdded(producer.clone()))?;
                        removed.push((producer.clone(), PackRemoval::Transitive { config }));
                    }
                }
                Ok(())
            }

            Action::IncludeDefaultConfig {
                id,
                producers,
                applied,
            } => {
                applied.clear();
                for producer in producers.iter() {
                    let (entry, kind) = entry_mut(ctx.builder, ctx.runtime, producer, true)?;
                    if entry.is_config_included(id) {
                        continue;
                    }
                    entry.include_config(id.clone())?;
                    applied.push((producer.clone(), kind));
                }
                Ok(())
            }

            Action::ExcludeDefaultConfig {
                id,
                producers,
                applied,
            } => {
                applied.clear();
                for producer in producers.iter() {
                    let (entry, kind) = entry_mut(ctx.builder, ctx.runtime, producer, true)?;
                    if entry.is_config_excluded(id) {
                        continue;
                    }
                    entry.exclude_config(id.clone())?;
                    applied.push((producer.clone(), kind));
                }
                Ok(())
            }

            Action::RemoveIncludedConfig {
                id,
                producers,
                applied,
            } => {
                applied.clear();
                for producer in producers.iter() {
                    if !has_entry(ctx.builder, producer) {
                        continue;
                    }
                    let (entry, kind) = entry_mut(ctx.builder, ctx.runtime, producer, false)?;
                    if !entry.is_config_included(id) {
                        continue;
                    }
                    let index = entry.remove_included_config(id)?;
                    let kind = collapse_after_removal(ctx.builder, producer, kind);
                    applied.push((producer.clone(), index, kind));
                }
                Ok(())
            }

            Action::RemoveExcludedConfig {
                id,
                producers,
                applied,
            } => {
                applied.clear();
                for producer in producers.iter() {
                    if !has_entry(ctx.builder, producer) {
                        continue;
                    }
                    let (entry, kind) = entry_mut(ctx.builder, ctx.runtime, producer, false)?;
                    if !entry.is_config_excluded(id) {
                        continue;
                    }
                    entry.remove_excluded_config(id)?;
                    let kind = collapse_after_removal(ctx.builder, producer, kind);
                    applied.push((producer.clone(), kind));
                }
                Ok(())
            }

            Action::IncludePackages {
                producer,
                packages,
                entry,
                applied,
            } => {
                *entry = None;
                applied.clear();
                let (fp, kind) = entry_mut(ctx.builder, ctx.runtime, producer, true)?;
                let created = matches!(kind, PackEntry::CreatedTransitive);
                *entry = Some(kind);
                for package in packages.iter() {
                    if fp.included_packages.contains(package) {
                        continue;
                    }
                    fp.include_package(package)?;
                    applied.push(package.clone());
                }
                if created && applied.is_empty() {
                    ctx.builder.remove_transitive(producer)?;
                    *entry = None;
                }
                Ok(())
            }

            Action::ExcludePackages {
                producer,
                packages,
                entry,
                applied,
            } => {
                *entry = None;
                applied.clear();
                let (fp, kind) = entry_mut(ctx.builder, ctx.runtime, producer, true)?;
                let created = matches!(kind, PackEntry::CreatedTransitive);
                *entry = Some(kind);
                for package in packages.iter() {
                    if fp.excluded_packages.contains(package) {
                        continue;
                    }
                    fp.exclude_package(package)?;
                    applied.push(package.clone());
                }
                if created && applied.is_empty() {
                    ctx.builder.remove_transitive(producer)?;
                    *entry = None;
                }
                Ok(())
            }

            Action::RemoveIncludedPackages {
                producer,
                packages,
                entry,
                applied,
            } => {
                *entry = None;
                applied.clear();
                if !has_entry(ctx.builder, producer) {
                    return Ok(());
                }
                let (fp, kind) = entry_mut(ctx.builder, ctx.runtime, producer, false)?;
                for package in packages.iter() {
                    if !fp.included_packages.contains(package) {
                        continue;
                    }
                    fp.remove_included_package(package)?;
                    applied.push(package.clone());
                }
                if !applied.is_empty() {
                    *entry = Some(collapse_after_removal(ctx.builder, producer, kind));
                }
                Ok(())
            }

            Action::RemoveExcludedPackages {
                producer,
                packages,
                entry,
                applied,
            } => {
                *entry = None;
                applied.clear();
                if !has_entry(ctx.builder, producer) {
                    return Ok(());
                }
                let (fp, kind) = entry_mut(ctx.builder, ctx.runtime, producer, false)?;
                for package in packages.iter() {
                    if !fp.excluded_packages.contains(package) {
                        continue;
                    }
                    fp.remove_excluded_package(package)?;
                    applied.push(package.clone());
                }
                if !applied.is_empty() {
                    *entry = Some(collapse_after_removal(ctx.builder, producer, kind));
                }
                Ok(())
            }

            Action::DefineConfig { config, applied } => {
                *applied = false;
                ctx.builder.add_config(config.clone())?;
                *applied = true;
                Ok(())
            }

            Action::ResetConfig { id, prior } => {
                *prior = None;
                let snapshot = ctx.builder.defined_configs().to_vec();
                ctx.builder.remove_config(id)?;
                *prior = Some(snapshot);
                Ok(())
            }

            Action::IncludeLayers {
                id,
                layers,
                created_config,
                applied,
            } => {
                *created_config = false;
                applied.clear();
                for layer in layers.iter() {
                    if !ctx.container.has_layer(&id.model, layer) {
                        return Err(Error::UnknownLayer {
                            model: id.model.clone(),
                            name: layer.clone(),
                        });
                    }
                }
                let model = config_entry(ctx.builder, id, created_config)?;
                for layer in layers.iter() {
                    if model.included_layers.contains(layer) {
                        continue;
                    }
                    let opposite_was_set = model.excluded_layers.contains(layer);
                    model.include_layer(layer)?;
                    applied.push(LayerUndo {
                        layer: layer.clone(),
                        opposite_was_set,
                    });
                }
                if *created_config && applied.is_empty() {
                    ctx.builder.remove_config(id)?;
                    *created_config = false;
                }
                Ok(())
            }

            Action::ExcludeLayers {
                id,
                layers,
                created_config,
                applied,
            } => {
                *created_config = false;
                applied.clear();
                // A layer can only be excluded if the resolved config
                // currently carries it.
                let resolved = ctx.container.config(id);
                for layer in layers.iter() {
                    let present =
                        resolved.is_some_and(|c| c.layers.iter().any(|l| l == layer));
                    if !present {
                        return Err(Error::LayerNotIncluded(layer.clone()));
                    }
                }
                let model = config_entry(ctx.builder, id, created_config)?;
                for layer in layers.iter() {
                    if model.excluded_layers.contains(layer) {
                        continue;
                    }
                    let opposite_was_set = model.included_layers.contains(layer);
                    model.exclude_layer(layer)?;
                    applied.push(LayerUndo {
                        layer: layer.clone(),
                        opposite_was_set,
                    });
                }
                if *created_config && applied.is_empty() {
                    ctx.builder.remove_config(id)?;
                    *created_config = false;
                }
                Ok(())
            }

            Action::RemoveIncludedLayer { id, layer, applied } => {
                *applied = false;
                ctx.builder.config_mut(id)?.remove_included_layer(layer)?;
                *applied = true;
                Ok(())
            }

            Action::RemoveExcludedLayer { id, layer, applied } => {
                *applied = false;
                ctx.builder.config_mut(id)?.remove_excluded_layer(layer)?;
                *applied = true;
                Ok(())
            }

            Action::AddFeature {
                id,
                feature,
                created_config,
                undo,
            } => {
                *created_config = false;
                *undo = None;
                let spec_info = ctx
                    .container
                    .find_feature_spec(&feature.spec)
                    .ok_or_else(|| Error::UnknownFeatureSpec(feature.spec.clone()))?;
                let spec = Arc::clone(&spec_info.spec);
                let fid = spec.resolve_id(feature)?;

                let model = config_entry(ctx.builder, id, created_config)?;
                if model.excluded_features.remove(&fid) {
                    *undo = Some(AddFeatureUndo::Unexcluded { id: fid });
                    return Ok(());
                }
                let mut replace = None;
                for (index, existing) in model.features.iter().enumerate() {
                    if existing.spec == feature.spec && spec.resolve_id(existing)? == fid {
                        replace = Some(index);
                        break;
                    }
                }
                match replace {
                    Some(index) => {
                        let old = std::mem::replace(&mut model.features[index], feature.clone());
                        *undo = Some(AddFeatureUndo::Replaced {
                            index,
                            feature: old,
                        });
                    }
                    None => {
                        model.features.push(feature.clone());
                        *undo = Some(AddFeatureUndo::Added {
                            index: model.features.len() - 1,
                        });
                    }
                }
                Ok(())
            }

            Action::RemoveFeature {
                id,
                feature,
                created_config,
                undo,
            } => {
                *created_config = false;
                *undo = None;
                let spec_info = ctx
                    .container
                    .find_feature_spec(&feature.spec)
                    .ok_or_else(|| Error::UnknownFeatureSpec(feature.spec.clone()))?;
                let spec = Arc::clone(&spec_info.spec);
                let fid = spec.resolve_id(feature)?;

                if ctx.builder.has_config(id) {
                    let model = ctx.builder.config_mut(id)?;
                    let mut found = None;
                    for (index, existing) in model.features.iter().enumerate() {
                        if existing.spec == feature.spec && spec.resolve_id(existing)? == fid {
                            found = Some(index);
                            break;
                        }
                    }
                    if let Some(index) = found {
                        let removed = model.features.remove(index);
                        *undo = Some(RemoveFeatureUndo::RemovedLocal {
                            index,
                            feature: removed,
                        });
                        return Ok(());
                    }
                }

                // Not locally defined: exclude it if the resolved config
                // inherits it, otherwise there is nothing to remove.
                let inherited = ctx
                    .container
                    .config(id)
                    .is_some_and(|c| c.features.contains(&fid));
                if !inherited {
                    return Err(Error::FeatureNotFound(fid.to_string()));
                }
                let model = config_entry(ctx.builder, id, created_config)?;
                model.excluded_features.insert(fid.clone());
                *undo = Some(RemoveFeatureUndo::Excluded { id: fid });
                Ok(())
            }

            Action::AddUniverse {
                name,
                spec,
                prior,
                applied,
            } => {
                *applied = false;
                *prior = ctx.builder.add_universe(name, spec)?;
                *applied = true;
                Ok(())
            }

            Action::RemoveUniverse { name, removed } => {
                *removed = None;
                *removed = Some(ctx.builder.remove_universe(name)?);
                Ok(())
            }
        }
    }

    pub(crate) fn revert(&self, builder: &mut ProvisioningConfigBuilder) -> Result<()> {
        match self {
            Action::AddFeaturePack {
                config,
                displaced_transitive,
                applied,
            } => {
                if !applied {
                    return Ok(());
                }
                builder.remove_feature_pack(config.producer())?;
                if let Some(displaced) = displaced_transitive {
                    builder.add_transitive(displaced.clone())?;
                }
                Ok(())
            }

            Action::RemoveFeaturePacks { removed, .. } => {
                for (_, removal) in removed.iter().rev() {
                    match removal {
                        PackRemoval::Direct { index, config } => {
                            builder.insert_feature_pack(*index, config.clone())?;
                        }
                        PackRemoval::Transitive { config } => {
                            builder.add_transitive(config.clone())?;
                        }
                    }
                }
                Ok(())
            }

            Action::IncludeDefaultConfig { id, applied, .. } => {
                for (producer, kind) in applied.iter().rev() {
                    match kind {
                        PackEntry::CreatedTransitive => {
                            builder.remove_transitive(producer)?;
                        }
                        _ => {
                            existing_mut(builder, producer)?.remove_included_config(id)?;
                        }
                    }
                }
                Ok(())
            }

            Action::ExcludeDefaultConfig { id, applied, .. } => {
                for (producer, kind) in applied.iter().rev() {
                    match kind {
                        PackEntry::CreatedTransitive => {
                            builder.remove_transitive(producer)?;
                        }
                        _ => {
                            existing_mut(builder, producer)?.remove_excluded_config(id)?;
                        }
                    }
                }
                Ok(())
            }

            Action::RemoveIncludedConfig { id, applied, .. } => {
                for (producer, index, kind) in applied.iter().rev() {
                    match kind {
                        PackEntry::CollapsedTransitive(config) => {
                            let mut config = config.clone();
                            config.insert_included_config(*index, id.clone());
                            builder.add_transitive(config)?;
                        }
                        _ => {
                            existing_mut(builder, producer)?
                                .insert_included_config(*index, id.clone());
                        }
                    }
                }
                Ok(())
            }

            Action::RemoveExcludedConfig { id, applied, .. } => {
                for (producer, kind) in applied.iter().rev() {
                    match kind {
                        PackEntry::CollapsedTransitive(config) => {
                            let mut config = config.clone();
                            config.exclude_config(id.clone())?;
                            builder.add_transitive(config)?;
                        }
                        _ => {
                            existing_mut(builder, producer)?.exclude_config(id.clone())?;
                        }
                    }
                }
                Ok(())
            }

            Action::IncludePackages {
                producer,
                entry,
                applied,
                ..
            } => match entry {
                None => Ok(()),
                Some(PackEntry::CreatedTransitive) => {
                    builder.remove_transitive(producer).map(drop)
                }
                Some(_) => {
                    let fp = existing_mut(builder, producer)?;
                    for package in applied.iter().rev() {
                        fp.remove_included_package(package)?;
                    }
                    Ok(())
                }
            },

            Action::ExcludePackages {
                producer,
                entry,
                applied,
                ..
            } => match entry {
                None => Ok(()),
                Some(PackEntry::CreatedTransitive) => {
                    builder.remove_transitive(producer).map(drop)
                }
                Some(_) => {
                    let fp = existing_mut(builder, producer)?;
                    for package in applied.iter().rev() {
                        fp.remove_excluded_package(package)?;
                    }
                    Ok(())
                }
            },

            Action::RemoveIncludedPackages {
                producer,
                entry,
                applied,
                ..
            } => match entry {
                None => Ok(()),
                Some(PackEntry::CollapsedTransitive(config)) => {
                    let mut config = config.clone();
                    for package in applied.iter() {
                        config.include_package(package)?;
                    }
                    builder.add_transitive(config)
                }
                Some(_) => {
                    let fp = existing_mut(builder, producer)?;
                    for package in applied.iter().rev() {
                        fp.include_package(package)?;
                    }
                    Ok(())
                }
            },

            Action::RemoveExcludedPackages {
                producer,
                entry,
                applied,
                ..
            } => match entry {
                None => Ok(()),
                Some(PackEntry::CollapsedTransitive(config)) => {
                    let mut config = config.clone();
                    for package in applied.iter() {
                        config.exclude_package(package)?;
                    }
                    builder.add_transitive(config)
                }
                Some(_) => {
                    let fp = existing_mut(builder, producer)?;
                    for package in applied.iter().rev() {
                        fp.exclude_package(package)?;
                    }
                    Ok(())
                }
            },

            Action::DefineConfig { config, applied } => {
                if !applied {
                    return Ok(());
                }
                builder.remove_config(&config.id).map(drop)
            }

            Action::ResetConfig { prior, .. } => {
                if let Some(configs) = prior {
                    builder.set_defined_configs(configs.clone());
                }
                Ok(())
            }

            Action::IncludeLayers {
                id,
                created_config,
                applied,
                ..
            } => {
                if *created_config {
                    return builder.remove_config(id).map(drop);
                }
                if applied.is_empty() {
                    return Ok(());
                }
                let model = builder.config_mut(id)?;
                for undo in applied.iter().rev() {
                    model.remove_included_layer(&undo.layer)?;
                    if undo.opposite_was_set {
                        model.exclude_layer(&undo.layer)?;
                    }
                }
                Ok(())
            }

            Action::ExcludeLayers {
                id,
                created_config,
                applied,
                ..
            } => {
                if *created_config {
                    return builder.remove_config(id).map(drop);
                }
                if applied.is_empty() {
                    return Ok(());
                }
                let model = builder.config_mut(id)?;
                for undo in applied.iter().rev() {
                    model.remove_excluded_layer(&undo.layer)?;
                    if undo.opposite_was_set {
                        model.include_layer(&undo.layer)?;
                    }
                }
                Ok(())
            }

            Action::RemoveIncludedLayer { id, layer, applied } => {
                if !applied {
                    return Ok(());
                }
                builder.config_mut(id)?.include_layer(layer)
            }

            Action::RemoveExcludedLayer { id, layer, applied } => {
                if !applied {
                    return Ok(());
                }
                builder.config_mut(id)?.exclude_layer(layer)
            }

            Action::AddFeature {
                id,
                created_config,
                undo,
                ..
            } => {
                if *created_config {
                    return builder.remove_config(id).map(drop);
                }
                let Some(undo) = undo else {
                    return Ok(());
                };
                let model = builder.config_mut(id)?;
                match undo {
                    AddFeatureUndo::Added { index } => {
                        model.features.remove(*index);
                    }
                    AddFeatureUndo::Replaced { index, feature } => {
                        model.features[*index] = feature.clone();
                    }
                    AddFeatureUndo::Unexcluded { id } => {
                        model.excluded_features.insert(id.clone());
                    }
                }
                Ok(())
            }

            Action::RemoveFeature {
                id,
                created_config,
                undo,
                ..
            } => {
                if *created_config {
                    return builder.remove_config(id).map(drop);
                }
                let Some(undo) = undo else {
                    return Ok(());
                };
                let model = builder.config_mut(id)?;
                match undo {
                    RemoveFeatureUndo::RemovedLocal { index, feature } => {
                        let index = (*index).min(model.features.len());
                        model.features.insert(index, feature.clone());
                    }
                    RemoveFeatureUndo::Excluded { id } => {
                        model.excluded_features.remove(id);
                    }
                }
                Ok(())
            }

            Action::AddUniverse {
                name,
                prior,
                applied,
                ..
            } => {
                if !applied {
                    return Ok(());
                }
                match prior {
                    Some(old) => builder.restore_universe(name, old.clone()),
                    None => {
                        builder.remove_universe(name)?;
                    }
                }
                Ok(())
            }

            Action::RemoveUniverse { name, removed } => {
                if let Some(spec) = removed {
                    builder.restore_universe(name, spec.clone());
                }
                Ok(())
            }
        }
    }
}
