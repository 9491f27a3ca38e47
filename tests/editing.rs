// tests/editing.rs

//! Transactional editing: push/pop inverses, rollback atomicity, and the
//! guarded edit operations.

mod common;

use common::{core_location, main_config, session};
use provis::config::{ConfigModel, FeatureConfig, FeaturePackConfig};
use provis::state::{config, feature_pack};
use provis::{ConfigId, Error};

#[test]
fn test_new_session_is_empty() {
    let state = session();
    assert!(!state.has_actions());
    assert!(state.config().is_empty());
    assert!(state.container().configs().is_empty());
}

#[test]
fn test_push_pop_restores_initial_config() {
    let mut state = session();
    let before = state.config().clone();

    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();
    state
        .push(feature_pack::include_packages("core", ["web".to_string()]))
        .unwrap();

    let core = state.runtime().feature_pack("core").unwrap();
    assert!(core.has_package("web"));
    assert!(core.has_package("server"));
    assert!(core.has_package("launcher"));
    assert!(state.runtime().feature_pack("base").unwrap().has_package("core-lib"));

    assert!(state.pop().unwrap());
    assert!(state.pop().unwrap());
    assert_eq!(state.config(), &before);
    assert!(!state.has_actions());
}

#[test]
fn test_duplicate_config_definition_keeps_stack_depth() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();
    let id = ConfigId::new("standalone", "custom");
    state.push(config::define(ConfigModel::new(id.clone()))).unwrap();
    assert_eq!(state.action_count(), 2);

    let err = state
        .push(config::define(ConfigModel::new(id)))
        .unwrap_err();
    assert!(matches!(err, Error::ConfigAlreadyDefined(_)));
    assert_eq!(state.action_count(), 2);
}

#[test]
fn test_exclude_layer_not_included_is_rejected() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    // The logging layer exists but is not part of main's resolved layers.
    let err = state
        .push(config::exclude_layers(
            main_config(),
            ["logging".to_string()],
        ))
        .unwrap_err();
    assert!(matches!(err, Error::LayerNotIncluded(_)));

    let main = state.container().config(&main_config()).unwrap();
    assert_eq!(main.layers, ["web"]);
    assert!(state.config().defined_config(&main_config()).is_none());
}

#[test]
fn test_failed_edit_drops_created_transitive() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();
    let before = state.config().clone();

    // core's server requires base's core-lib; excluding it breaks the
    // package closure, so the whole edit (including the transitive entry it
    // created for base) must vanish.
    let err = state
        .push(feature_pack::exclude_packages(
            "base",
            ["core-lib".to_string()],
        ))
        .unwrap_err();
    assert!(matches!(err, Error::UnresolvedPackageDependency { .. }));
    assert_eq!(state.config(), &before);
    assert!(state.config().transitives().is_empty());
}

#[test]
fn test_transitive_customization_collapses_when_emptied() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    state
        .push(feature_pack::exclude_packages(
            "base",
            ["docs-base".to_string()],
        ))
        .unwrap();
    let transitive = state.config().transitive("base").unwrap();
    assert!(transitive.excluded_packages.contains("docs-base"));

    state
        .push(feature_pack::remove_excluded_packages(
            "base",
            ["docs-base".to_string()],
        ))
        .unwrap();
    assert!(state.config().transitives().is_empty());

    state.pop().unwrap();
    assert!(
        state
            .config()
            .transitive("base")
            .unwrap()
            .excluded_packages
            .contains("docs-base")
    );
    state.pop().unwrap();
    assert!(state.config().transitives().is_empty());
}

#[test]
fn test_remove_feature_pack_restores_order_on_undo() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(common::base_location())))
        .unwrap();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    state
        .push(feature_pack::remove(["base".to_string()]))
        .unwrap();
    let order: Vec<&str> = state
        .config()
        .feature_packs()
        .iter()
        .map(|fp| fp.producer())
        .collect();
    assert_eq!(order, ["core"]);

    state.pop().unwrap();
    let order: Vec<&str> = state
        .config()
        .feature_packs()
        .iter()
        .map(|fp| fp.producer())
        .collect();
    assert_eq!(order, ["base", "core"]);
}

#[test]
fn test_include_layer_pulls_layer_features() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    state
        .push(config::include_layers(
            main_config(),
            ["logging".to_string()],
        ))
        .unwrap();
    let main = state.container().config(&main_config()).unwrap();
    assert!(main.layers.contains(&"logging".to_string()));
    assert!(main.layers.contains(&"web".to_string()));
    assert!(
        main.features
            .iter()
            .any(|f| f.spec == "subsystem.logging.logger"
                && f.params.get("name").map(String::as_str) == Some("CONSOLE"))
    );

    state.pop().unwrap();
    let main = state.container().config(&main_config()).unwrap();
    assert_eq!(main.layers, ["web"]);
}

#[test]
fn test_add_feature_replaces_equal_identity() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    let resolved_port = |state: &provis::State<_>| {
        state
            .runtime()
            .configs()
            .iter()
            .find(|c| c.id == main_config())
            .and_then(|c| {
                c.features()
                    .find(|f| f.spec == "subsystem.web.connector")
                    .and_then(|f| f.params.get("port").cloned())
            })
    };
    assert_eq!(resolved_port(&state).as_deref(), Some("8080"));

    // Same identity (name=HTTP) as the layer-provided connector: replaced
    // in place rather than duplicated.
    state
        .push(config::add_feature(
            main_config(),
            FeatureConfig::new("subsystem.web.connector")
                .with_param("name", "HTTP")
                .with_param("port", "9090"),
        ))
        .unwrap();
    assert_eq!(resolved_port(&state).as_deref(), Some("9090"));
    let main = state.runtime().configs().iter().find(|c| c.id == main_config()).unwrap();
    assert_eq!(
        main.features()
            .filter(|f| f.spec == "subsystem.web.connector")
            .count(),
        1
    );

    state.pop().unwrap();
    assert_eq!(resolved_port(&state).as_deref(), Some("8080"));
}

#[test]
fn test_remove_inherited_feature_records_exclusion() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    let has_datasource = |state: &provis::State<_>| {
        state
            .container()
            .config(&main_config())
            .is_some_and(|c| c.features.iter().any(|f| f.spec == "subsystem.datasource"))
    };
    assert!(has_datasource(&state));

    state
        .push(config::remove_feature(
            main_config(),
            FeatureConfig::new("subsystem.datasource"),
        ))
        .unwrap();
    assert!(!has_datasource(&state));
    let local = state.config().defined_config(&main_config()).unwrap();
    assert_eq!(local.excluded_features.len(), 1);

    state.pop().unwrap();
    assert!(has_datasource(&state));
    assert!(state.config().defined_config(&main_config()).is_none());
}

#[test]
fn test_remove_unknown_feature_is_rejected() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    let err = state
        .push(config::remove_feature(
            main_config(),
            FeatureConfig::new("subsystem.logging.logger").with_param("name", "GHOST"),
        ))
        .unwrap_err();
    assert!(matches!(err, Error::FeatureNotFound(_)));
    assert!(state.config().defined_config(&main_config()).is_none());
}

#[test]
fn test_exclude_default_config_removes_resolved_config() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();
    assert!(state.container().config(&main_config()).is_some());

    state
        .push(feature_pack::exclude_default_config(
            main_config(),
            ["core".to_string()],
        ))
        .unwrap();
    assert!(state.container().config(&main_config()).is_none());

    state.pop().unwrap();
    assert!(state.container().config(&main_config()).is_some());
}
