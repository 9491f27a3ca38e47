// tests/graphs.rs

//! Container navigation: identity trees, provider attachment, and
//! per-config feature trees over a live session.

mod common;

use common::{core_location, main_config, session};
use provis::config::FeaturePackConfig;
use provis::graph::{GroupId, GroupTree, Identity};
use provis::state::feature_pack;

fn child(tree: &GroupTree, id: GroupId, key: &str) -> GroupId {
    tree.node(id)
        .children()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .unwrap_or_else(|| panic!("no child '{key}'"))
}

fn root(tree: &GroupTree, key: &str) -> GroupId {
    tree.roots()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .unwrap_or_else(|| panic!("no root '{key}'"))
}

#[test]
fn test_shared_dependency_is_one_group() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();
    state
        .push(feature_pack::include_packages(
            "core",
            ["monitor".to_string()],
        ))
        .unwrap();

    let tree = state.container().package_tree("core").unwrap();
    let server = root(tree, "server");
    let monitor = root(tree, "monitor");

    // server -> launcher and monitor -> launcher land on the same node.
    let from_server = child(tree, server, "launcher");
    let from_monitor = child(tree, monitor, "launcher");
    assert_eq!(from_server, from_monitor);

    // Cross-pack dependency appears under its qualified identity.
    let core_lib = child(tree, server, "base#core-lib");
    assert_eq!(
        tree.node(core_lib).identity(),
        &Identity::new("base", "core-lib")
    );
}

#[test]
fn test_providers_are_attached_through_dependencies() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    let container = state.container();

    // The logging spec requires base's core-lib directly.
    let core_lib = container.package("base", "core-lib").unwrap();
    assert!(
        core_lib
            .providers
            .contains(&Identity::new("base", "subsystem.logging.logger"))
    );

    // The connector spec requires core's server; the whole dependency
    // subtree of server is marked as provided by it.
    let connector = Identity::new("core", "subsystem.web.connector");
    for name in ["server", "launcher"] {
        let info = container.package("core", name).unwrap();
        assert!(info.providers.contains(&connector), "{name}");
    }
}

#[test]
fn test_provider_sets_merge_across_origin_trees() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    // base#core-lib appears twice: as the local node of base's own tree
    // (required by the logging spec) and inside core's server subtree
    // (reached by the connector spec). The flat view keeps both providers.
    let core_lib = state.container().package("base", "core-lib").unwrap();
    assert!(
        core_lib
            .providers
            .contains(&Identity::new("base", "subsystem.logging.logger"))
    );
    assert!(
        core_lib
            .providers
            .contains(&Identity::new("core", "subsystem.web.connector"))
    );
}

#[test]
fn test_spec_tree_follows_dotted_names() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    let tree = state.container().spec_tree("core").unwrap();
    let subsystem = root(tree, "subsystem");
    assert!(tree.node(subsystem).feature_spec().is_none());

    let connector = child(tree, child(tree, subsystem, "web"), "connector");
    let info = tree.node(connector).feature_spec().unwrap();
    assert_eq!(info.id.name, "subsystem.web.connector");
    assert!(info.enabled);

    let datasource = child(tree, subsystem, "datasource");
    assert!(tree.node(datasource).feature_spec().is_some());
}

#[test]
fn test_feature_tree_extends_path_with_id_values() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    let tree = state.container().feature_tree(&main_config()).unwrap();
    let subsystem = root(tree, "subsystem");
    let connector = child(tree, child(tree, subsystem, "web"), "connector");
    // The group for the spec path itself carries no feature; the instance
    // hangs below it, keyed by its id value.
    assert!(tree.node(connector).feature().is_none());

    let http = child(tree, connector, "HTTP");
    let info = tree.node(http).feature().unwrap();
    assert_eq!(info.params.get("port").map(String::as_str), Some("8080"));
    assert_eq!(info.config, main_config());

    let datasource = child(tree, subsystem, "datasource");
    let pool = child(tree, datasource, "main");
    assert!(tree.node(pool).feature().is_some());
}

#[test]
fn test_session_container_tracks_composition() {
    let mut state = session();
    assert!(state.container().package_trees().next().is_none());

    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();
    assert!(state.container().dependency("core").is_some());
    assert!(state.container().dependency("base").is_some());

    state
        .push(feature_pack::remove(["core".to_string()]))
        .unwrap();
    // base was only reachable through core: both are gone.
    assert!(state.container().dependency("core").is_none());
    assert!(state.container().dependency("base").is_none());
    assert!(state.container().package_trees().next().is_none());
}

#[test]
fn test_standalone_dependency_containers_are_scoped() {
    let mut state = session();
    state
        .push(feature_pack::add(FeaturePackConfig::new(core_location())))
        .unwrap();

    // The session view carries every spec; the standalone view of core only
    // carries enabled ones, with its own dependency on base.
    let session_view = state.container();
    assert!(session_view.includes_all_specs());

    let core_view = session_view.dependency("core").unwrap();
    assert!(!core_view.includes_all_specs());
    assert!(core_view.dependency("base").is_some());
    assert!(
        core_view
            .feature_spec("core", "subsystem.web.connector")
            .is_some()
    );
}
