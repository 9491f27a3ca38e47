// tests/common/mod.rs

//! Shared fixture repository for the integration tests.
//!
//! Two feature-packs:
//!
//! - `base` ships `core-lib`, `docs-base`, and `tools`, a logging feature
//!   spec, and a `logging` layer.
//! - `core` depends on `base` (origin "base") and ships the server stack,
//!   web feature specs, a `web` layer (plus a `full` layer pulling it in),
//!   and a default `standalone/main` config.

use provis::config::{ConfigId, ConfigModel, FeatureConfig, FeaturePackLocation};
use provis::repository::FeaturePackRepository;
use provis::runtime::RepositoryResolver;
use provis::spec::{
    FeaturePackDepSpec, FeaturePackSpec, FeatureParamSpec, FeatureSpec, LayerSpec,
    PackageDependencySpec, PackageSpec,
};
use provis::state::State;
use semver::Version;

pub fn base_location() -> FeaturePackLocation {
    FeaturePackLocation::new("base", Version::new(1, 0, 0))
}

pub fn core_location() -> FeaturePackLocation {
    FeaturePackLocation::new("core", Version::new(1, 0, 0))
}

pub fn main_config() -> ConfigId {
    ConfigId::new("standalone", "main")
}

fn base_pack() -> FeaturePackSpec {
    let mut pack = FeaturePackSpec::new(base_location());
    pack.packages.insert(
        "core-lib".to_string(),
        PackageSpec::new("core-lib").with_content("lib/core.jar"),
    );
    pack.packages.insert(
        "docs-base".to_string(),
        PackageSpec::new("docs-base").with_content("docs/base.html"),
    );
    pack.packages.insert(
        "tools".to_string(),
        PackageSpec::new("tools").with_dep(PackageDependencySpec::local("core-lib")),
    );
    pack.default_packages.insert("core-lib".to_string());

    pack.feature_specs.insert(
        "subsystem.logging.logger".to_string(),
        FeatureSpec::new("subsystem.logging.logger")
            .with_param(FeatureParamSpec::id("name"))
            .with_param(FeatureParamSpec::plain("level").with_default("INFO"))
            .with_package(PackageDependencySpec::local("core-lib")),
    );

    pack.layers.push(LayerSpec {
        name: "logging".to_string(),
        model: "standalone".to_string(),
        features: vec![FeatureConfig::new("subsystem.logging.logger").with_param("name", "CONSOLE")],
        deps: Vec::new(),
    });
    pack
}

fn core_pack() -> FeaturePackSpec {
    let mut pack = FeaturePackSpec::new(core_location());
    pack.deps.push(FeaturePackDepSpec {
        location: base_location(),
        origin: Some("base".to_string()),
    });

    pack.packages.insert(
        "server".to_string(),
        PackageSpec::new("server")
            .with_dep(PackageDependencySpec::local("launcher"))
            .with_dep(PackageDependencySpec::external("base", "core-lib"))
            .with_content("bin/server"),
    );
    pack.packages.insert(
        "launcher".to_string(),
        PackageSpec::new("launcher").with_content("bin/launcher"),
    );
    pack.packages.insert(
        "web".to_string(),
        PackageSpec::new("web").with_dep(PackageDependencySpec::local("server")),
    );
    pack.packages.insert(
        "monitor".to_string(),
        PackageSpec::new("monitor").with_dep(PackageDependencySpec::local("launcher")),
    );
    pack.packages
        .insert("docs".to_string(), PackageSpec::new("docs"));
    pack.default_packages.insert("server".to_string());

    pack.feature_specs.insert(
        "subsystem.web.connector".to_string(),
        FeatureSpec::new("subsystem.web.connector")
            .with_param(FeatureParamSpec::id("name"))
            .with_param(FeatureParamSpec::plain("port").with_default("8080"))
            .with_package(PackageDependencySpec::local("server")),
    );
    pack.feature_specs.insert(
        "subsystem.datasource".to_string(),
        FeatureSpec::new("subsystem.datasource")
            .with_param(FeatureParamSpec::id("pool").with_default("main")),
    );

    pack.layers.push(LayerSpec {
        name: "web".to_string(),
        model: "standalone".to_string(),
        features: vec![FeatureConfig::new("subsystem.web.connector").with_param("name", "HTTP")],
        deps: Vec::new(),
    });
    pack.layers.push(LayerSpec {
        name: "full".to_string(),
        model: "standalone".to_string(),
        features: Vec::new(),
        deps: vec!["web".to_string()],
    });

    let mut main = ConfigModel::new(main_config());
    main.included_layers.insert("web".to_string());
    main.features
        .push(FeatureConfig::new("subsystem.datasource"));
    pack.configs.push(main);
    pack
}

pub fn repository() -> FeaturePackRepository {
    let mut repo = FeaturePackRepository::new();
    repo.add(base_pack());
    repo.add(core_pack());
    repo
}

pub fn resolver() -> RepositoryResolver {
    RepositoryResolver::new(repository())
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// An empty editing session over the fixture repository.
pub fn session() -> State<RepositoryResolver> {
    init_logging();
    State::new(resolver()).unwrap()
}
