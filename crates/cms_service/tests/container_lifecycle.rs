use std::time::Duration;

use cms_core::{CacheConfig, Config, CrudConfig, DbBackend, DbConfig, LogConfig, PoolConfig};
use cms_plugin::{PluginCapabilities, PluginManifest, PluginVersion};
use cms_service::{ContainerPhase, ServiceContainer};

fn sqlite_config(file: &str) -> Config {
    Config {
        db: DbConfig {
            backend: DbBackend::Sqlite,
            host: None,
            port: None,
            user: None,
            password: None,
            name: None,
            file: Some(file.to_string()),
            pool: PoolConfig::default(),
        },
        cache: CacheConfig { cleanup_interval_ms: 20, ..CacheConfig::default() },
        crud: CrudConfig::default(),
        log: LogConfig::default(),
    }
}

struct NoopPlugin;

impl cms_plugin::Plugin for NoopPlugin {
    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities::empty()
    }
    fn init(&mut self) -> Result<(), String> {
        Ok(())
    }
    fn start(&mut self) -> Result<(), String> {
        Ok(())
    }
    fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }
}

fn manifest(id: &str, bytes: &[u8]) -> PluginManifest {
    PluginManifest {
        id: id.to_string(),
        name: id.to_string(),
        version: PluginVersion { major: 1, minor: 0, patch: 0 },
        api_version: 1,
        checksum: PluginManifest::digest(bytes),
        required_permissions: PluginCapabilities::empty(),
    }
}

/// Every service the container builds during `init` (pool, cache, plugin
/// registry) must be reachable and fully released after `shutdown`.
#[test]
fn init_builds_every_service_and_shutdown_releases_them_all() {
    let path = cms_test_support::temp_sqlite_path();
    let container = ServiceContainer::new();
    container.init(sqlite_config(path.to_str().unwrap())).unwrap();
    assert_eq!(container.phase(), ContainerPhase::Running);

    container.with_pool(|pool| assert!(pool.stats().total_count <= 1)).unwrap();
    assert!(container.cache().is_ok());

    let bytes = b"noop-v1";
    container
        .with_plugin_registry(|registry| registry.register(manifest("noop", bytes), bytes, Box::new(NoopPlugin)))
        .unwrap()
        .unwrap();
    container.with_plugin_registry(|registry| registry.init("noop")).unwrap().unwrap();
    container.with_plugin_registry(|registry| registry.start("noop")).unwrap().unwrap();

    container.shutdown();
    assert_eq!(container.phase(), ContainerPhase::Complete);

    assert!(container.cache().is_err());
    assert!(container.with_pool(|_| ()).is_err());
    assert!(container.with_plugin_registry(|_| ()).is_err());
}

/// A container can be re-initialized after a full shutdown, and the whole
/// cycle can be repeated without leaking state between runs.
#[test]
fn shutdown_then_init_again_starts_from_a_clean_slate() {
    let path = cms_test_support::temp_sqlite_path();
    let container = ServiceContainer::new();

    for _ in 0..3 {
        container.init(sqlite_config(path.to_str().unwrap())).unwrap();
        assert_eq!(container.phase(), ContainerPhase::Running);
        container.shutdown();
        assert_eq!(container.phase(), ContainerPhase::Complete);
    }
}

/// `shutdown` before any `init` is a no-op, never panicking or reaching a
/// phase beyond `NotStarted`.
#[test]
fn shutdown_without_init_is_a_harmless_no_op() {
    let container = ServiceContainer::new();
    container.shutdown();
    assert_eq!(container.phase(), ContainerPhase::NotStarted);
}

#[test]
fn cache_survives_long_enough_to_be_flushed_before_the_pool_closes() {
    let path = cms_test_support::temp_sqlite_path();
    let container = ServiceContainer::new();
    container.init(sqlite_config(path.to_str().unwrap())).unwrap();

    // Exercise the cache while the pool is still open, then shut the whole
    // container down; if teardown order regressed (pool closing before the
    // cache's cleanup worker stops) this would be the first place a panic or
    // a stale background-thread access would surface.
    let cache = container.cache().unwrap();
    cache.set(b"k", b"v", Some(Duration::from_secs(5)));
    assert_eq!(cache.get(b"k").as_deref(), Some(b"v".as_slice()));

    container.shutdown();
    assert_eq!(container.phase(), ContainerPhase::Complete);
}
