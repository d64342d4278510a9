use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use cms_cache::{Cache, CleanupWorker};
use cms_core::{Config, DbBackend};
use cms_plugin::PluginRegistry;

use crate::any_pool::{build_mysql_pool, build_sqlite_pool, AnyPool};
use crate::error::ServiceError;
use crate::phase::{ContainerPhase, PhaseTracker};

/// Host API version negotiated with registered plugins.
const PLUGIN_API_VERSION: u32 = 1;

struct Inner {
    config: Config,
    pool: AnyPool,
    cache: Arc<Cache>,
    cleanup_worker: CleanupWorker,
    plugin_registry: PluginRegistry,
}

/// Constructs the engine's shared services exactly once, in dependency order
/// (logger, config, pool, cache, plugin registry), and tears them down in
/// reverse. A latch makes repeated [`ServiceContainer::init`] a silent no-op;
/// [`ServiceContainer::shutdown`] clears it so tests can re-initialize.
pub struct ServiceContainer {
    init_latch: Mutex<bool>,
    phase: PhaseTracker,
    inner: RwLock<Option<Inner>>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self { init_latch: Mutex::new(false), phase: PhaseTracker::new(), inner: RwLock::new(None) }
    }

    pub fn phase(&self) -> ContainerPhase {
        self.phase.get()
    }

    /// Builds every shared service in dependency order. A second call while
    /// already initialized is a silent no-op, per the single-initialization
    /// guarantee (prevents the double-allocation failure mode).
    pub fn init(&self, config: Config) -> Result<(), ServiceError> {
        let mut latch = self.init_latch.lock().unwrap();
        if *latch {
            log::debug!("[SERVICE] init() called on an already-initialized container, ignoring");
            return Ok(());
        }

        // logger
        let _ = env_logger::Builder::new().parse_filters(&config.log.level).try_init();

        // pool
        let pool = self.build_pool(&config).map_err(|reason| ServiceError::StartupFailed { step: "pool", reason })?;

        // cache
        let cache = Arc::new(Cache::new(config.cache.clone()));
        let cleanup_interval = Duration::from_millis(config.cache.cleanup_interval_ms.max(1));
        let cleanup_worker = CleanupWorker::spawn(cache.clone(), cleanup_interval);

        // plugin registry
        let plugin_registry = PluginRegistry::new(PLUGIN_API_VERSION);

        *self.inner.write().unwrap() = Some(Inner { config, pool, cache, cleanup_worker, plugin_registry });
        self.phase.set(ContainerPhase::Running);
        *latch = true;
        Ok(())
    }

    fn build_pool(&self, config: &Config) -> Result<AnyPool, String> {
        let db = &config.db;
        match db.backend {
            DbBackend::Sqlite => {
                let file = db.file.as_deref().ok_or("db.file is required for the sqlite backend")?;
                Ok(build_sqlite_pool(file, db.pool.clone()))
            }
            DbBackend::Mysql => {
                let host = db.host.as_deref().unwrap_or("127.0.0.1");
                let port = db.port.unwrap_or(3306);
                let user = db.user.as_deref().ok_or("db.user is required for the mysql backend")?;
                let name = db.name.as_deref().ok_or("db.name is required for the mysql backend")?;
                Ok(build_mysql_pool(host, port, user, db.password.clone(), name, db.pool.clone()))
            }
        }
    }

    /// Signals background workers to stop and releases owned resources in
    /// the reverse of startup order: plugins, then cache, then pool.
    pub fn shutdown(&self) {
        let mut latch = self.init_latch.lock().unwrap();
        if !*latch {
            return;
        }

        self.phase.set(ContainerPhase::SignalSent);
        if let Some(mut inner) = self.inner.write().unwrap().take() {
            self.phase.set(ContainerPhase::StoppingPlugins);
            drop(inner.plugin_registry);

            self.phase.set(ContainerPhase::FlushingCache);
            inner.cleanup_worker.stop();
            drop(inner.cache);

            self.phase.set(ContainerPhase::ClosingPool);
            inner.pool.close();
            drop(inner.pool);
        }

        self.phase.set(ContainerPhase::Complete);
        *latch = false;
    }

    pub fn with_pool<T>(&self, f: impl FnOnce(&AnyPool) -> T) -> Result<T, ServiceError> {
        let guard = self.inner.read().unwrap();
        let inner = guard.as_ref().ok_or(ServiceError::NotInitialized)?;
        Ok(f(&inner.pool))
    }

    pub fn cache(&self) -> Result<Arc<Cache>, ServiceError> {
        let guard = self.inner.read().unwrap();
        let inner = guard.as_ref().ok_or(ServiceError::NotInitialized)?;
        Ok(inner.cache.clone())
    }

    pub fn with_plugin_registry<T>(&self, f: impl FnOnce(&PluginRegistry) -> T) -> Result<T, ServiceError> {
        let guard = self.inner.read().unwrap();
        let inner = guard.as_ref().ok_or(ServiceError::NotInitialized)?;
        Ok(f(&inner.plugin_registry))
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}
