use serde::Deserialize;

/// Which backend a [`DbConfig`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbBackend {
    Mysql,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub backend: DbBackend,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_size: u32,
    pub min_size: u32,
    pub acquire_timeout_ms: u64,
    pub idle_timeout_ms: u64,
    pub max_retry: u32,
    pub retry_backoff_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_size: 1,
            acquire_timeout_ms: 5_000,
            idle_timeout_ms: 0,
            max_retry: 3,
            retry_backoff_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub default_ttl_ms: u64,
    pub cleanup_interval_ms: u64,
    pub max_items: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: 60_000,
            cleanup_interval_ms: 60_000,
            max_items: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CrudConfig {
    #[serde(default)]
    pub allowed_tables: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "plain".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub crud: CrudConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.max_size, 10);
        assert!(cfg.acquire_timeout_ms > 0);
    }

    #[test]
    fn deserializes_minimal_sqlite_config() {
        let json = r#"{"db": {"backend": "sqlite", "file": "data.db"}}"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.db.backend, DbBackend::Sqlite);
        assert_eq!(cfg.cache.max_items, 10_000);
    }
}
