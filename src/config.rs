//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables
//! or from a host application's JSON configuration.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Default maximum number of entries held by the in-memory backend.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Default key prefix for the external store.
pub const DEFAULT_REDIS_PREFIX: &str = "cache:";

// == Backend Kind ==
/// Which concrete backend the service owns. Resolved once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process LRU store
    #[default]
    Lru,
    /// External key-value service (Redis)
    #[serde(alias = "redis")]
    External,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(BackendKind::Lru),
            "external" | "redis" => Ok(BackendKind::External),
            other => Err(CacheError::Config(format!(
                "unknown cache backend '{}', expected 'lru' or 'external'",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Lru => f.write_str("lru"),
            BackendKind::External => f.write_str("external"),
        }
    }
}

// == LRU Options ==
/// Options for the in-memory LRU backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LruOptions {
    /// Maximum number of entries before LRU eviction kicks in
    pub max_entries: usize,
    /// Default TTL in seconds; None = entries never expire unless `set` passes a TTL
    pub default_ttl: Option<u64>,
    /// Background sweep interval in milliseconds; None or 0 = lazy expiry only
    pub sweep_interval_ms: Option<u64>,
}

impl Default for LruOptions {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            default_ttl: None,
            sweep_interval_ms: None,
        }
    }
}

impl LruOptions {
    /// Rejects settings the store cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::Config(
                "max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Sweep interval, if a background sweep should run.
    pub fn sweep_interval(&self) -> Option<u64> {
        self.sweep_interval_ms.filter(|ms| *ms > 0)
    }
}

// == Redis Options ==
/// Connection parameters for the external store backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedisOptions {
    /// Connection URL, e.g. `redis://localhost:6379`
    pub url: String,
    /// Prefix applied to every key this cache owns
    pub key_prefix: String,
    /// Upper bound on the initial connection attempt
    pub connect_timeout_ms: u64,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: Option<u64>,
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: DEFAULT_REDIS_PREFIX.to_string(),
            connect_timeout_ms: 5000,
            default_ttl: None,
        }
    }
}

// == Cache Config ==
/// Top-level cache service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend to construct
    pub backend: BackendKind,
    /// Options for the LRU backend
    pub lru: LruOptions,
    /// Options for the external backend
    pub redis: RedisOptions,
    /// When false, `stats()` always reports None
    pub enable_stats: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Lru,
            lru: LruOptions::default(),
            redis: RedisOptions::default(),
            enable_stats: true,
        }
    }
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `lru` or `external` (default: lru)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: none)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Sweep frequency in milliseconds (default: none)
    /// - `CACHE_ENABLE_STATS` - `true`/`false` (default: true)
    /// - `CACHE_REDIS_URL` - External store URL
    /// - `CACHE_REDIS_PREFIX` - External store key prefix (default: `cache:`)
    /// - `CACHE_REDIS_CONNECT_TIMEOUT_MS` - Connect timeout (default: 5000)
    ///
    /// Malformed numbers fall back to defaults; an unknown backend is an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let backend = match env::var("CACHE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.backend,
        };
        let default_ttl = parse_env("CACHE_DEFAULT_TTL");

        Ok(Self {
            backend,
            lru: LruOptions {
                max_entries: parse_env("CACHE_MAX_ENTRIES").unwrap_or(DEFAULT_MAX_ENTRIES),
                default_ttl,
                sweep_interval_ms: parse_env("CACHE_SWEEP_INTERVAL_MS"),
            },
            redis: RedisOptions {
                url: env::var("CACHE_REDIS_URL").unwrap_or(defaults.redis.url),
                key_prefix: env::var("CACHE_REDIS_PREFIX").unwrap_or(defaults.redis.key_prefix),
                connect_timeout_ms: parse_env("CACHE_REDIS_CONNECT_TIMEOUT_MS")
                    .unwrap_or(defaults.redis.connect_timeout_ms),
                default_ttl,
            },
            enable_stats: parse_env("CACHE_ENABLE_STATS").unwrap_or(defaults.enable_stats),
        })
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, BackendKind::Lru);
        assert_eq!(config.lru.max_entries, 1000);
        assert_eq!(config.lru.default_ttl, None);
        assert_eq!(config.lru.sweep_interval(), None);
        assert!(config.enable_stats);
        assert_eq!(config.redis.key_prefix, "cache:");
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("lru".parse::<BackendKind>().unwrap(), BackendKind::Lru);
        assert_eq!("LRU".parse::<BackendKind>().unwrap(), BackendKind::Lru);
        assert_eq!(
            "external".parse::<BackendKind>().unwrap(),
            BackendKind::External
        );
        assert_eq!("redis".parse::<BackendKind>().unwrap(), BackendKind::External);
    }

    #[test]
    fn test_backend_kind_unknown() {
        let err = "memcached".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
        assert!(err.to_string().contains("memcached"));
    }

    #[test]
    fn test_config_deserialize_partial() {
        let json = r#"{"backend": "lru", "lru": {"max_entries": 5, "sweep_interval_ms": 250}}"#;
        let config: CacheConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.lru.max_entries, 5);
        assert_eq!(config.lru.sweep_interval(), Some(250));
        assert!(config.enable_stats);
    }

    #[test]
    fn test_config_deserialize_redis_alias() {
        let json = r#"{"backend": "redis", "redis": {"url": "redis://cache:6379"}}"#;
        let config: CacheConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.backend, BackendKind::External);
        assert_eq!(config.redis.url, "redis://cache:6379");
        assert_eq!(config.redis.key_prefix, "cache:");
    }

    #[test]
    fn test_config_deserialize_unknown_backend() {
        let json = r#"{"backend": "memcached"}"#;
        assert!(serde_json::from_str::<CacheConfig>(json).is_err());
    }

    #[test]
    fn test_zero_sweep_interval_disables_sweep() {
        let options = LruOptions {
            sweep_interval_ms: Some(0),
            ..LruOptions::default()
        };
        assert_eq!(options.sweep_interval(), None);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let options = LruOptions {
            max_entries: 0,
            ..LruOptions::default()
        };
        assert!(matches!(options.validate(), Err(CacheError::Config(_))));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "CACHE_BACKEND",
            "CACHE_MAX_ENTRIES",
            "CACHE_DEFAULT_TTL",
            "CACHE_SWEEP_INTERVAL_MS",
            "CACHE_ENABLE_STATS",
            "CACHE_REDIS_URL",
            "CACHE_REDIS_PREFIX",
            "CACHE_REDIS_CONNECT_TIMEOUT_MS",
        ] {
            env::remove_var(name);
        }

        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config, CacheConfig::default());
    }
}
