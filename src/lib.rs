//! Plugin Cache - A plugin-namespaced in-memory cache engine
//!
//! Provides an LRU store with TTL expiration and access statistics, an optional
//! Redis backend, and per-consumer key isolation over one shared backend.
//!
//! # Example
//! ```ignore
//! let service = CacheService::new(CacheConfig::default())?;
//! service.init().await?;
//!
//! let cache = service.scoped_cache("billing");
//! cache.set("invoice:42", json!({"total": 99}), Some(60)).await?;
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod namespace;
pub mod service;
pub mod tasks;

pub use backend::{CacheBackend, CacheBackendExt, LruBackend, RedisBackend};
pub use cache::CacheStats;
pub use config::{BackendKind, CacheConfig, LruOptions, RedisOptions};
pub use error::{CacheError, Result};
pub use namespace::ScopedCache;
pub use service::{CacheService, HealthReport, HealthStatus, LifecycleState};
