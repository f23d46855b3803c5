//! Backend Module
//!
//! The storage contract shared by every cache backend, plus the two concrete
//! backends: the in-process LRU store and the Redis adapter.

mod lru;
mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::cache::CacheStats;
use crate::config::{BackendKind, CacheConfig};
use crate::error::Result;

pub use self::lru::LruBackend;
pub use self::redis::RedisBackend;

// == Cache Backend ==
/// Storage contract implemented by every backend and by namespace handles.
///
/// A missing key is `Ok(None)` / `Ok(false)`, never an error.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the value for `key`, or None if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores `value`; `ttl_seconds` overrides the default TTL, 0 = never expire.
    async fn set(&self, key: &str, value: Value, ttl_seconds: Option<i64>) -> Result<()>;

    /// Removes `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Checks for a live key without affecting statistics or recency.
    async fn has(&self, key: &str) -> Result<bool>;

    /// Removes every entry this cache owns.
    async fn clear(&self) -> Result<()>;

    /// Current statistics.
    async fn stats(&self) -> Result<CacheStats>;

    /// Writes `value` under `key` and reports whether it reads back unchanged.
    ///
    /// Used by health checks. The default goes through `set` and `get`, so it is
    /// subject to eviction and counted in statistics; callers delete `key` after.
    async fn probe(&self, key: &str, value: Value, ttl_seconds: Option<i64>) -> Result<bool> {
        self.set(key, value.clone(), ttl_seconds).await?;
        Ok(self.get(key).await?.as_ref() == Some(&value))
    }

    /// Establishes any connection the backend needs. Idempotent.
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    /// Stops background work and releases resources. Idempotent.
    async fn close(&self) -> Result<()>;
}

// == Typed Access ==
/// Typed helpers on top of the JSON value contract.
#[async_trait]
pub trait CacheBackendExt: CacheBackend {
    /// Reads and decodes a value.
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Encodes and stores a value.
    async fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<i64>,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(key, value, ttl_seconds).await
    }
}

impl<B: CacheBackend + ?Sized> CacheBackendExt for B {}

// == Backend Factory ==
/// Constructs the backend selected by `config`.
///
/// Configuration problems (zero capacity, malformed URL) fail here rather than
/// on first use. An LRU backend with a sweep interval spawns its sweep task, so
/// this must run inside a Tokio runtime in that case.
pub fn build_backend(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>> {
    match config.backend {
        BackendKind::Lru => Ok(Arc::new(LruBackend::new(&config.lru)?)),
        BackendKind::External => Ok(Arc::new(RedisBackend::new(&config.redis)?)),
    }
}
