//! Redis backend
//!
//! Satisfies the cache contract against an external Redis server so several
//! processes can share one cache. TTLs use Redis' native expiry, and every key
//! lives under a configurable prefix so `clear()` never touches foreign keys.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::backend::CacheBackend;
use crate::cache::{resolve_ttl, CacheStats};
use crate::config::RedisOptions;
use crate::error::{CacheError, Result};

/// Keys fetched per SCAN round trip during `clear()`.
const SCAN_BATCH: usize = 200;

// == Redis Backend ==
/// Cache backend delegating storage to Redis.
///
/// Must be connected with [`CacheBackend::connect`] before use; operations on an
/// unconnected or closed instance fail with [`CacheError::NotConnected`].
pub struct RedisBackend {
    client: Client,
    /// Some between `connect()` and `close()`
    conn: RwLock<Option<MultiplexedConnection>>,
    key_prefix: String,
    connect_timeout: Duration,
    default_ttl: Option<u64>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RedisBackend {
    /// Validates the URL and prepares a client. Does not open a connection.
    pub fn new(options: &RedisOptions) -> Result<Self> {
        let client = Client::open(options.url.as_str()).map_err(|e| {
            CacheError::Config(format!("invalid Redis URL '{}': {}", options.url, e))
        })?;

        Ok(Self {
            client,
            conn: RwLock::new(None),
            key_prefix: options.key_prefix.clone(),
            connect_timeout: Duration::from_millis(options.connect_timeout_ms),
            default_ttl: options.default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub async fn is_connected(&self) -> bool {
        self.conn.read().await.is_some()
    }

    /// Get prefixed key
    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or(CacheError::NotConnected)
    }

    /// Deletes every key under the prefix, one SCAN batch at a time.
    ///
    /// Returns the number of keys removed.
    async fn delete_owned_keys(&self, conn: &mut MultiplexedConnection) -> Result<u64> {
        let pattern = format!("{}*", escape_glob(&self.key_prefix));
        let mut removed = 0;
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = ::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *conn)
                .await?;
            if !batch.is_empty() {
                let deleted: u64 = conn.del(&batch).await?;
                removed += deleted;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn connect(&self) -> Result<()> {
        // Held across the handshake so concurrent callers share one connection
        let mut slot = self.conn.write().await;
        if slot.is_some() {
            return Ok(());
        }

        let conn = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            CacheError::Connection(format!(
                "timed out after {:?} connecting to Redis",
                self.connect_timeout
            ))
        })??;

        *slot = Some(conn);
        info!(prefix = %self.key_prefix, "Connected to Redis cache backend");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(self.prefixed_key(key)).await?;

        match raw {
            Some(raw) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(decode_value(raw)))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: Option<i64>) -> Result<()> {
        let ttl = resolve_ttl(ttl_seconds, self.default_ttl)?;
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(&value)?;
        let prefixed = self.prefixed_key(key);

        match ttl {
            Some(ttl) => {
                let _: () = conn.set_ex(prefixed, payload, ttl).await?;
            }
            None => {
                let _: () = conn.set(prefixed, payload).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.del(self.prefixed_key(key)).await?;
        Ok(removed > 0)
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let present: bool = conn.exists(self.prefixed_key(key)).await?;
        Ok(present)
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let removed = self.delete_owned_keys(&mut conn).await?;
        debug!(removed, prefix = %self.key_prefix, "Cleared Redis cache keys");

        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        // Only this process' lookups are visible; the shared key count is not tracked
        Ok(CacheStats::new(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            0,
            None,
        ))
    }

    async fn close(&self) -> Result<()> {
        // In-flight clones finish their command; the socket closes with the last one
        if self.conn.write().await.take().is_some() {
            info!(prefix = %self.key_prefix, "Disconnected from Redis cache backend");
        }
        Ok(())
    }
}

/// Decodes a stored payload, falling back to the raw text when it is not JSON.
fn decode_value(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

/// Escapes Redis glob metacharacters so a prefix matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unconnected() -> RedisBackend {
        RedisBackend::new(&RedisOptions::default()).unwrap()
    }

    #[test]
    fn test_decode_value_json() {
        assert_eq!(decode_value(r#"{"a":1}"#.to_string()), json!({"a": 1}));
        assert_eq!(decode_value("42".to_string()), json!(42));
    }

    #[test]
    fn test_decode_value_falls_back_to_raw() {
        assert_eq!(
            decode_value("plain text".to_string()),
            Value::String("plain text".to_string())
        );
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("cache:"), "cache:");
        assert_eq!(escape_glob("a*b?[c]"), "a\\*b\\?\\[c\\]");
    }

    #[test]
    fn test_prefixed_key() {
        let backend = unconnected();
        assert_eq!(backend.prefixed_key("plugin:key"), "cache:plugin:key");
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let backend = unconnected();
        assert!(!backend.is_connected().await);

        assert!(matches!(backend.get("k").await, Err(CacheError::NotConnected)));
        assert!(matches!(
            backend.set("k", json!(1), None).await,
            Err(CacheError::NotConnected)
        ));
        assert!(matches!(backend.delete("k").await, Err(CacheError::NotConnected)));
        assert!(matches!(backend.has("k").await, Err(CacheError::NotConnected)));
        assert!(matches!(backend.clear().await, Err(CacheError::NotConnected)));
    }

    #[tokio::test]
    async fn test_negative_ttl_rejected_before_io() {
        let backend = unconnected();

        let result = backend.set("k", json!(1), Some(-10)).await;

        assert!(matches!(result, Err(CacheError::InvalidTtl(-10))));
    }

    #[tokio::test]
    async fn test_stats_size_untracked() {
        let stats = unconnected().stats().await.unwrap();

        assert_eq!(stats.size, None);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[tokio::test]
    async fn test_connect_failure_is_connectivity_error() {
        let backend = RedisBackend::new(&RedisOptions {
            url: "redis://127.0.0.1:1".to_string(),
            connect_timeout_ms: 500,
            ..RedisOptions::default()
        })
        .unwrap();

        let err = backend.connect().await.unwrap_err();

        assert!(err.is_connectivity());
        assert!(!backend.is_connected().await);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_leaves_backend_unusable() {
        let backend = unconnected();

        backend.close().await.unwrap();
        backend.close().await.unwrap();

        assert!(!backend.is_connected().await);
        assert!(matches!(backend.get("k").await, Err(CacheError::NotConnected)));
    }

    // Needs a Redis server on 127.0.0.1:6379
    #[tokio::test]
    #[ignore]
    async fn test_close_disconnects_live_backend() {
        let backend = unconnected();
        backend.connect().await.unwrap();
        backend.connect().await.unwrap();
        assert!(backend.is_connected().await);
        backend.set("close-test", json!(1), Some(5)).await.unwrap();

        backend.close().await.unwrap();

        assert!(!backend.is_connected().await);
        assert!(matches!(
            backend.get("close-test").await,
            Err(CacheError::NotConnected)
        ));
        assert!(matches!(
            backend.set("close-test", json!(2), None).await,
            Err(CacheError::NotConnected)
        ));
    }
}
