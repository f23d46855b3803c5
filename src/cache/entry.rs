//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use chrono::Utc;
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cache Entry ==
/// Represents a single cache entry with value and access metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Key the entry is stored under
    pub key: String,
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last read or overwrite (Unix milliseconds)
    pub accessed_at: u64,
    /// Number of successful reads and overwrites
    pub access_count: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with an already-resolved TTL.
    ///
    /// # Arguments
    /// * `key` - The key the entry lives under
    /// * `value` - The value to store
    /// * `ttl_seconds` - Optional TTL in seconds (see [`resolve_ttl`])
    pub fn new(key: String, value: Value, ttl_seconds: Option<u64>) -> Self {
        let now = current_timestamp_ms();

        Self {
            key,
            value,
            created_at: now,
            accessed_at: now,
            access_count: 0,
            expires_at: expiry_from(now, ttl_seconds),
        }
    }

    // == Overwrite ==
    /// Replaces the value in place and restarts the TTL clock.
    pub fn overwrite(&mut self, value: Value, ttl_seconds: Option<u64>) {
        let now = current_timestamp_ms();
        self.value = value;
        self.accessed_at = now;
        self.access_count += 1;
        self.expires_at = expiry_from(now, ttl_seconds);
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self) {
        self.accessed_at = current_timestamp_ms();
        self.access_count += 1;
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Expiry predicate shared by lazy checks and the background sweep.
    ///
    /// An entry is expired once `expires_at` lies strictly in the past.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(expires) if expires < now_ms)
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }
}

// == TTL Resolution ==
/// Resolves the effective TTL for a write.
///
/// An explicit TTL wins over the default. `0` means the entry never expires.
/// Negative TTLs are rejected before any mutation happens.
pub fn resolve_ttl(ttl_seconds: Option<i64>, default_ttl: Option<u64>) -> Result<Option<u64>> {
    match ttl_seconds {
        Some(ttl) if ttl < 0 => Err(CacheError::InvalidTtl(ttl)),
        Some(0) => Ok(None),
        Some(ttl) => Ok(Some(ttl as u64)),
        None => Ok(default_ttl.filter(|ttl| *ttl > 0)),
    }
}

fn expiry_from(now_ms: u64, ttl_seconds: Option<u64>) -> Option<u64> {
    ttl_seconds.map(|ttl| now_ms.saturating_add(ttl.saturating_mul(1000)))
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
