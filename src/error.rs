//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for every cache backend and the service facade.
///
/// A missing key is never an error: lookups report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid configuration (unknown backend, zero capacity, bad URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation the receiver deliberately does not support
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Negative TTL passed to `set`
    #[error("Invalid TTL: {0} seconds")]
    InvalidTtl(i64),

    /// Invalid request data (empty or oversized key)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// External backend used before `connect()`
    #[error("Cache backend not connected: call connect() first")]
    NotConnected,

    /// External transport failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Returns true when the error means "cache unavailable" rather than a caller mistake.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, CacheError::NotConnected | CacheError::Connection(_))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Connection(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
