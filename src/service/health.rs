//! Health report types for the cache service.

use serde::Serialize;

/// Prefix of the sentinel keys written by `health_check()`.
pub const HEALTH_CHECK_PREFIX: &str = "__health_check__:";

/// TTL of the sentinel, so a crash mid-check cannot leave it behind for long.
pub const HEALTH_CHECK_TTL_SECS: i64 = 10;

/// Outcome of a synthetic round trip through the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Write, read-back and cleanup all succeeded
    Healthy,
    /// The backend answered, but the round trip did not fully check out
    Degraded,
    /// The backend failed outright
    Unhealthy,
}

/// Structured health report; never produced by an error path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
    /// RFC 3339 timestamp of the check
    pub checked_at: String,
    /// Time spent on the round trip
    pub latency_ms: u64,
}

impl HealthReport {
    pub fn new(status: HealthStatus, message: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            status,
            message: message.into(),
            checked_at: chrono::Utc::now().to_rfc3339(),
            latency_ms,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
