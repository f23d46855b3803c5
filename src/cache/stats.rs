//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Stats Counters ==
/// Running totals kept by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsCounters {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries evicted due to LRU policy
    pub evictions: u64,
}

impl StatsCounters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Freezes the counters into a report.
    pub fn snapshot(&self, size: Option<usize>) -> CacheStats {
        CacheStats::new(self.hits, self.misses, self.evictions, size)
    }
}

// == Cache Stats ==
/// Point-in-time statistics report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Current number of entries, None when the backend cannot know it
    pub size: Option<usize>,
    /// hits / (hits + misses), 0.0 before any lookup
    pub hit_rate: f64,
}

impl CacheStats {
    // == Constructor ==
    /// Builds a report and derives the hit rate.
    pub fn new(hits: u64, misses: u64, evictions: u64, size: Option<usize>) -> Self {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        Self {
            hits,
            misses,
            evictions,
            size,
            hit_rate,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = StatsCounters::default().snapshot(Some(0));
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.size, Some(0));
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new(0, 0, 0, None);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let mut counters = StatsCounters::default();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        assert_eq!(counters.snapshot(None).hit_rate, 1.0);
    }

    #[test]
    fn test_hit_rate_all_misses() {
        let mut counters = StatsCounters::default();
        counters.record_miss();
        counters.record_miss();
        assert_eq!(counters.snapshot(None).hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = CacheStats::new(80, 20, 5, Some(100));
        assert!((stats.hit_rate - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_reset() {
        let mut counters = StatsCounters::default();
        counters.record_hit();
        counters.record_miss();
        counters.record_eviction();
        counters.reset();
        assert_eq!(counters, StatsCounters::default());
    }

    #[test]
    fn test_stats_serialize() {
        let json = serde_json::to_value(CacheStats::new(1, 1, 0, None)).unwrap();
        assert_eq!(json["hit_rate"], 0.5);
        assert!(json["size"].is_null());
    }
}
