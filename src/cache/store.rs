//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU ordering and TTL expiration.

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::entry::{current_timestamp_ms, resolve_ttl};
use crate::cache::lru::NodeId;
use crate::cache::{CacheEntry, CacheStats, LruList, StatsCounters, MAX_KEY_LENGTH};
use crate::config::LruOptions;
use crate::error::{CacheError, Result};

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    node: NodeId,
}

// == Cache Store ==
/// Capacity-bounded storage with LRU eviction and TTL support.
///
/// Every key in `entries` owns exactly one node in `order`, and the two are only
/// ever mutated together inside a single `&mut self` call.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, Slot>,
    /// Access order, head = most recently used
    order: LruList,
    /// Performance counters
    stats: StatsCounters,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: Option<u64>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold (at least 1)
    /// * `default_ttl` - Default TTL in seconds, None = never expire
    pub fn new(max_entries: usize, default_ttl: Option<u64>) -> Result<Self> {
        Self::from_options(&LruOptions {
            max_entries,
            default_ttl,
            sweep_interval_ms: None,
        })
    }

    /// Creates a store from backend options.
    pub fn from_options(options: &LruOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            entries: HashMap::new(),
            order: LruList::new(),
            stats: StatsCounters::default(),
            max_entries: options.max_entries,
            default_ttl: options.default_ttl,
        })
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// If the key already exists, the value is overwritten in place, the TTL is
    /// reset and the entry is promoted; no eviction happens. Otherwise, if the
    /// cache is at capacity, the least recently used entry is evicted first.
    ///
    /// Returns the evicted key, if any.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None, 0 = never)
    pub fn set(&mut self, key: &str, value: Value, ttl: Option<i64>) -> Result<Option<String>> {
        validate_key(key)?;
        let ttl = resolve_ttl(ttl, self.default_ttl)?;

        if let Some(slot) = self.entries.get_mut(key) {
            slot.entry.overwrite(value, ttl);
            self.order.move_to_front(slot.node);
            return Ok(None);
        }

        let mut evicted = None;
        if self.entries.len() >= self.max_entries {
            if let Some(evicted_key) = self.order.pop_back() {
                self.entries.remove(&evicted_key);
                self.stats.record_eviction();
                evicted = Some(evicted_key);
            }
        }

        let node = self.order.push_front(key.to_string());
        let entry = CacheEntry::new(key.to_string(), value, ttl);
        self.entries.insert(key.to_string(), Slot { entry, node });

        debug_assert_eq!(self.entries.len(), self.order.len());
        Ok(evicted)
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value if found and not expired, promoting it to most recently
    /// used. Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if self.purge_if_expired(key) {
            self.stats.record_miss();
            return None;
        }

        match self.entries.get_mut(key) {
            Some(slot) => {
                slot.entry.touch();
                self.order.move_to_front(slot.node);
                self.stats.record_hit();
                Some(slot.entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Has ==
    /// Checks for a live key without promoting it or touching statistics.
    ///
    /// Expired entries are purged, same as `get`.
    pub fn has(&mut self, key: &str) -> bool {
        if self.purge_if_expired(key) {
            return false;
        }
        self.entries.contains_key(key)
    }

    // == Peek ==
    /// Returns entry metadata without promotion or statistics side effects.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key).map(|slot| &slot.entry)
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether the key existed.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(slot) => {
                self.order.remove(slot.node);
                true
            }
            None => false,
        }
    }

    // == Clear ==
    /// Removes every entry and resets all counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.stats.reset();
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(Some(self.entries.len()))
    }

    // == Purge Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.delete(key);
        }

        expired_keys.len()
    }

    // == Probe ==
    /// Inserts `value` under `key`, reads it back and unlinks it again.
    ///
    /// Skips capacity eviction and the statistics counters, so the store is left
    /// exactly as it was found. A key that is already present is rejected rather
    /// than overwritten.
    pub fn probe_roundtrip(&mut self, key: &str, value: Value, ttl: Option<i64>) -> Result<bool> {
        validate_key(key)?;
        let ttl = resolve_ttl(ttl, self.default_ttl)?;
        if self.entries.contains_key(key) {
            return Err(CacheError::InvalidRequest(format!(
                "Probe key '{}' is already in use",
                key
            )));
        }

        let node = self.order.push_front(key.to_string());
        let entry = CacheEntry::new(key.to_string(), value.clone(), ttl);
        self.entries.insert(key.to_string(), Slot { entry, node });

        let matched = self
            .entries
            .get(key)
            .is_some_and(|slot| slot.entry.value == value);
        self.delete(key);

        debug_assert_eq!(self.entries.len(), self.order.len());
        Ok(matched)
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<&str> {
        self.order.keys()
    }

    fn purge_if_expired(&mut self, key: &str) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|slot| slot.entry.is_expired());
        if expired {
            self.delete(key);
        }
        expired
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
