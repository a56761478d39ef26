//! Memory Store Module
//!
//! HashMap storage with LRU capacity eviction and lazy TTL expiration.

use std::collections::HashMap;

use super::entry::{current_timestamp_ms, MemoryRecord};
use super::lru::LruTracker;
use crate::error::{CacheError, Result};

// == Memory Store ==
/// Record map behind the in-memory engine. Not synchronized on its own.
#[derive(Debug)]
pub struct MemoryStore {
    records: HashMap<String, MemoryRecord>,
    lru: LruTracker,
    max_entries: usize,
    evictions: u64,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store holding at most `max_entries` records.
    ///
    /// A capacity of 0 means unbounded.
    pub fn new(max_entries: usize) -> Self {
        Self {
            records: HashMap::new(),
            lru: LruTracker::new(),
            max_entries,
            evictions: 0,
        }
    }

    // == Insert ==
    /// Stores a payload unless a live record already holds the key.
    ///
    /// Expired records are replaced. At capacity, the least recently used
    /// record is evicted first.
    pub fn insert(&mut self, key: &str, payload: Vec<u8>, ttl_seconds: u64) -> Result<()> {
        let now = current_timestamp_ms();
        let existing = self.records.get(key).map(|r| r.is_expired_at(now));

        match existing {
            Some(false) => return Err(CacheError::KeyExists(key.to_string())),
            Some(true) => {
                self.records.remove(key);
                self.lru.remove(key);
            }
            None => {}
        }

        if self.max_entries > 0 && self.records.len() >= self.max_entries {
            let evicted = self.lru.evict_oldest().ok_or_else(|| {
                CacheError::Internal("Store is full and eviction failed".to_string())
            })?;
            self.records.remove(&evicted);
            self.evictions += 1;
        }

        self.records
            .insert(key.to_string(), MemoryRecord::new(payload, ttl_seconds));
        self.lru.touch(key);
        Ok(())
    }

    // == Get ==
    /// Returns a copy of the live payload under `key`.
    ///
    /// Expired records are dropped and reported as not found.
    pub fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        let expired = match self.records.get(key) {
            Some(record) => record.is_expired(),
            None => return Err(CacheError::NotFound(key.to_string())),
        };

        if expired {
            self.records.remove(key);
            self.lru.remove(key);
            return Err(CacheError::NotFound(key.to_string()));
        }

        self.lru.touch(key);
        self.records
            .get(key)
            .map(|record| record.payload.clone())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Cleanup Expired ==
    /// Removes every expired record and returns how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.records.remove(key);
            self.lru.remove(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records dropped to stay within capacity.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}
