//! Bounded cache of decompressed hunks.
//!
//! Hits take a shared lock only. Decompression happens outside the lock, so
//! two threads missing on the same hunk may both decode it; the first insert
//! wins and both callers get that copy. When the cache is full it is
//! cleared before the next insert.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Thread-safe hunk cache with clear-all eviction.
#[derive(Debug)]
pub struct HunkCache {
    capacity: usize,
    entries: RwLock<HashMap<u32, Arc<[u8]>>>,
}

impl HunkCache {
    /// Create a cache holding at most `capacity` hunks. A capacity of 0
    /// stores nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(HashMap::with_capacity(capacity.min(64))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: u32) -> Option<Arc<[u8]>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&index).cloned()
    }

    /// Insert `data` for `index` and return the authoritative copy, which is
    /// the existing entry if another thread got there first.
    pub fn insert(&self, index: u32, data: Arc<[u8]>) -> Arc<[u8]> {
        if self.capacity == 0 {
            return data;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(&index) {
            return Arc::clone(existing);
        }
        if entries.len() >= self.capacity {
            log::debug!("Hunk cache full ({} entries), clearing", entries.len());
            entries.clear();
        }
        entries.insert(index, Arc::clone(&data));
        data
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
