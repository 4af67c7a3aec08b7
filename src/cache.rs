//! Bounded in-memory cache for completed segment reads
//!
//! [`SegmentCache`] maps resource keys to immutable byte payloads under a
//! fixed byte budget, evicting the least-recently-used entries whenever an
//! insert pushes the total over budget. A payload larger than the whole
//! budget is deliberately never cached.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

struct CacheEntry {
    data: Bytes,
    /// Monotonic recency stamp; higher means touched more recently.
    last_used: u64,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    used_bytes: usize,
    tick: u64,
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub used_bytes: usize,
    pub max_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

/// LRU cache limited by total payload size in bytes
///
/// All operations take a single internal lock for the duration of one
/// logical operation and never hold it across I/O. A `get` refreshes the
/// entry's recency, so it is serialized with other mutations.
pub struct SegmentCache {
    max_bytes: usize,
    inner: Mutex<CacheInner>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SegmentCache {
    /// Create a cache with the given maximum total payload size in bytes
    pub fn new(max_bytes: usize) -> Self {
        SegmentCache {
            max_bytes,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                used_bytes: 0,
                tick: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a payload, marking the entry most-recently-used on hit
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut inner = self.inner.lock().unwrap();
        inner.tick += 1;
        let tick = inner.tick;

        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.last_used = tick;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.data.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a payload, evicting least-recently-used entries over budget
    ///
    /// A payload larger than the whole cache budget is never stored; the
    /// call is a no-op rather than an error. Inserting under an existing key
    /// replaces the payload atomically and marks it most-recently-used.
    pub fn insert(&self, key: &str, data: Bytes) {
        if data.len() > self.max_bytes {
            debug!(
                key,
                size = data.len(),
                max_bytes = self.max_bytes,
                "payload exceeds cache budget, not caching"
            );
            return;
        }

        let mut inner = self.inner.lock().unwrap();
        inner.tick += 1;
        let tick = inner.tick;

        let new_size = data.len();
        if let Some(old) = inner.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                last_used: tick,
            },
        ) {
            inner.used_bytes -= old.data.len();
        }
        inner.used_bytes += new_size;

        self.evict(&mut inner);
    }

    /// Remove least-recently-used entries until the budget holds.
    ///
    /// Terminates because each round strictly decreases `used_bytes` and an
    /// oversized payload was already rejected before insertion.
    fn evict(&self, inner: &mut CacheInner) {
        while inner.used_bytes > self.max_bytes {
            let victim = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());

            match victim {
                Some(key) => {
                    if let Some(entry) = inner.entries.remove(&key) {
                        inner.used_bytes -= entry.data.len();
                        debug!(key = %key, size = entry.data.len(), "evicted LRU entry");
                    }
                }
                None => break,
            }
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            entries: inner.entries.len(),
            used_bytes: inner.used_bytes,
            max_bytes: self.max_bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
