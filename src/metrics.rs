//! Runtime metrics for the segment server
//!
//! Thread-safe counters on atomics, with a point-in-time snapshot type and
//! a plain-text rendering used by the stats endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector shared across all server components
#[derive(Debug, Default)]
pub struct ServeMetrics {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    physical_fetches: AtomicU64,
    hedged_retries: AtomicU64,
    fetch_errors: AtomicU64,
    bytes_from_cache: AtomicU64,
    bytes_from_origin: AtomicU64,
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub physical_fetches: u64,
    pub hedged_retries: u64,
    pub fetch_errors: u64,
    pub bytes_from_cache: u64,
    pub bytes_from_origin: u64,
}

impl ServeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one physical read of the backing storage
    pub fn record_physical_fetch(&self) {
        self.physical_fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a guarded attempt aborted as too slow and retried
    pub fn record_hedged_retry(&self) {
        self.hedged_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes_from_cache(&self, n: u64) {
        self.bytes_from_cache.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_bytes_from_origin(&self, n: u64) {
        self.bytes_from_origin.fetch_add(n, Ordering::Relaxed);
    }

    /// Take a consistent-enough snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            physical_fetches: self.physical_fetches.load(Ordering::Relaxed),
            hedged_retries: self.hedged_retries.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            bytes_from_cache: self.bytes_from_cache.load(Ordering::Relaxed),
            bytes_from_origin: self.bytes_from_origin.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Render the snapshot in plain-text exposition format
    pub fn render_text(&self) -> String {
        format!(
            "segserve_requests_total {}\n\
             segserve_cache_hits_total {}\n\
             segserve_cache_misses_total {}\n\
             segserve_physical_fetches_total {}\n\
             segserve_hedged_retries_total {}\n\
             segserve_fetch_errors_total {}\n\
             segserve_bytes_from_cache_total {}\n\
             segserve_bytes_from_origin_total {}\n",
            self.total_requests,
            self.cache_hits,
            self.cache_misses,
            self.physical_fetches,
            self.hedged_retries,
            self.fetch_errors,
            self.bytes_from_cache,
            self.bytes_from_origin,
        )
    }
}
