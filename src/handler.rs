//! Serving façade wiring the cache, coalescer and fetcher together
//!
//! The façade owns the miss path: look the key up in the cache, and on a
//! miss run one coalesced hedged fetch whose successful payload is inserted
//! into the cache from the detached fetch task, so the cache benefits even
//! when every waiter has gone away.

use crate::cache::{CacheStats, SegmentCache};
use crate::coalesce::FetchCoalescer;
use crate::error::{Result, ServeError};
use crate::fetch::HedgedFetcher;
use crate::metrics::ServeMetrics;
use bytes::Bytes;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Request-facing entry point for fetching complete segment payloads
pub struct SegmentHandler {
    cache: Arc<SegmentCache>,
    coalescer: FetchCoalescer,
    fetcher: Arc<HedgedFetcher>,
    metrics: Arc<ServeMetrics>,
}

impl SegmentHandler {
    pub fn new(
        cache: Arc<SegmentCache>,
        fetcher: Arc<HedgedFetcher>,
        metrics: Arc<ServeMetrics>,
    ) -> Self {
        SegmentHandler {
            cache,
            coalescer: FetchCoalescer::new(),
            fetcher,
            metrics,
        }
    }

    /// Cache-only lookup
    pub fn lookup(&self, key: &str) -> Option<Bytes> {
        self.cache.get(key)
    }

    /// Cache statistics, for the stats endpoint
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Fetch the payload through the coalescer and cache it on success
    ///
    /// The fetch task runs detached with its own never-cancelled token:
    /// abandoning this call (or any other waiter) does not stop the physical
    /// read. Failed results are delivered to the waiters but never cached.
    pub async fn fetch_and_cache(&self, key: &str) -> Result<Bytes> {
        let fetcher = Arc::clone(&self.fetcher);
        let cache = Arc::clone(&self.cache);
        let fetch_key = key.to_string();

        self.coalescer
            .fetch(key, move || async move {
                let data = fetcher.fetch(&fetch_key, CancellationToken::new()).await?;
                cache.insert(&fetch_key, data.clone());
                Ok(data)
            })
            .await
    }

    /// Serve the complete payload for `key`
    ///
    /// On a cache miss, waits for the coalesced fetch; `cancel` aborts only
    /// this caller's wait, never the shared fetch itself.
    pub async fn serve(&self, key: &str, cancel: &CancellationToken) -> Result<Bytes> {
        self.metrics.record_request();

        if let Some(data) = self.lookup(key) {
            debug!(key, size = data.len(), "cache hit");
            self.metrics.record_cache_hit();
            self.metrics.record_bytes_from_cache(data.len() as u64);
            return Ok(data);
        }

        debug!(key, "cache miss");
        self.metrics.record_cache_miss();

        tokio::select! {
            _ = cancel.cancelled() => Err(ServeError::Cancelled),
            result = self.fetch_and_cache(key) => result,
        }
    }
}
