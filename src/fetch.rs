//! Hedged fetching of whole segments from backing storage
//!
//! A fetch is a two-stage protocol: a first read guarded by the
//! throughput-gated [`MeteredReader`], and on a too-slow abort a single
//! unguarded retry after a fixed pause. The pause gives the storage layer a
//! chance to stage the data into a faster tier (typically the kernel page
//! cache) before the second attempt starts. There is no third attempt.

use crate::config::ServerConfig;
use crate::error::{Result, ServeError};
use crate::metrics::ServeMetrics;
use crate::reader::MeteredReader;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A sequential byte source obtained from an opener
pub type ByteSource = Box<dyn AsyncRead + Unpin + Send>;

/// Opens a sequential byte source for a resource key
///
/// Implementations must support reading the source to exhaustion; the
/// source is closed by drop on every exit path of a fetch attempt.
#[async_trait]
pub trait SegmentOpener: Send + Sync {
    async fn open(&self, key: &str) -> Result<ByteSource>;
}

/// Opener backed by files under a base directory
pub struct FsOpener {
    base_dir: PathBuf,
}

impl FsOpener {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FsOpener {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait]
impl SegmentOpener for FsOpener {
    async fn open(&self, key: &str) -> Result<ByteSource> {
        let path = self.base_dir.join(key.trim_start_matches('/'));
        let file = tokio::fs::File::open(&path).await?;
        Ok(Box::new(file))
    }
}

/// Two-attempt fetch orchestrator
///
/// Performs no caching; callers decide what to do with the returned bytes.
pub struct HedgedFetcher {
    opener: Arc<dyn SegmentOpener>,
    check_window: Duration,
    min_speed_mbps: f64,
    hedge_delay: Duration,
    chunk_bytes: usize,
    metrics: Arc<ServeMetrics>,
}

impl HedgedFetcher {
    pub fn new(
        opener: Arc<dyn SegmentOpener>,
        config: &ServerConfig,
        metrics: Arc<ServeMetrics>,
    ) -> Self {
        HedgedFetcher {
            opener,
            check_window: config.speed_check_window(),
            min_speed_mbps: config.min_speed_mbps,
            hedge_delay: config.hedge_delay(),
            chunk_bytes: config.read_chunk_bytes,
            metrics,
        }
    }

    /// Fetch the complete payload for `key`
    ///
    /// Open failures (not found, permission, I/O) are returned immediately
    /// and never hedged. A guarded attempt that aborts as too slow is
    /// retried exactly once, unguarded, after the configured hedge delay;
    /// the second attempt's outcome is terminal either way.
    pub async fn fetch(&self, key: &str, cancel: CancellationToken) -> Result<Bytes> {
        self.metrics.record_physical_fetch();
        debug!(key, "guarded read attempt");

        let result = match self.read_guarded(key, cancel.clone()).await {
            Err(ServeError::TooSlow) => {
                info!(
                    key,
                    delay_ms = self.hedge_delay.as_millis() as u64,
                    "read too slow, hedging after delay"
                );
                self.metrics.record_hedged_retry();
                sleep(self.hedge_delay).await;
                self.read_unguarded(key, cancel).await
            }
            other => other,
        };

        match &result {
            Ok(data) => self.metrics.record_bytes_from_origin(data.len() as u64),
            Err(ServeError::Cancelled) => {}
            Err(_) => self.metrics.record_fetch_error(),
        }
        result
    }

    async fn read_guarded(&self, key: &str, cancel: CancellationToken) -> Result<Bytes> {
        let source = self.opener.open(key).await?;
        let mut reader =
            MeteredReader::with_cancellation(source, self.check_window, self.min_speed_mbps, cancel);

        let mut data = BytesMut::new();
        let mut chunk = vec![0u8; self.chunk_bytes];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                return Ok(data.freeze());
            }
            data.extend_from_slice(&chunk[..n]);
        }
    }

    async fn read_unguarded(&self, key: &str, cancel: CancellationToken) -> Result<Bytes> {
        let mut source = self.opener.open(key).await?;

        let mut data = BytesMut::new();
        let mut chunk = vec![0u8; self.chunk_bytes];
        loop {
            if cancel.is_cancelled() {
                return Err(ServeError::Cancelled);
            }
            let n = source.read(&mut chunk).await?;
            if n == 0 {
                return Ok(data.freeze());
            }
            data.extend_from_slice(&chunk[..n]);
        }
    }
}
