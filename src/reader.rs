//! Throughput-gated reading of a sequential byte source
//!
//! [`MeteredReader`] wraps an open byte source and tracks cumulative bytes
//! against elapsed wall time. Once the measurement window has elapsed, every
//! read re-judges the average throughput and aborts the session with
//! [`ServeError::TooSlow`] when it falls below the configured minimum. The
//! session is not reusable after an abort; the caller is expected to discard
//! it and decide whether to retry.

use crate::error::{Result, ServeError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Byte-source wrapper that aborts an underperforming read early
pub struct MeteredReader<R> {
    source: R,
    cancel: CancellationToken,
    started: Instant,
    bytes_read: u64,
    check_window: Duration,
    min_speed_mbps: f64,
}

impl<R: AsyncRead + Unpin> MeteredReader<R> {
    /// Create a reader with a fresh, never-cancelled token
    pub fn new(source: R, check_window: Duration, min_speed_mbps: f64) -> Self {
        Self::with_cancellation(source, check_window, min_speed_mbps, CancellationToken::new())
    }

    /// Create a reader whose reads observe `cancel`
    ///
    /// The token is checked at the top of every [`read`](Self::read) call;
    /// once it fires the source is not touched again.
    pub fn with_cancellation(
        source: R,
        check_window: Duration,
        min_speed_mbps: f64,
        cancel: CancellationToken,
    ) -> Self {
        MeteredReader {
            source,
            cancel,
            started: Instant::now(),
            bytes_read: 0,
            check_window,
            min_speed_mbps,
        }
    }

    /// Read up to `buf.len()` bytes from the source
    ///
    /// Returns `Ok(0)` at end of data. Returns [`ServeError::TooSlow`] when
    /// the measurement window has elapsed and the cumulative average
    /// throughput is below the minimum; the check recurs on every call past
    /// the window, so a source that degrades later still trips. A source
    /// that reaches end of data before the window elapses is never judged.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(ServeError::Cancelled);
        }

        let n = self.source.read(buf).await?;
        self.bytes_read += n as u64;

        let elapsed = self.started.elapsed();
        if elapsed >= self.check_window {
            // Mbps: (bytes * 8) / (1024 * 1024) / seconds
            let speed_mbps =
                (self.bytes_read as f64 * 8.0) / (1024.0 * 1024.0 * elapsed.as_secs_f64());
            if speed_mbps < self.min_speed_mbps {
                debug!(
                    bytes_read = self.bytes_read,
                    elapsed_ms = elapsed.as_millis() as u64,
                    speed_mbps,
                    min_speed_mbps = self.min_speed_mbps,
                    "read speed below minimum, aborting"
                );
                return Err(ServeError::TooSlow);
            }
        }

        Ok(n)
    }
}
