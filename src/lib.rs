//! Hedged-read caching file server for adaptive-streaming media segments
//!
//! Serves large files from slow or variable-latency block storage while
//! hiding storage tail latency from clients and protecting the backing
//! storage from concurrent duplicate reads.
//!
//! # Overview
//!
//! Three mechanisms cooperate on the miss path:
//!
//! - [`MeteredReader`]: wraps a sequential byte source, tracks throughput
//!   against a measurement window and aborts an underperforming read early.
//! - [`HedgedFetcher`]: reads a resource through the metered reader; on a
//!   too-slow abort it pauses briefly (letting the storage layer stage the
//!   data into a faster tier) and retries once without the throughput guard.
//! - [`FetchCoalescer`]: collapses concurrent fetches for the same key into
//!   one physical read that runs detached from every caller, so an
//!   abandoned request never cancels work other waiters depend on.
//!
//! Completed payloads land in the [`SegmentCache`], a byte-budget LRU store,
//! and are re-served whole or as single-range slices by the HTTP front end.
//!
//! Data flow: key → cache lookup → (hit: return) | (miss: coalescer →
//! fetcher → metered reader → storage) → cache insert → return.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use segserve::{
//!     FsOpener, HedgedFetcher, HttpServer, SegmentCache, SegmentHandler, SegmentOpener,
//!     ServeMetrics, ServerConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> segserve::Result<()> {
//! let config = ServerConfig::default();
//! let metrics = Arc::new(ServeMetrics::new());
//! let cache = Arc::new(SegmentCache::new(config.cache_size_bytes));
//! let opener = Arc::new(FsOpener::new(&config.serve_dir)) as Arc<dyn SegmentOpener>;
//! let fetcher = Arc::new(HedgedFetcher::new(opener, &config, Arc::clone(&metrics)));
//! let handler = Arc::new(SegmentHandler::new(cache, fetcher, Arc::clone(&metrics)));
//!
//! HttpServer::new(config.listen_address.clone(), handler, metrics)
//!     .run()
//!     .await
//! # }
//! ```

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod metrics;
pub mod range;
pub mod reader;
pub mod server;

// Re-export commonly used types
pub use cache::{CacheStats, SegmentCache};
pub use coalesce::FetchCoalescer;
pub use config::ServerConfig;
pub use error::{Result, ServeError};
pub use fetch::{ByteSource, FsOpener, HedgedFetcher, SegmentOpener};
pub use handler::SegmentHandler;
pub use metrics::{MetricsSnapshot, ServeMetrics};
pub use range::ByteRange;
pub use reader::MeteredReader;
pub use server::HttpServer;
