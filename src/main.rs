//! Segment server entry point
//!
//! Loads configuration, sets up logging, wires the cache, fetcher and
//! handler together, and runs the HTTP listener.

use anyhow::Context;
use segserve::{
    FsOpener, HedgedFetcher, HttpServer, SegmentCache, SegmentHandler, SegmentOpener,
    ServeMetrics, ServerConfig,
};
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    // Config file path from the command line; defaults apply without one.
    let mut config = match env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "loading configuration");
            ServerConfig::from_file(&path).context("failed to load configuration")?
        }
        None => {
            info!("no config file given, using built-in defaults");
            ServerConfig::default()
        }
    };

    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;

    info!(
        listen_address = %config.listen_address,
        serve_dir = %config.serve_dir,
        cache_size_bytes = config.cache_size_bytes,
        min_speed_mbps = config.min_speed_mbps,
        speed_check_ms = config.speed_check_ms,
        hedge_delay_ms = config.hedge_delay_ms,
        "starting segment server"
    );

    if !Path::new(&config.serve_dir).exists() {
        warn!(serve_dir = %config.serve_dir, "serve directory does not exist, creating it");
        std::fs::create_dir_all(&config.serve_dir).context("failed to create serve directory")?;
    }

    let metrics = Arc::new(ServeMetrics::new());
    let cache = Arc::new(SegmentCache::new(config.cache_size_bytes));
    let opener = Arc::new(FsOpener::new(&config.serve_dir)) as Arc<dyn SegmentOpener>;
    let fetcher = Arc::new(HedgedFetcher::new(opener, &config, Arc::clone(&metrics)));
    let handler = Arc::new(SegmentHandler::new(cache, fetcher, Arc::clone(&metrics)));

    HttpServer::new(config.listen_address.clone(), handler, metrics)
        .run()
        .await
        .context("server failed")?;

    Ok(())
}
