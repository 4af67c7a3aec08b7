//! End-to-end tests over a real socket
//!
//! Boots the full server against a temporary serve directory and speaks
//! plain HTTP/1.1 over a TcpStream.

use segserve::{
    FsOpener, HedgedFetcher, HttpServer, SegmentCache, SegmentHandler, SegmentOpener,
    ServeMetrics, ServerConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn start_server(dir: &TempDir) -> SocketAddr {
    let mut config = ServerConfig::default();
    config.cache_size_bytes = 1024 * 1024;

    let metrics = Arc::new(ServeMetrics::new());
    let cache = Arc::new(SegmentCache::new(config.cache_size_bytes));
    let opener = Arc::new(FsOpener::new(dir.path())) as Arc<dyn SegmentOpener>;
    let fetcher = Arc::new(HedgedFetcher::new(opener, &config, Arc::clone(&metrics)));
    let handler = Arc::new(SegmentHandler::new(cache, fetcher, Arc::clone(&metrics)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(addr.to_string(), handler, metrics);
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    addr
}

/// Issue one GET and return (status, raw header block, body)
async fn http_get(addr: SocketAddr, path: &str, range: Option<&str>) -> (u16, String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut request = format!("GET {} HTTP/1.1\r\nHost: test\r\n", path);
    if let Some(range) = range {
        request.push_str(&format!("Range: {}\r\n", range));
    }
    request.push_str("Connection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("missing header terminator");
    let head = String::from_utf8(raw[..split].to_vec()).unwrap();
    let body = raw[split + 4..].to_vec();

    let status: u16 = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .expect("missing status code");

    (status, head, body)
}

#[tokio::test]
async fn test_get_full_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("seg1.ts"), b"hello segment payload").unwrap();
    let addr = start_server(&dir).await;

    let (status, head, body) = http_get(addr, "/seg1.ts", None).await;
    assert_eq!(status, 200);
    assert!(head.contains("accept-ranges: bytes") || head.contains("Accept-Ranges: bytes"));
    assert_eq!(body, b"hello segment payload");
}

#[tokio::test]
async fn test_get_byte_range() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("seg1.ts"), b"0123456789").unwrap();
    let addr = start_server(&dir).await;

    let (status, head, body) = http_get(addr, "/seg1.ts", Some("bytes=2-5")).await;
    assert_eq!(status, 206);
    assert!(head.contains("bytes 2-5/10"));
    assert_eq!(body, b"2345");
}

#[tokio::test]
async fn test_get_unsatisfiable_range() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("seg1.ts"), b"0123456789").unwrap();
    let addr = start_server(&dir).await;

    let (status, head, _) = http_get(addr, "/seg1.ts", Some("bytes=100-200")).await;
    assert_eq!(status, 416);
    assert!(head.contains("bytes */10"));
}

#[tokio::test]
async fn test_get_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(&dir).await;

    let (status, _, _) = http_get(addr, "/absent.ts", None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_nested_path_and_repeat_hits_cache() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("v1")).unwrap();
    std::fs::write(dir.path().join("v1/seg1.ts"), b"nested bytes").unwrap();
    let addr = start_server(&dir).await;

    let (status, _, body) = http_get(addr, "/v1/seg1.ts", None).await;
    assert_eq!(status, 200);
    assert_eq!(body, b"nested bytes");

    let (status, _, body) = http_get(addr, "/v1/seg1.ts", None).await;
    assert_eq!(status, 200);
    assert_eq!(body, b"nested bytes");

    let (status, _, stats) = http_get(addr, "/-/stats", None).await;
    assert_eq!(status, 200);
    let stats = String::from_utf8(stats).unwrap();
    assert!(stats.contains("segserve_cache_hits_total 1"));
    assert!(stats.contains("segserve_physical_fetches_total 1"));
}

#[tokio::test]
async fn test_traversal_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(&dir).await;

    let (status, _, _) = http_get(addr, "/../outside.ts", None).await;
    assert_eq!(status, 403);

    let (status, _, _) = http_get(addr, "/", None).await;
    assert_eq!(status, 403);
}
