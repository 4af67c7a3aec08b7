//! HTTP front end for the segment server
//!
//! A tokio/hyper HTTP/1.1 listener that turns request paths into resource
//! keys, serves complete payloads through the [`SegmentHandler`], and frames
//! single-range requests as partial-content responses. Also exposes the
//! runtime counters as plain text under `/-/stats`.

use crate::error::{Result, ServeError};
use crate::handler::SegmentHandler;
use crate::metrics::ServeMetrics;
use crate::range::ByteRange;
use bytes::Bytes;
use http::{header, Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct ServerState {
    handler: Arc<SegmentHandler>,
    metrics: Arc<ServeMetrics>,
}

/// HTTP/1.1 server serving segments under a configured listen address
pub struct HttpServer {
    listen_address: String,
    state: Arc<ServerState>,
}

impl HttpServer {
    pub fn new(
        listen_address: String,
        handler: Arc<SegmentHandler>,
        metrics: Arc<ServeMetrics>,
    ) -> Self {
        HttpServer {
            listen_address,
            state: Arc::new(ServerState { handler, metrics }),
        }
    }

    /// Bind the configured address and accept connections forever
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.listen_address).await?;
        self.serve(listener).await
    }

    /// Accept connections forever on an already-bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!(address = %addr, "server listening");
        }

        loop {
            let (stream, peer) = listener.accept().await?;
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service =
                    service_fn(move |req: Request<Incoming>| route(Arc::clone(&state), req));
                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(peer = %peer, error = %e, "connection closed with error");
                }
            });
        }
    }
}

async fn route<B>(
    state: Arc<ServerState>,
    req: Request<B>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::GET {
        let response = Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header(header::ALLOW, "GET")
            .body(Full::new(Bytes::from_static(b"Method Not Allowed\n")))
            .expect("static response");
        return Ok(response);
    }

    let path = req.uri().path().to_string();
    if path == "/-/stats" {
        return Ok(stats_response(&state));
    }

    let key = match sanitize_path(&path) {
        Some(key) => key,
        None => {
            warn!(path = %path, "rejected path");
            return Ok(text_response(StatusCode::FORBIDDEN, "Forbidden\n"));
        }
    };

    let cancel = CancellationToken::new();
    let data = match state.handler.serve(&key, &cancel).await {
        Ok(data) => data,
        Err(ServeError::NotFound) => {
            debug!(key = %key, "not found");
            return Ok(text_response(StatusCode::NOT_FOUND, "Not Found\n"));
        }
        Err(e) => {
            error!(key = %key, error = %e, "failed to serve segment");
            return Ok(text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error\n",
            ));
        }
    };

    let range_header = req
        .headers()
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or("").to_string());

    Ok(payload_response(&key, data, range_header.as_deref()))
}

/// Frame a complete payload as a 200, 206 or 416 response
fn payload_response(key: &str, data: Bytes, range_header: Option<&str>) -> Response<Full<Bytes>> {
    let total_len = data.len() as u64;
    let content_type = content_type_for(key);

    let range = match range_header {
        None => None,
        Some(raw) => match ByteRange::resolve(raw, total_len) {
            Ok(range) => range,
            Err(e) => {
                debug!(key, range = raw, error = %e, "unsatisfiable range");
                return Response::builder()
                    .status(StatusCode::RANGE_NOT_SATISFIABLE)
                    .header(
                        header::CONTENT_RANGE,
                        ByteRange::unsatisfiable_content_range(total_len),
                    )
                    .body(Full::new(Bytes::from_static(b"Range Not Satisfiable\n")))
                    .expect("static response");
            }
        },
    };

    match range {
        Some(range) => Response::builder()
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_RANGE, range.to_content_range(total_len))
            .body(Full::new(range.slice(&data)))
            .expect("response from resolved range"),
        None => Response::builder()
            .status(StatusCode::OK)
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::CONTENT_TYPE, content_type)
            .body(Full::new(data))
            .expect("static response"),
    }
}

fn stats_response(state: &ServerState) -> Response<Full<Bytes>> {
    let cache = state.handler.cache_stats();
    let mut body = state.metrics.snapshot().render_text();
    body.push_str(&format!(
        "segserve_cache_entries {}\nsegserve_cache_used_bytes {}\nsegserve_cache_max_bytes {}\n",
        cache.entries, cache.used_bytes, cache.max_bytes
    ));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .expect("static response")
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .expect("static response")
}

/// Clean a request path into a resource key confined to the serve root
///
/// Empty segments and `.` are dropped; `..` pops a segment. Returns `None`
/// for the bare root and for paths that would climb out of the root.
pub fn sanitize_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

fn content_type_for(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("mpd") => "application/dash+xml",
        Some("ts") => "video/mp2t",
        Some("mp4") | Some("m4s") | Some("m4v") => "video/mp4",
        Some("m4a") => "audio/mp4",
        Some("vtt") => "text/vtt",
        _ => "application/octet-stream",
    }
}
