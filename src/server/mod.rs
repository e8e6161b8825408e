//! Thin HTTP surface over the scheduling bridge.
//!
//! The routing, parameter parsing, and status mapping here are plumbing:
//! the bridge's whole contract toward this module is `handle(delay)`. The
//! one responsibility that matters is validation order — a bad
//! `delayInSeconds` is rejected with `400` before any task is created.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::core::{AppResult, SchedulingBridge};

/// Accept connections forever, serving each over HTTP/1.
///
/// Every connection is spawned onto the surrounding I/O runtime, so a slow
/// request never occupies the accept loop.
///
/// # Errors
///
/// Returns only if the accept loop itself fails.
pub async fn serve(listener: TcpListener, bridge: Arc<SchedulingBridge>) -> AppResult<()> {
    info!(addr = %listener.local_addr()?, "http server accepting connections");

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let bridge = Arc::clone(&bridge);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let bridge = Arc::clone(&bridge);
                async move { Ok::<_, Infallible>(route(req, &bridge).await) }
            });

            if let Err(e) = hyper::server::conn::http1::Builder::new()
                .serve_connection(io, service)
                .await
            {
                debug!(peer = %peer, error = %e, "connection ended with error");
            }
        });
    }
}

async fn route(
    req: Request<hyper::body::Incoming>,
    bridge: &SchedulingBridge,
) -> Response<Full<Bytes>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/hello") => hello(req.uri().query(), bridge).await,
        (&Method::GET, "/health") => json(StatusCode::OK, r#"{"ok":true}"#),
        _ => text(StatusCode::NOT_FOUND, "not found"),
    }
}

/// `GET /hello?delayInSeconds=<n>`: greet back after at least `n` seconds.
async fn hello(query: Option<&str>, bridge: &SchedulingBridge) -> Response<Full<Bytes>> {
    let delay_secs = match parse_delay(query) {
        Ok(secs) => secs,
        Err(msg) => return text(StatusCode::BAD_REQUEST, &msg),
    };

    match bridge.handle(Duration::from_secs(delay_secs)).await {
        Ok(body) => text(StatusCode::OK, body),
        Err(e) => {
            error!(error = %e, delay_secs, "bridge failed to produce a greeting");
            text(StatusCode::INTERNAL_SERVER_ERROR, "request failed")
        }
    }
}

/// Parse `delayInSeconds` from the raw query string. Absent parameter or
/// absent query defaults to zero; anything non-numeric or negative is
/// rejected here, before a task exists.
fn parse_delay(query: Option<&str>) -> Result<u64, String> {
    let Some(query) = query else {
        return Ok(0);
    };

    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        if parts.next() == Some("delayInSeconds") {
            let raw = parts.next().unwrap_or("");
            return raw
                .parse::<u64>()
                .map_err(|_| format!("delayInSeconds must be a non-negative integer, got `{raw}`"));
        }
    }

    Ok(0)
}

fn respond(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(body));
    *res.status_mut() = status;
    res.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static(content_type),
    );
    res
}

fn text(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    respond(status, "text/plain; charset=utf-8", Bytes::from(body.to_string()))
}

fn json(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    respond(status, "application/json", Bytes::from_static(body.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_query_defaults_to_zero() {
        assert_eq!(parse_delay(None), Ok(0));
        assert_eq!(parse_delay(Some("")), Ok(0));
        assert_eq!(parse_delay(Some("other=1")), Ok(0));
    }

    #[test]
    fn parses_valid_delay() {
        assert_eq!(parse_delay(Some("delayInSeconds=0")), Ok(0));
        assert_eq!(parse_delay(Some("delayInSeconds=7")), Ok(7));
        assert_eq!(parse_delay(Some("a=b&delayInSeconds=2&c=d")), Ok(2));
    }

    #[test]
    fn rejects_negative_and_non_numeric_delay() {
        assert!(parse_delay(Some("delayInSeconds=-1")).is_err());
        assert!(parse_delay(Some("delayInSeconds=abc")).is_err());
        assert!(parse_delay(Some("delayInSeconds=")).is_err());
        assert!(parse_delay(Some("delayInSeconds=1.5")).is_err());
    }
}
