// Connection handling module
// Serves one accepted TCP connection through the isolated file handler

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use http_body_util::Full;
use hyper::body::{Body as _, Bytes, Incoming};
use hyper::header::{HeaderName, HeaderValue, CONNECTION, DATE, REFERER, SERVER, USER_AGENT};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, Version};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::head::{self, RequestHead, Rewind};
use crate::config::AppState;
use crate::handler;
use crate::http::{self, cache, CrossOriginIsolation};
use crate::logger::{self, AccessLogEntry};

/// Time allowed for the client to send a complete request head
pub const HEAD_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a rejected connection is drained after the reply is sent
const REJECT_LINGER: Duration = Duration::from_secs(2);

/// Handle a single connection in a spawned task.
///
/// The request head is validated before hyper sees it, so malformed requests
/// are answered here with the isolation headers. Connections carry a single
/// request, which keeps that check in front of every request.
///
/// Headers are written in title case so the isolation headers go out
/// exactly as `Cross-Origin-Opener-Policy` etc.
pub fn spawn_connection(mut stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let buffered = match timeout(HEAD_READ_TIMEOUT, head::read_head(&mut stream)).await {
            Ok(Ok(RequestHead::Complete(buffered))) => buffered,
            Ok(Ok(RequestHead::Rejected(status, message))) => {
                reject(&mut stream, status, message, &state).await;
                return;
            }
            Ok(Ok(RequestHead::Closed)) | Err(_) => return,
            Ok(Err(err)) => {
                logger::log_connection_error(&err);
                return;
            }
        };

        let io = TokioIo::new(Rewind::new(stream, buffered));

        let service = CrossOriginIsolation::new(service_fn(move |req: Request<Incoming>| {
            let state = Arc::clone(&state);
            async move { serve_logged(req, peer_addr, state).await }
        }));

        let mut builder = http1::Builder::new();
        builder.title_case_headers(true).keep_alive(false);

        if let Err(err) = builder.serve_connection(io, service).await {
            logger::log_connection_error(&err);
        }
    });
}

/// Answer a request head hyper would refuse, then close
async fn reject(stream: &mut TcpStream, status: StatusCode, message: &str, state: &AppState) {
    logger::log_error(&format!("code {}, message {message}", status.as_u16()));

    let mut response = http::build_error_response(status, Some(message), false);
    http::apply_isolation_headers(response.headers_mut());
    let headers = response.headers_mut();
    if let Ok(server) = HeaderValue::from_str(&state.config.server.server_name) {
        headers.insert(SERVER, server);
    }
    if let Ok(date) = HeaderValue::from_str(&cache::format_http_date(SystemTime::now())) {
        headers.insert(DATE, date);
    }
    headers.insert(CONNECTION, HeaderValue::from_static("close"));

    let wire = http::encode_response(response).await;
    if let Err(err) = stream.write_all(&wire).await {
        logger::log_connection_error(&err);
        return;
    }
    if stream.shutdown().await.is_err() {
        return;
    }

    // unread request bytes would turn the close into a reset and lose the reply
    let mut sink = [0u8; 4096];
    let _ = timeout(REJECT_LINGER, async {
        while matches!(stream.read(&mut sink).await, Ok(n) if n > 0) {}
    })
    .await;
}

/// Run the file handler and write the access log line for the exchange
async fn serve_logged(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let Some(format) = state.access_log.clone() else {
        return handler::handle_request(req, state).await;
    };

    let started = Instant::now();
    let mut entry = access_entry(&req, peer_addr);
    let response = handler::handle_request(req, state).await?;

    entry.status = response.status().as_u16();
    entry.body_bytes = response.body().size_hint().exact().filter(|n| *n > 0);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    logger::log_access(&entry, &format);

    Ok(response)
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        Version::HTTP_10 => "1.0",
        Version::HTTP_09 => "0.9",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_entry_from_request() {
        let req = Request::get("/pkg/app.js?v=1")
            .version(Version::HTTP_10)
            .header(USER_AGENT, "curl/8.0")
            .body(())
            .unwrap();

        let entry = access_entry(&req, "10.0.0.7:51000".parse().unwrap());
        assert_eq!(entry.remote_addr, "10.0.0.7");
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.path, "/pkg/app.js");
        assert_eq!(entry.query.as_deref(), Some("v=1"));
        assert_eq!(entry.http_version, "1.0");
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(entry.referer, None);
    }
}
