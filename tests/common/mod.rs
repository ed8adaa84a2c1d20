//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::Path;

use coi_serve::{Config, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const ISOLATION_LINES: [&str; 3] = [
    "Cross-Origin-Opener-Policy: same-origin",
    "Cross-Origin-Embedder-Policy: require-corp",
    "Cross-Origin-Resource-Policy: cross-origin",
];

/// A response as it appeared on the wire
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    /// Header lines exactly as sent, without the trailing CRLF
    pub header_lines: Vec<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no header terminator");
        let head = String::from_utf8(raw[..split].to_vec()).unwrap();
        let body = raw[split + 4..].to_vec();

        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap();
        let status = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| panic!("bad status line: {status_line}"));

        Self {
            status,
            header_lines: lines.map(ToString::to_string).collect(),
            body,
        }
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_lines.iter().find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }

    /// Assert the three isolation headers are present once each, byte for byte
    pub fn assert_isolated(&self) {
        for expected in ISOLATION_LINES {
            let count = self
                .header_lines
                .iter()
                .filter(|l| l.as_str() == expected)
                .count();
            assert_eq!(
                count, 1,
                "expected exactly one `{expected}` (status {}), got headers {:?}",
                self.status, self.header_lines
            );
        }
    }
}

/// Loopback config on an ephemeral port serving `root`
pub fn test_config(root: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.server.host = "127.0.0.1".to_string();
    cfg.server.port = 0;
    cfg.serve.root = root.to_string_lossy().into_owned();
    cfg.logging.access_log = false;
    cfg
}

/// Start a server for `root` on an ephemeral loopback port
pub fn start_server(root: &Path) -> SocketAddr {
    start_with(test_config(root))
}

pub fn start_with(cfg: Config) -> SocketAddr {
    let server = Server::bind(cfg).unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

/// Write `raw` as-is and read until the server closes
pub async fn send_raw(addr: SocketAddr, raw: &[u8]) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    RawResponse::parse(&buf)
}

/// Send one request with `Connection: close` and read the whole response
pub async fn request(addr: SocketAddr, method: &str, path: &str, extra_headers: &[&str]) -> RawResponse {
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");
    for h in extra_headers {
        req.push_str(h);
        req.push_str("\r\n");
    }
    req.push_str("\r\n");
    send_raw(addr, req.as_bytes()).await
}

pub async fn get(addr: SocketAddr, path: &str) -> RawResponse {
    request(addr, "GET", path, &[]).await
}
