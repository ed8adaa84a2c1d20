mod common;

use common::{get, request, send_raw, start_server, start_with, test_config};
use coi_serve::{Config, Server, ServerError};

const INDEX: &str = "<!DOCTYPE html><title>demo</title><script src=\"app.js\"></script>";

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX).unwrap();
    std::fs::write(dir.path().join("app.js"), "new SharedArrayBuffer(8);").unwrap();
    std::fs::create_dir(dir.path().join("pkg")).unwrap();
    std::fs::write(dir.path().join("pkg").join("mod.wasm"), [0u8, 0x61, 0x73, 0x6d]).unwrap();
    dir
}

#[tokio::test]
async fn index_html_is_served_isolated() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = get(addr, "/index.html").await;
    assert_eq!(resp.status, 200);
    assert!(resp.header("content-type").unwrap().starts_with("text/html"));
    assert_eq!(resp.body, INDEX.as_bytes());
    resp.assert_isolated();
}

#[tokio::test]
async fn missing_file_is_404_and_isolated() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = get(addr, "/does-not-exist.txt").await;
    assert_eq!(resp.status, 404);
    resp.assert_isolated();
}

#[tokio::test]
async fn head_gets_headers_without_body() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = request(addr, "HEAD", "/index.html", &[]).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-length"), Some(INDEX.len().to_string().as_str()));
    assert!(resp.body.is_empty());
    resp.assert_isolated();

    let resp = request(addr, "HEAD", "/nope", &[]).await;
    assert_eq!(resp.status, 404);
    assert!(resp.body.is_empty());
    resp.assert_isolated();
}

#[tokio::test]
async fn unsupported_method_is_501_and_isolated() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = request(addr, "POST", "/index.html", &["Content-Length: 0"]).await;
    assert_eq!(resp.status, 501);
    resp.assert_isolated();
}

#[tokio::test]
async fn root_serves_index_file() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = get(addr, "/").await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, INDEX.as_bytes());
    resp.assert_isolated();
}

#[tokio::test]
async fn directory_redirect_and_listing_are_isolated() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = get(addr, "/pkg").await;
    assert_eq!(resp.status, 301);
    assert_eq!(resp.header("location"), Some("/pkg/"));
    resp.assert_isolated();

    let resp = get(addr, "/pkg/").await;
    assert_eq!(resp.status, 200);
    let body = String::from_utf8(resp.body.clone()).unwrap();
    assert!(body.contains("Directory listing for /pkg/"));
    assert!(body.contains("href=\"mod.wasm\""));
    resp.assert_isolated();
}

#[tokio::test]
async fn wasm_and_js_content_types() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = get(addr, "/pkg/mod.wasm").await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some("application/wasm"));
    assert_eq!(resp.body, [0u8, 0x61, 0x73, 0x6d]);
    resp.assert_isolated();

    let resp = get(addr, "/app.js").await;
    assert_eq!(resp.header("content-type"), Some("text/javascript"));
}

#[tokio::test]
async fn not_modified_is_isolated() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = request(
        addr,
        "GET",
        "/app.js",
        &["If-Modified-Since: Fri, 01 Jan 2100 00:00:00 GMT"],
    )
    .await;
    assert_eq!(resp.status, 304);
    assert!(resp.body.is_empty());
    resp.assert_isolated();
}

#[tokio::test]
async fn traversal_stays_inside_root() {
    let outer = tempfile::tempdir().unwrap();
    std::fs::write(outer.path().join("secret.txt"), "secret").unwrap();
    std::fs::create_dir(outer.path().join("www")).unwrap();
    let addr = start_server(&outer.path().join("www"));

    for path in ["/../secret.txt", "/%2e%2e/secret.txt", "/..%2fsecret.txt"] {
        let resp = get(addr, path).await;
        assert_eq!(resp.status, 404, "path {path}");
        resp.assert_isolated();
    }
}

#[tokio::test]
async fn concurrent_requests_all_isolated() {
    let dir = site();
    let addr = start_server(dir.path());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let path = if i % 2 == 0 { "/index.html" } else { "/missing" };
            tokio::spawn(async move { get(addr, path).await })
        })
        .collect();

    for handle in handles {
        let resp = handle.await.unwrap();
        assert!(resp.status == 200 || resp.status == 404);
        resp.assert_isolated();
    }
}

#[tokio::test]
async fn bind_fails_when_port_taken() {
    let dir = site();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let mut cfg = Config::default();
    cfg.server.host = "127.0.0.1".to_string();
    cfg.server.port = port;
    cfg.serve.root = dir.path().to_string_lossy().into_owned();

    match Server::bind(cfg) {
        Err(ServerError::Bind { addr, .. }) => assert_eq!(addr.port(), port),
        other => panic!("expected bind failure, got {other:?}"),
    }
}

#[tokio::test]
async fn run_until_stops_accepting() {
    let dir = site();
    let server = Server::bind(test_config(dir.path())).unwrap();
    let addr = server.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(server.run_until(async {
        let _ = rx.await;
    }));

    assert_eq!(get(addr, "/index.html").await.status, 200);

    tx.send(()).unwrap();
    task.await.unwrap().unwrap();
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn malformed_request_line_is_400_and_isolated() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = send_raw(addr, b"GARBAGE\r\n\r\n").await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.header("connection"), Some("close"));
    assert!(String::from_utf8_lossy(&resp.body).contains("Bad request syntax"));
    resp.assert_isolated();
}

#[tokio::test]
async fn unsupported_version_is_isolated() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = send_raw(addr, b"GET / HTTP/9.9\r\nHost: localhost\r\n\r\n").await;
    assert_eq!(resp.status, 505);
    resp.assert_isolated();
}

#[tokio::test]
async fn bad_content_length_is_400_and_isolated() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = request(addr, "GET", "/index.html", &["Content-Length: nope"]).await;
    assert_eq!(resp.status, 400);
    resp.assert_isolated();
}

#[tokio::test]
async fn server_still_serves_after_malformed_request() {
    let dir = site();
    let addr = start_server(dir.path());

    assert_eq!(send_raw(addr, b"\x00\x01\x02\r\n\r\n").await.status, 400);
    let resp = get(addr, "/index.html").await;
    assert_eq!(resp.status, 200);
    resp.assert_isolated();
}

#[cfg(unix)]
#[tokio::test]
async fn backslash_segment_is_not_skipped() {
    let dir = site();
    let addr = start_server(dir.path());

    let resp = get(addr, "/nope%5C/index.html").await;
    assert_eq!(resp.status, 404);
    resp.assert_isolated();
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_out_of_root_is_403_and_isolated() {
    let outer = tempfile::tempdir().unwrap();
    std::fs::write(outer.path().join("secret.txt"), "secret").unwrap();
    let www = outer.path().join("www");
    std::fs::create_dir(&www).unwrap();
    std::os::unix::fs::symlink(outer.path().join("secret.txt"), www.join("leak.txt")).unwrap();
    let addr = start_server(&www);

    let resp = get(addr, "/leak.txt").await;
    assert_eq!(resp.status, 403);
    assert!(!String::from_utf8_lossy(&resp.body).contains("secret"));
    resp.assert_isolated();
}

#[tokio::test]
async fn disabled_listing_is_403_and_isolated() {
    let dir = site();
    let mut cfg = test_config(dir.path());
    cfg.serve.directory_listing = false;
    let addr = start_with(cfg);

    let resp = get(addr, "/pkg/").await;
    assert_eq!(resp.status, 403);
    resp.assert_isolated();
}
