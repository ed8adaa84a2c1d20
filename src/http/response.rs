//! HTTP response building module
//!
//! Provides builders for each response shape the file handler emits. None of
//! them add the isolation headers; that happens once, in the service wrapper.

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED, LOCATION};
use hyper::{Response, StatusCode};

use super::escape_html;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Build 200 response for a file
pub fn build_file_response(
    data: Bytes,
    content_type: &str,
    last_modified: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(LAST_MODIFIED, last_modified)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(last_modified: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(LAST_MODIFIED, last_modified)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 301 redirect, used to add the trailing slash to directory URLs
pub fn build_redirect_response(location: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .header(CONTENT_LENGTH, 0)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build generic HTML response
pub fn build_html_response(content: String, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, HTML_CONTENT_TYPE)
        .header(CONTENT_LENGTH, content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build an HTML error page
///
/// `message` defaults to the status code's reason phrase. HEAD requests get
/// the headers of the page without its body.
pub fn build_error_response(
    status: StatusCode,
    message: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let page = render_error_page(status, message.unwrap_or(reason));
    let content_length = page.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(page)
    };

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, HTML_CONTENT_TYPE)
        .header(CONTENT_LENGTH, content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = status;
            fallback
        })
}

fn render_error_page(status: StatusCode, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>Error {code}</title>\n\
         </head>\n\
         <body>\n\
         <h1>{code} {reason}</h1>\n\
         <p>{message}.</p>\n\
         <p>{explanation}.</p>\n\
         </body>\n\
         </html>\n",
        code = status.as_u16(),
        reason = status.canonical_reason().unwrap_or("Error"),
        message = escape_html(message),
        explanation = explain(status),
    )
}

const fn explain(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "The request could not be understood",
        403 => "The server refuses to serve this path",
        404 => "No file or directory matches the requested URL",
        405 | 501 => "The server only supports GET and HEAD requests",
        _ => "The request could not be completed",
    }
}

/// Encode a response as HTTP/1.1 wire bytes, header names in title case
///
/// Used where hyper cannot write the response itself.
pub async fn encode_response(response: Response<Full<Bytes>>) -> Vec<u8> {
    let (parts, body) = response.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };

    let mut out = format!(
        "HTTP/1.1 {} {}\r\n",
        parts.status.as_u16(),
        parts.status.canonical_reason().unwrap_or("Unknown")
    )
    .into_bytes();
    for (name, value) in &parts.headers {
        out.extend_from_slice(title_case(name.as_str()).as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&body);
    out
}

/// `cross-origin-opener-policy` -> `Cross-Origin-Opener-Policy`
fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        out.push(if upper { c.to_ascii_uppercase() } else { c });
        upper = c == '-';
    }
    out
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_file_response_head_keeps_length() {
        let resp = build_file_response(Bytes::from_static(b"abcdef"), "text/css", "x", true);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_LENGTH], "6");
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/css");
        assert!(body_string(resp).await.is_empty());
    }

    #[test]
    fn test_redirect_response() {
        let resp = build_redirect_response("/docs/?q=1");
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[LOCATION], "/docs/?q=1");
        assert_eq!(resp.headers()[CONTENT_LENGTH], "0");
    }

    #[tokio::test]
    async fn test_error_page_escapes_message() {
        let resp = build_error_response(
            StatusCode::NOT_IMPLEMENTED,
            Some("Unsupported method ('<POST>')"),
            false,
        );
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(resp.headers()[CONTENT_TYPE], HTML_CONTENT_TYPE);
        let body = body_string(resp).await;
        assert!(body.contains("<h1>501 Not Implemented</h1>"));
        assert!(body.contains("&lt;POST&gt;"));
        assert!(!body.contains("<POST>"));
    }

    #[tokio::test]
    async fn test_error_page_head_has_no_body() {
        let resp = build_error_response(StatusCode::NOT_FOUND, None, true);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_ne!(resp.headers()[CONTENT_LENGTH], "0");
        assert!(body_string(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_encode_response_title_cases_names() {
        let mut resp = build_error_response(StatusCode::BAD_REQUEST, Some("Bad request syntax"), false);
        crate::http::apply_isolation_headers(resp.headers_mut());
        let wire = String::from_utf8(encode_response(resp).await).unwrap();

        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(wire.contains("\r\nContent-Type: text/html; charset=utf-8\r\n"));
        assert!(wire.contains("\r\nCross-Origin-Embedder-Policy: require-corp\r\n"));
        let (head, body) = wire.split_once("\r\n\r\n").unwrap();
        assert!(head.contains(&format!("Content-Length: {}", body.len())));
        assert!(body.contains("Bad request syntax"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("content-length"), "Content-Length");
        assert_eq!(title_case("server"), "Server");
    }
}
