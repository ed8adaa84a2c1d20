//! Request dispatch module
//!
//! Entry point for HTTP request processing: method validation, extraction of
//! the conditional-request headers, and dispatch to the file handler.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, SERVER};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;

/// Request context encapsulating information needed for request processing
#[derive(Debug)]
pub struct RequestContext {
    /// Raw (still percent-encoded) request path
    pub path: String,
    pub query: Option<String>,
    pub is_head: bool,
    pub if_modified_since: Option<String>,
    pub has_if_none_match: bool,
}

impl RequestContext {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let headers = req.headers();
        Self {
            path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
            is_head: req.method() == Method::HEAD,
            if_modified_since: headers
                .get(IF_MODIFIED_SINCE)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
            has_if_none_match: headers.contains_key(IF_NONE_MATCH),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type is accepted.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let mut response = match check_http_method(req.method()) {
        Some(resp) => resp,
        None => {
            let ctx = RequestContext::from_request(&req);
            static_files::serve(&ctx, &state).await
        }
    };

    if let Ok(server_name) = HeaderValue::from_str(&state.config.server.server_name) {
        response.headers_mut().insert(SERVER, server_name);
    }

    Ok(response)
}

/// Reject everything but GET and HEAD with 501, as a plain file server does
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match method {
        &Method::GET | &Method::HEAD => None,
        _ => {
            let message = format!("Unsupported method ('{method}')");
            Some(http::build_error_response(
                StatusCode::NOT_IMPLEMENTED,
                Some(&message),
                false,
            ))
        }
    }
}
