//! Cross-origin isolation decorator
//!
//! Browsers only grant `SharedArrayBuffer` and high-resolution timers to
//! documents that are cross-origin isolated. That state is reached through
//! three response headers, which this module stamps onto every response
//! produced by the wrapped service, whatever its status.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::service::Service;
use hyper::{Request, Response};

/// The fixed header set, in wire order
pub const ISOLATION_HEADERS: [(&str, &str); 3] = [
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-embedder-policy", "require-corp"),
    ("cross-origin-resource-policy", "cross-origin"),
];

/// Set the isolation headers on a header map
///
/// Existing values under the same names are replaced, so each header ends up
/// present exactly once.
pub fn apply_isolation_headers(headers: &mut HeaderMap) {
    for (name, value) in ISOLATION_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}

/// `Service` wrapper that decorates every response of the inner service
///
/// # Examples
/// ```
/// use std::convert::Infallible;
/// use coi_serve::http::isolation::CrossOriginIsolation;
/// use hyper::service::{service_fn, Service};
/// use hyper::{Request, Response};
///
/// let svc = CrossOriginIsolation::new(service_fn(|_req: Request<String>| async {
///     Ok::<_, Infallible>(Response::new(String::new()))
/// }));
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let resp = rt.block_on(svc.call(Request::new(String::new()))).unwrap();
/// assert_eq!(resp.headers()["cross-origin-embedder-policy"], "require-corp");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CrossOriginIsolation<S> {
    inner: S,
}

impl<S> CrossOriginIsolation<S> {
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CrossOriginIsolation<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = IsolatedResponse<S::Future>;

    fn call(&self, req: Request<ReqBody>) -> Self::Future {
        IsolatedResponse {
            inner: Box::pin(self.inner.call(req)),
        }
    }
}

/// Response future returned by [`CrossOriginIsolation`]
pub struct IsolatedResponse<F> {
    inner: Pin<Box<F>>,
}

impl<F, B, E> Future for IsolatedResponse<F>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx).map_ok(|mut response| {
            apply_isolation_headers(response.headers_mut());
            response
        })
    }
}
