// Request head pre-check
//
// hyper answers unparseable requests on its own, bypassing the service stack.
// The head is read and validated here first so that every rejection is
// written by us, with the isolation headers.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::body::Bytes;
use hyper::{StatusCode, Uri};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};

/// Largest request head accepted before answering 431
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Same header count limit hyper applies by default
pub const MAX_HEADERS: usize = 100;

/// Outcome of reading the first request head on a connection
#[derive(Debug, PartialEq, Eq)]
pub enum RequestHead {
    /// A well-formed head; the bytes read so far, to be replayed to hyper
    Complete(Bytes),
    /// The peer closed the connection without sending anything
    Closed,
    /// A head hyper would reject; answer with this status and message
    Rejected(StatusCode, &'static str),
}

/// Read from `io` until a full request head is buffered, then validate it
pub async fn read_head<R>(io: &mut R) -> io::Result<RequestHead>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    loop {
        let n = io.read(&mut chunk).await?;
        if n == 0 {
            return Ok(if buf.is_empty() {
                RequestHead::Closed
            } else {
                RequestHead::Rejected(StatusCode::BAD_REQUEST, "Bad request syntax")
            });
        }
        buf.extend_from_slice(&chunk[..n]);

        match check_head(&buf) {
            Some(Ok(())) => return Ok(RequestHead::Complete(Bytes::from(buf))),
            Some(Err((status, message))) => return Ok(RequestHead::Rejected(status, message)),
            None if buf.len() >= MAX_HEAD_BYTES => {
                return Ok(RequestHead::Rejected(
                    StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
                    "Request header fields too large",
                ));
            }
            None => {}
        }
    }
}

type Rejection = (StatusCode, &'static str);

/// `None` while the head is still incomplete
fn check_head(buf: &[u8]) -> Option<Result<(), Rejection>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    match req.parse(buf) {
        Ok(httparse::Status::Partial) => None,
        Ok(httparse::Status::Complete(_)) => Some(check_parsed(&req)),
        Err(httparse::Error::TooManyHeaders) => Some(Err((
            StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            "Too many headers",
        ))),
        Err(httparse::Error::Version) => Some(Err(version_rejection(buf))),
        Err(_) => Some(Err((StatusCode::BAD_REQUEST, "Bad request syntax"))),
    }
}

/// Checks hyper performs after httparse succeeds
fn check_parsed(req: &httparse::Request<'_, '_>) -> Result<(), Rejection> {
    let bad = (StatusCode::BAD_REQUEST, "Bad request syntax");

    if req.path.is_some_and(|p| p.parse::<Uri>().is_err()) {
        return Err(bad);
    }

    let mut content_length = None;
    for header in req.headers.iter() {
        if header.name.eq_ignore_ascii_case("transfer-encoding") {
            let last_coding = std::str::from_utf8(header.value)
                .ok()
                .and_then(|v| v.rsplit(',').next())
                .map(str::trim);
            if !last_coding.is_some_and(|c| c.eq_ignore_ascii_case("chunked")) {
                return Err(bad);
            }
            continue;
        }
        if !header.name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        let value = std::str::from_utf8(header.value)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or(bad)?;
        if content_length.is_some_and(|prev| prev != value) {
            return Err(bad);
        }
        content_length = Some(value);
    }
    Ok(())
}

/// `HTTP/2.0` and up get 505, anything unreadable gets 400
fn version_rejection(buf: &[u8]) -> Rejection {
    let line_end = buf.iter().position(|b| *b == b'\r' || *b == b'\n').unwrap_or(buf.len());
    let major = std::str::from_utf8(&buf[..line_end])
        .ok()
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|v| v.strip_prefix("HTTP/"))
        .and_then(|v| v.split_once('.'))
        .and_then(|(major, minor)| {
            minor.parse::<u32>().ok()?;
            major.parse::<u32>().ok()
        });

    match major {
        Some(m) if m >= 2 => (StatusCode::HTTP_VERSION_NOT_SUPPORTED, "Invalid HTTP version"),
        _ => (StatusCode::BAD_REQUEST, "Bad request version"),
    }
}

/// An IO wrapper that yields `prefix` before reading from `inner`
#[derive(Debug)]
pub struct Rewind<T> {
    prefix: Bytes,
    inner: T,
}

impl<T> Rewind<T> {
    pub const fn new(inner: T, prefix: Bytes) -> Self {
        Self { prefix, inner }
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for Rewind<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.prefix.is_empty() && buf.remaining() > 0 {
            let n = self.prefix.len().min(buf.remaining());
            let head = self.prefix.split_to(n);
            buf.put_slice(&head);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for Rewind<T> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
