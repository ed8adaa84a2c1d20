//! Static file serving module
//!
//! Maps request paths onto the document root and produces the response:
//! file contents, index files, directory listings, trailing-slash redirects,
//! conditional 304s and error pages.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Request-scoped failure, always answered with an error page
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("File not found")]
    NotFound,
    #[error("Forbidden")]
    Forbidden,
    #[error("No permission to list directory")]
    ListingDenied,
}

impl ServeError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::ListingDenied => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    /// Classify a filesystem error; anything unexpected is logged and reported as 404
    fn from_io(path: &Path, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Forbidden,
            _ => {
                logger::log_warning(&format!("Cannot access '{}': {err}", path.display()));
                Self::NotFound
            }
        }
    }
}

/// Serve a request against the document root
pub async fn serve(ctx: &RequestContext, state: &AppState) -> Response<Full<Bytes>> {
    match resolve(ctx, state).await {
        Ok(response) => response,
        Err(e) => http::build_error_response(e.status(), Some(&e.to_string()), ctx.is_head),
    }
}

async fn resolve(
    ctx: &RequestContext,
    state: &AppState,
) -> Result<Response<Full<Bytes>>, ServeError> {
    let target = translate_path(&state.root, &ctx.path).ok_or(ServeError::NotFound)?;
    let metadata = fs::metadata(&target)
        .await
        .map_err(|e| ServeError::from_io(&target, &e))?;
    ensure_contained(&state.root, &target, &ctx.path).await?;

    if !metadata.is_dir() {
        // "/file.txt/" names a directory that does not exist
        if ctx.path.ends_with('/') {
            return Err(ServeError::NotFound);
        }
        return serve_file(ctx, &state.root, &target).await;
    }

    if !ctx.path.ends_with('/') {
        let location = match &ctx.query {
            Some(q) => format!("{}/?{q}", ctx.path),
            None => format!("{}/", ctx.path),
        };
        return Ok(http::build_redirect_response(&location));
    }

    for index_file in &state.config.serve.index_files {
        let index_path = target.join(index_file);
        if fs::metadata(&index_path).await.is_ok_and(|m| m.is_file()) {
            return serve_file(ctx, &state.root, &index_path).await;
        }
    }

    if !state.config.serve.directory_listing {
        return Err(ServeError::Forbidden);
    }

    let display_path = decode_path(&ctx.path);
    match listing::render_listing(&display_path, &target).await {
        Ok(html) => Ok(http::build_html_response(html, ctx.is_head)),
        Err(e) => {
            logger::log_warning(&format!(
                "Cannot list directory '{}': {e}",
                target.display()
            ));
            Err(ServeError::ListingDenied)
        }
    }
}

/// Serve a single regular file, honouring `If-Modified-Since`
async fn serve_file(
    ctx: &RequestContext,
    root: &Path,
    file_path: &Path,
) -> Result<Response<Full<Bytes>>, ServeError> {
    ensure_contained(root, file_path, &ctx.path).await?;

    let metadata = fs::metadata(file_path)
        .await
        .map_err(|e| ServeError::from_io(file_path, &e))?;
    let last_modified = metadata.modified().ok();

    if let Some(modified) = last_modified {
        if cache::is_not_modified(
            ctx.if_modified_since.as_deref(),
            ctx.has_if_none_match,
            modified,
        ) {
            return Ok(http::build_304_response(&cache::format_http_date(modified)));
        }
    }

    let content = fs::read(file_path)
        .await
        .map_err(|e| ServeError::from_io(file_path, &e))?;

    let last_modified = last_modified.map(cache::format_http_date).unwrap_or_default();
    Ok(http::build_file_response(
        Bytes::from(content),
        mime::content_type_for(file_path),
        &last_modified,
        ctx.is_head,
    ))
}

/// Translate a URL path into a filesystem path under `root`
///
/// The path is percent-decoded and split into segments. Empty, `.` and `..`
/// segments are dropped, so the result never names anything outside `root`
/// lexically; symlinks are handled separately by [`ensure_contained`].
///
/// Returns `None` when a segment cannot be a single path component on this
/// platform (NUL anywhere, `\` or `:` on Windows). Such a request names no file.
pub fn translate_path(root: &Path, url_path: &str) -> Option<PathBuf> {
    let decoded = decode_path(url_path);
    let mut path = root.to_path_buf();
    for segment in decoded.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        if !is_single_component(segment) {
            return None;
        }
        path.push(segment);
    }
    Some(path)
}

#[cfg(windows)]
fn is_single_component(segment: &str) -> bool {
    !segment.contains(['\\', ':', '\0'])
}

#[cfg(not(windows))]
fn is_single_component(segment: &str) -> bool {
    !segment.contains('\0')
}

/// Percent-decode a URL path, replacing invalid UTF-8 sequences
pub fn decode_path(url_path: &str) -> String {
    let bytes = urlencoding::decode_binary(url_path.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Reject targets whose real location (after symlinks) is outside the root
async fn ensure_contained(root: &Path, target: &Path, url_path: &str) -> Result<(), ServeError> {
    let canonical = fs::canonicalize(target)
        .await
        .map_err(|e| ServeError::from_io(target, &e))?;
    if canonical.starts_with(root) {
        Ok(())
    } else {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {url_path} -> {}",
            canonical.display()
        ));
        Err(ServeError::Forbidden)
    }
}
