//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the file
//! handler: response builders, MIME inference, date validators and the
//! cross-origin isolation decorator.

pub mod cache;
pub mod isolation;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use isolation::{apply_isolation_headers, CrossOriginIsolation, ISOLATION_HEADERS};
pub use response::{
    build_304_response, build_error_response, build_file_response, build_html_response,
    build_redirect_response, encode_response,
};

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
