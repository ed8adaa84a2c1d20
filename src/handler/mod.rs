//! Request handler module
//!
//! The static-file-serving capability that the isolation decorator wraps.

pub mod listing;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::{handle_request, RequestContext};
