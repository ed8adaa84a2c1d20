//! coi-serve
//!
//! A static file server for the working directory that makes every response
//! cross-origin isolated:
//!
//! ```text
//! Cross-Origin-Opener-Policy: same-origin
//! Cross-Origin-Embedder-Policy: require-corp
//! Cross-Origin-Resource-Policy: cross-origin
//! ```
//!
//! Pages served this way can use `SharedArrayBuffer` and other APIs gated on
//! `crossOriginIsolated`.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use config::Config;
pub use error::ServerError;
pub use server::Server;
