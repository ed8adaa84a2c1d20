// Application state module
// Immutable per-process state shared by every connection

use std::path::{Path, PathBuf};

use super::types::Config;
use crate::error::ServerError;
use crate::logger::AccessLogFormat;

/// Application state
///
/// Built once before binding and shared through `Arc`; nothing in here is
/// mutated after startup.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    /// Canonical document root, resolved against the working directory at startup
    pub root: PathBuf,
    /// Parsed access log format, `None` when access logging is off
    pub access_log: Option<AccessLogFormat>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let root = canonical_root(Path::new(&config.serve.root))?;
        let access_log = config
            .logging
            .access_log
            .then(|| AccessLogFormat::parse(&config.logging.access_log_format));
        Ok(Self {
            config,
            root,
            access_log,
        })
    }
}

fn canonical_root(path: &Path) -> Result<PathBuf, ServerError> {
    let canonical = path
        .canonicalize()
        .map_err(|source| ServerError::DocumentRoot {
            path: path.to_path_buf(),
            source,
        })?;

    if !canonical.is_dir() {
        return Err(ServerError::DocumentRoot {
            path: path.to_path_buf(),
            source: std::io::Error::other("not a directory"),
        });
    }

    Ok(canonical)
}
