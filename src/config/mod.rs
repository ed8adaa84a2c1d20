// Configuration module entry point
// Loads the immutable startup configuration and the per-process shared state

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::ServerError;

pub use state::AppState;
pub use types::{
    Config, LoggingConfig, ServeConfig, ServerConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_ROOT,
};

/// Optional override file, looked up in the working directory with any supported extension
pub const CONFIG_FILE: &str = "coi-serve";

/// Prefix for environment overrides, e.g. `COI_SERVE_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "COI_SERVE";

impl Config {
    /// Load configuration from defaults, the optional override file and the environment
    ///
    /// With neither source present the result equals `Config::default()`.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self, ::config::ConfigError> {
        let defaults = Self::default();
        let settings = ::config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("server.server_name", defaults.server.server_name)?
            .set_default("serve.root", defaults.serve.root)?
            .set_default("serve.index_files", defaults.serve.index_files)?
            .set_default("serve.directory_listing", defaults.serve.directory_listing)?
            .set_default("logging.access_log", defaults.logging.access_log)?
            .set_default("logging.access_log_format", defaults.logging.access_log_format)?
            .add_source(::config::File::with_name(config_path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|e| ServerError::InvalidAddress(format!("{addr}: {e}")))
    }
}
