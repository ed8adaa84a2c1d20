//! Server module
//!
//! Binds the listener and runs the accept loop. Every connection is served by
//! the static file handler wrapped in the cross-origin isolation decorator.

pub mod connection;
pub mod head;
pub mod listener;
pub mod signal;

// `loop` is a keyword, hence the path attribute
#[path = "loop.rs"]
pub mod server_loop;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::{AppState, Config};
use crate::error::ServerError;

pub use listener::bind_listener;
pub use signal::ShutdownSignal;

/// A bound, not yet serving, static file server
#[derive(Debug)]
pub struct Server {
    listener: std::net::TcpListener,
    state: Arc<AppState>,
}

impl Server {
    /// Resolve the document root and bind the configured address
    ///
    /// Fails with [`ServerError::Bind`] if the port is taken; there is no
    /// retry and no fallback port.
    pub fn bind(config: Config) -> Result<Self, ServerError> {
        let state = AppState::new(config)?;
        let addr = state.config.get_socket_addr()?;
        let listener = bind_listener(addr)?;
        Ok(Self {
            listener,
            state: Arc::new(state),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub const fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Serve forever
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let listener = tokio::net::TcpListener::from_std(self.listener)?;
        server_loop::accept_loop(listener, self.state, shutdown).await;
        Ok(())
    }
}
