// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

use super::connection::spawn_connection;
use crate::config::AppState;
use crate::logger;

/// Pause after a failed accept so a persistent error does not spin the loop
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Accept loop: one spawned task per connection
///
/// Accept errors (e.g. descriptor exhaustion) are logged, the loop backs off
/// briefly and keeps going. Connections already spawned are not awaited on
/// shutdown.
pub async fn accept_loop<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let backoff = tokio::select! {
            accept_result = listener.accept() => on_accept(accept_result, &state),
            () = &mut shutdown => break,
        };

        if let Some(delay) = backoff {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = &mut shutdown => break,
            }
        }
    }
}

/// Dispatch one accept result; returns how long to wait before accepting again
fn on_accept(
    result: io::Result<(TcpStream, SocketAddr)>,
    state: &Arc<AppState>,
) -> Option<Duration> {
    match result {
        Ok((stream, peer_addr)) => {
            spawn_connection(stream, peer_addr, Arc::clone(state));
            None
        }
        Err(e) => {
            logger::log_error(&format!("Failed to accept connection: {e}"));
            Some(ACCEPT_ERROR_BACKOFF)
        }
    }
}
