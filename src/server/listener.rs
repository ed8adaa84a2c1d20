// Listener module
// Creates the listening socket; a port that is already taken is a hard error

use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener};

use crate::error::ServerError;

/// Backlog queue size for pending connections
const LISTEN_BACKLOG: i32 = 128;

/// Bind a non-blocking `TcpListener` on `addr`.
///
/// `SO_REUSEPORT` is deliberately left off: a second server on the same port
/// must fail to start rather than silently share the port. `SO_REUSEADDR` is
/// only set on Unix, where it merely allows rebinding over `TIME_WAIT`
/// sockets; on Windows it would allow stealing a port in active use.
///
/// The listener is returned as a std type so binding works outside a Tokio
/// runtime; it is converted when the accept loop starts.
pub fn bind_listener(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    create_socket(addr).map_err(|source| ServerError::Bind { addr, source })
}

fn create_socket(addr: SocketAddr) -> std::io::Result<TcpListener> {
    // Create socket with appropriate domain (IPv4 or IPv6)
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    #[cfg(unix)]
    socket.set_reuse_address(true)?;

    // Set non-blocking mode for async compatibility
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket.into())
}
