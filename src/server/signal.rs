// Signal handling module
//
// The server has no in-protocol shutdown; it stops on:
// - SIGINT  (Ctrl+C)
// - SIGTERM (kill <pid>)
//
// Handlers are installed by `ShutdownSignal::register`, which must run before
// the process announces it is serving. Until then the default disposition
// applies and a signal kills the process outright.

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Installed termination handlers, waiting to be received
#[derive(Debug)]
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl ShutdownSignal {
    /// Install the handlers now; must be called inside a Tokio runtime
    #[cfg(unix)]
    pub fn register() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(windows)]
    pub fn register() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Resolve once a termination signal arrives, yielding its name
    #[cfg(unix)]
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(windows)]
    pub async fn recv(mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "SIGINT"
    }
}
