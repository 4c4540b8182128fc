//! Listening socket acquisition and release.
//!
//! The socket walks Unbound → Bound → Listening on `open` and reaches
//! Closed exactly once, either through `close` or by being dropped.

use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::StartupError;

/// Where the listening socket is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Unbound,
    Bound,
    Listening,
    Closed,
}

/// The bound, listening OS socket. Single-owner; released exactly once.
#[derive(Debug)]
pub struct ListeningSocket {
    addr: SocketAddr,
    backlog: u32,
    state: SocketState,
    inner: Option<TcpListener>,
}

impl ListeningSocket {
    /// Creates a socket, sets reuse-address, binds, and starts listening.
    ///
    /// A failure at any step releases whatever was acquired before it.
    /// Must run inside a tokio runtime: the listener registers with the
    /// I/O driver.
    pub fn open(cfg: &Config) -> Result<Self, StartupError> {
        let addr: SocketAddr =
            cfg.server
                .listen_addr
                .parse()
                .map_err(|_| StartupError::InvalidAddr {
                    addr: cfg.server.listen_addr.clone(),
                })?;

        let listener = match Self::acquire(addr, cfg.server.backlog) {
            Ok(listener) => listener,
            Err(e) => {
                error!(addr = %addr, error = %e, "socket bind failed");
                return Err(StartupError::from_io(addr, e));
            }
        };

        // Port 0 asks the OS to pick; report what it chose.
        let local = listener
            .local_addr()
            .map_err(|e| StartupError::from_io(addr, e))?;
        info!(addr = %local, backlog = cfg.server.backlog, "listening socket opened");

        Ok(Self {
            addr: local,
            backlog: cfg.server.backlog,
            state: SocketState::Listening,
            inner: Some(listener),
        })
    }

    fn acquire(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;

        socket.bind(addr)?;
        debug!(addr = %addr, "socket bound");

        let listener = socket.listen(backlog)?;
        debug!(addr = %addr, backlog, "socket listening");
        Ok(listener)
    }

    /// The address actually bound, with the OS-assigned port for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn backlog(&self) -> u32 {
        self.backlog
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    pub(crate) fn listener(&self) -> Option<&TcpListener> {
        self.inner.as_ref()
    }

    /// Releases the OS socket. Idempotent: calling it on an already-Closed
    /// socket is a no-op, not an error.
    pub fn close(&mut self) {
        if let Some(listener) = self.inner.take() {
            drop(listener);
            self.state = SocketState::Closed;
            info!(addr = %self.addr, "listening socket closed");
        }
    }
}

impl Drop for ListeningSocket {
    fn drop(&mut self) {
        self.close();
    }
}
