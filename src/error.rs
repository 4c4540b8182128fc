//! Error types for server startup.
//!
//! Startup errors are fatal to acquiring the listening socket and are
//! surfaced to the caller, which decides whether to retry or abort; the
//! core never retries them on its own. Connection-level failures are not
//! errors at this level at all: they are contained inside the affected
//! connection and reported as its close outcome.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Why the listening socket could not be acquired.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The configured listen address does not parse as `host:port`.
    #[error("invalid listen address {addr:?}")]
    InvalidAddr { addr: String },

    /// Another process already holds the address.
    #[error("address already in use: {addr}")]
    AddressInUse { addr: SocketAddr, source: io::Error },

    /// Binding a privileged port without the rights for it.
    #[error("permission denied binding {addr}")]
    PermissionDenied { addr: SocketAddr, source: io::Error },

    /// Any other failure while creating, binding, or listening.
    #[error("failed to bind {addr}")]
    Bind { addr: SocketAddr, source: io::Error },
}

impl StartupError {
    pub(crate) fn from_io(addr: SocketAddr, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::AddrInUse => StartupError::AddressInUse { addr, source },
            io::ErrorKind::PermissionDenied => StartupError::PermissionDenied { addr, source },
            _ => StartupError::Bind { addr, source },
        }
    }
}
