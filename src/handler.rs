//! The application protocol hook.
//!
//! The server core reads opaque bytes and writes opaque bytes; everything
//! protocol-shaped happens behind [`Handler`]. This is the sole extension
//! point for protocol semantics.

use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;

/// Metadata for one accepted connection, handed to the [`Handler`] hook
/// alongside each chunk of payload bytes.
#[derive(Debug, Clone)]
pub struct ConnInfo {
    /// Monotonically assigned id, unique for the lifetime of the server.
    pub id: u64,
    /// Peer address as reported by accept.
    pub peer: SocketAddr,
    /// When the connection was accepted.
    pub opened_at: Instant,
}

/// What the application wants done with the bytes it was handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Write these bytes back to the peer, then keep reading.
    Send(Bytes),
    /// Close the connection without a response.
    Close,
}

/// Application protocol logic, invoked once per chunk read from a peer.
///
/// Implementations must be cheap to call or hand their work off
/// elsewhere: the per-connection loop awaits nothing while the hook runs,
/// and replies are written back in call order on that connection.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, conn: &ConnInfo, payload: &[u8]) -> Reply;
}

impl<F> Handler for F
where
    F: Fn(&ConnInfo, &[u8]) -> Reply + Send + Sync + 'static,
{
    fn handle(&self, conn: &ConnInfo, payload: &[u8]) -> Reply {
        self(conn, payload)
    }
}

/// Echoes every chunk straight back to the peer.
#[derive(Debug, Default)]
pub struct EchoHandler;

impl Handler for EchoHandler {
    fn handle(&self, _conn: &ConnInfo, payload: &[u8]) -> Reply {
        Reply::Send(Bytes::copy_from_slice(payload))
    }
}
