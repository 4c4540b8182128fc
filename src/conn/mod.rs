//! Per-connection lifecycle.
//!
//! Each accepted peer gets its own [`handler::Connection`], driven by its
//! own task; the shared [`registry::ConnectionRegistry`] tracks which
//! connections are live so shutdown can account for them.
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │    Open     │ ← read / dispatch / write cycles
//!        └──────┬──────┘
//!               │ EOF, handler close, timeout, I/O error,
//!               │ or shutdown observed between cycles
//!               ▼
//!        ┌─────────────┐
//!        │  Draining   │ ← bounded grace to flush and half-close
//!        └──────┬──────┘
//!               │
//!               ▼
//!        ┌─────────────┐
//!        │   Closed    │ ← deregistered, socket released
//!        └─────────────┘
//! ```
//!
//! The forced-close channel (fired at the shutdown deadline) jumps a
//! connection from whatever state it is in directly to Closed.

pub mod handler;
pub mod registry;

pub use handler::{Connection, ConnectionState};
pub use registry::ConnectionRegistry;

/// Why a connection reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The peer finished, or the handler hook asked to close.
    Normal,
    /// A read or write exceeded its configured timeout.
    Timeout,
    /// An I/O error on the peer socket.
    Error,
    /// Force-closed at the shutdown deadline.
    Forced,
    /// Rejected at accept time because the server was at capacity.
    CapacityExceeded,
}

impl std::fmt::Display for CloseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CloseOutcome::Normal => "normal",
            CloseOutcome::Timeout => "timeout",
            CloseOutcome::Error => "error",
            CloseOutcome::Forced => "forced",
            CloseOutcome::CapacityExceeded => "capacity_exceeded",
        };
        f.write_str(s)
    }
}
