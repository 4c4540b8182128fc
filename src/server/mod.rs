//! Server assembly: socket lifecycle, accept loop, and shutdown.
//!
//! # Lifecycle
//!
//! ```text
//!   Server::open          Server::run
//!   ┌────────────┐   ┌──────────────────────────────────────────┐
//!   │ acquire    │   │ accept loop ──► spawn handler per peer   │
//!   │ socket     ├──►│      │                                   │
//!   └────────────┘   │      ▼ shutdown signal set               │
//!                    │ drain live set (graceful or forced)      │
//!                    │      │                                   │
//!                    │      ▼                                   │
//!                    │ release socket, report outcome           │
//!                    └──────────────────────────────────────────┘
//! ```

pub mod listener;
pub mod shutdown;
pub mod socket;

pub use shutdown::{ShutdownHandle, ShutdownOutcome, ShutdownSignal};
pub use socket::{ListeningSocket, SocketState};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::Config;
use crate::conn::registry::ConnectionRegistry;
use crate::error::StartupError;
use crate::handler::Handler;

/// A TCP connection server bound to its listening socket.
///
/// [`open`](Server::open) acquires the socket; [`run`](Server::run)
/// serves until shutdown is requested through the [`ShutdownHandle`]
/// and resolves to how the shutdown went.
pub struct Server {
    socket: ListeningSocket,
    cfg: Arc<Config>,
    registry: ConnectionRegistry,
    handle: ShutdownHandle,
    signal: ShutdownSignal,
}

impl Server {
    /// Binds the listening socket for `cfg`. Fails without side effects:
    /// nothing stays acquired on error.
    pub fn open(cfg: Arc<Config>) -> Result<Self, StartupError> {
        let socket = ListeningSocket::open(&cfg)?;
        let (handle, signal) = shutdown::channel();
        Ok(Self {
            socket,
            cfg,
            registry: ConnectionRegistry::new(),
            handle,
            signal,
        })
    }

    /// The bound address, with the OS-assigned port when configured as 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr()
    }

    /// A handle for requesting shutdown; clones freely.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    /// The live-connection registry, shared with the accept loop and
    /// every handler.
    pub fn registry(&self) -> ConnectionRegistry {
        self.registry.clone()
    }

    /// Accepts and serves connections until shutdown is requested, then
    /// drains the live set, releases the socket, and reports the outcome.
    ///
    /// Consumes the server so it can be spawned; keep the
    /// [`ShutdownHandle`] to stop it.
    pub async fn run(mut self, handler: Arc<dyn Handler>) -> anyhow::Result<ShutdownOutcome> {
        let accept_result = {
            let listener = self
                .socket
                .listener()
                .context("listening socket already closed")?;

            listener::run(
                listener,
                Arc::clone(&self.cfg),
                handler,
                self.registry.clone(),
                self.signal.clone(),
            )
            .await
        };

        // The accept loop has stopped, by signal or by fatal error; the
        // drain settles whatever is still in flight. Without a signaled
        // deadline the configured grace bounds the wait.
        let deadline = self
            .signal
            .deadline()
            .unwrap_or_else(|| tokio::time::Instant::now() + self.cfg.shutdown_grace());

        let outcome = shutdown::drain(&self.registry, deadline).await;
        self.socket.close();
        info!(outcome = %outcome, "shutdown complete");

        accept_result?;
        Ok(outcome)
    }
}
