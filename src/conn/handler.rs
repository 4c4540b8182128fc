use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::conn::CloseOutcome;
use crate::conn::registry::ConnectionRegistry;
use crate::handler::{ConnInfo, Handler, Reply};
use crate::server::shutdown::ShutdownSignal;

const READ_BUF_SIZE: usize = 4096;

/// One accepted peer session, owned by its handler task.
pub struct Connection {
    stream: TcpStream,
    info: ConnInfo,
    buffer: BytesMut,
    state: ConnectionState,
}

/// Lifecycle of a connection. `Draining` carries the outcome the
/// connection will close with once its grace period resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Draining(CloseOutcome),
    Closed(CloseOutcome),
}

impl Connection {
    pub fn new(stream: TcpStream, id: u64, peer: SocketAddr) -> Self {
        Self {
            stream,
            info: ConnInfo {
                id,
                peer,
                opened_at: Instant::now(),
            },
            buffer: BytesMut::with_capacity(READ_BUF_SIZE),
            state: ConnectionState::Open,
        }
    }

    pub fn info(&self) -> &ConnInfo {
        &self.info
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drives the connection to its terminal state and returns the close
    /// outcome.
    ///
    /// The connection deregisters itself exactly once, on the terminal
    /// transition; the socket handle is released when `self` drops. A
    /// fault here ends this connection and nothing else.
    pub async fn run(
        mut self,
        handler: Arc<dyn Handler>,
        cfg: Arc<Config>,
        registry: ConnectionRegistry,
        shutdown: ShutdownSignal,
        mut force_rx: oneshot::Receiver<()>,
    ) -> CloseOutcome {
        loop {
            match self.state {
                ConnectionState::Open => {
                    self.state = self
                        .serve_cycle(&*handler, &cfg, &shutdown, &mut force_rx)
                        .await;
                    if let ConnectionState::Draining(_) = self.state {
                        registry.mark_draining(self.info.id).await;
                    }
                }

                ConnectionState::Draining(outcome) => {
                    // The forced-close signal skips the rest of the grace
                    // period: deadline escalation goes straight to Closed.
                    self.state = tokio::select! {
                        biased;

                        _ = &mut force_rx => ConnectionState::Closed(CloseOutcome::Forced),
                        _ = Self::drain(&mut self.stream, self.info.id, cfg.drain_grace()) => {
                            ConnectionState::Closed(outcome)
                        }
                    };
                }

                ConnectionState::Closed(outcome) => {
                    registry.deregister(self.info.id).await;
                    info!(
                        id = self.info.id,
                        peer = %self.info.peer,
                        outcome = %outcome,
                        "connection closed"
                    );
                    return outcome;
                }
            }
        }
    }

    /// One read/dispatch/write cycle while Open.
    async fn serve_cycle(
        &mut self,
        handler: &dyn Handler,
        cfg: &Config,
        shutdown: &ShutdownSignal,
        force_rx: &mut oneshot::Receiver<()>,
    ) -> ConnectionState {
        self.buffer.clear();

        let read = tokio::select! {
            biased;

            _ = &mut *force_rx => {
                return ConnectionState::Closed(CloseOutcome::Forced);
            }

            read = timeout(cfg.read_timeout(), self.stream.read_buf(&mut self.buffer)) => read,
        };

        let n = match read {
            Err(_) => {
                debug!(id = self.info.id, "read timed out");
                return ConnectionState::Draining(CloseOutcome::Timeout);
            }
            Ok(Err(e)) => {
                warn!(id = self.info.id, error = %e, "read failed");
                return ConnectionState::Draining(CloseOutcome::Error);
            }
            Ok(Ok(0)) => return ConnectionState::Draining(CloseOutcome::Normal),
            Ok(Ok(n)) => n,
        };

        match handler.handle(&self.info, &self.buffer[..n]) {
            Reply::Send(bytes) => {
                match timeout(cfg.write_timeout(), self.stream.write_all(&bytes)).await {
                    Err(_) => {
                        debug!(id = self.info.id, "write timed out");
                        return ConnectionState::Draining(CloseOutcome::Timeout);
                    }
                    Ok(Err(e)) => {
                        warn!(id = self.info.id, error = %e, "write failed");
                        return ConnectionState::Draining(CloseOutcome::Error);
                    }
                    Ok(Ok(())) => {}
                }
            }
            Reply::Close => return ConnectionState::Draining(CloseOutcome::Normal),
        }

        // Shutdown is observed between cycles, never mid-write. A forced
        // close that landed while we were writing wins over draining.
        if force_rx.try_recv().is_ok() {
            ConnectionState::Closed(CloseOutcome::Forced)
        } else if shutdown.is_set() {
            ConnectionState::Draining(CloseOutcome::Normal)
        } else {
            ConnectionState::Open
        }
    }

    /// Flush and half-close within the drain grace period. Failures here
    /// are already on the way out and only logged.
    async fn drain(stream: &mut TcpStream, id: u64, grace: Duration) {
        let done = timeout(grace, async {
            stream.flush().await?;
            stream.shutdown().await
        })
        .await;

        match done {
            Err(_) => debug!(id, "drain grace elapsed before flush completed"),
            Ok(Err(e)) => debug!(id, error = %e, "flush while draining failed"),
            Ok(Ok(())) => {}
        }
    }
}
