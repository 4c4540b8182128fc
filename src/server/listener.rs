//! The accept loop: turns the listening socket into a stream of
//! independently handled connections.
//!
//! The loop never touches connection I/O itself. It accepts, assigns an
//! id, registers, and spawns; isolation between connections follows from
//! never awaiting a handler inline.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::conn::CloseOutcome;
use crate::conn::handler::Connection;
use crate::conn::registry::ConnectionRegistry;
use crate::handler::Handler;
use crate::server::shutdown::ShutdownSignal;

/// Pause after a transient accept failure before retrying.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accepts connections until the shutdown signal is set or the listening
/// socket fails fatally. Each accepted connection runs on its own task.
pub(crate) async fn run(
    listener: &TcpListener,
    cfg: Arc<Config>,
    handler: Arc<dyn Handler>,
    registry: ConnectionRegistry,
    mut shutdown: ShutdownSignal,
) -> anyhow::Result<()> {
    let next_id = AtomicU64::new(1);
    let conn_signal = shutdown.clone();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.triggered() => {
                info!("accept loop stopping");
                return Ok(());
            }

            res = listener.accept() => match res {
                Ok((stream, peer)) => {
                    let id = next_id.fetch_add(1, Ordering::Relaxed);

                    let Some(force_rx) = registry
                        .try_register(id, peer, cfg.server.max_connections)
                        .await
                    else {
                        warn!(
                            peer = %peer,
                            limit = cfg.server.max_connections,
                            outcome = %CloseOutcome::CapacityExceeded,
                            "connection rejected"
                        );
                        drop(stream);
                        continue;
                    };

                    info!(id, peer = %peer, "connection accepted");

                    let conn = Connection::new(stream, id, peer);
                    let handler = Arc::clone(&handler);
                    let cfg = Arc::clone(&cfg);
                    let registry = registry.clone();
                    let signal = conn_signal.clone();
                    tokio::spawn(async move {
                        conn.run(handler, cfg, registry, signal, force_rx).await;
                    });
                }
                Err(e) if is_transient(&e) => {
                    warn!(error = %e, "transient accept failure, backing off");
                    sleep(ACCEPT_RETRY_DELAY).await;
                }
                Err(e) => {
                    return Err(e).context("listening socket failed");
                }
            },
        }
    }
}

/// Whether an accept error is worth retrying.
///
/// Per-connection failures surfaced through accept (a peer that reset
/// before we got to it) and temporary resource exhaustion must not take
/// the whole server down.
pub fn is_transient(e: &io::Error) -> bool {
    if matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    ) {
        return true;
    }

    // Descriptor and buffer exhaustion have no stable ErrorKind.
    #[cfg(unix)]
    {
        const ENFILE: i32 = 23;
        const EMFILE: i32 = 24;
        const ENOBUFS: i32 = 105;
        if let Some(code) = e.raw_os_error() {
            return code == EMFILE || code == ENFILE || code == ENOBUFS;
        }
    }

    false
}
