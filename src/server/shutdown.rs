//! Shutdown signaling and the drain that follows it.
//!
//! The signal is a watch channel carrying the forced-close deadline:
//! `None` until shutdown is requested, `Some(deadline)` after. Repeat
//! requests can only tighten the deadline, never clear or extend it, so
//! the signal is set-once in effect and is never reset.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tracing::info;

use crate::conn::registry::ConnectionRegistry;

/// How often the drain re-checks the live-connection population.
const DRAIN_POLL: Duration = Duration::from_millis(20);

/// Bounded window for force-closed handlers to finish deregistering.
const FORCED_SETTLE: Duration = Duration::from_secs(1);

/// How a completed shutdown resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every live connection finished on its own before the deadline.
    Graceful,
    /// The deadline passed; this many connections were force-closed.
    Forced { forced_connections: usize },
}

impl std::fmt::Display for ShutdownOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownOutcome::Graceful => f.write_str("graceful"),
            ShutdownOutcome::Forced { .. } => f.write_str("forced"),
        }
    }
}

/// Requests shutdown. Cloneable; handed out by the server before `run`.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<Option<Instant>>>,
}

/// Observes a shutdown request. One clone per observing task.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<Option<Instant>>,
}

/// Creates a connected handle/signal pair.
pub fn channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(None);
    (ShutdownHandle { tx: Arc::new(tx) }, ShutdownSignal { rx })
}

impl ShutdownHandle {
    /// Requests shutdown with a forced-close deadline of `grace` from now.
    ///
    /// Idempotent: a second request while one is in progress has no effect
    /// beyond tightening the deadline when the new one is earlier.
    pub fn initiate(&self, grace: Duration) {
        let deadline = Instant::now() + grace;
        self.tx.send_modify(|current| match current {
            Some(existing) if *existing <= deadline => {}
            _ => {
                info!(grace_ms = grace.as_millis() as u64, "shutdown initiated");
                *current = Some(deadline);
            }
        });
    }
}

impl ShutdownSignal {
    /// Whether shutdown has been requested.
    pub fn is_set(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// The forced-close deadline, once shutdown has been requested.
    pub fn deadline(&self) -> Option<Instant> {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested. A dropped handle counts as a
    /// request, so nothing waits on a signal that can no longer fire.
    pub async fn triggered(&mut self) {
        let _ = self.rx.wait_for(|deadline| deadline.is_some()).await;
    }
}

/// Waits for the live set to empty, forcing stragglers at the deadline.
///
/// The caller releases the listening socket afterwards, on both paths.
pub(crate) async fn drain(registry: &ConnectionRegistry, deadline: Instant) -> ShutdownOutcome {
    while Instant::now() < deadline {
        if registry.is_empty().await {
            return ShutdownOutcome::Graceful;
        }
        sleep(DRAIN_POLL).await;
    }
    if registry.is_empty().await {
        return ShutdownOutcome::Graceful;
    }

    let forced = registry.force_all().await;
    info!(connections = forced, "shutdown deadline passed, forcing close");

    // Forced handlers jump straight to Closed; give them a bounded window
    // to deregister, then report regardless. Exit is never held up past it.
    let settle_until = Instant::now() + FORCED_SETTLE;
    while !registry.is_empty().await && Instant::now() < settle_until {
        sleep(DRAIN_POLL).await;
    }

    ShutdownOutcome::Forced {
        forced_connections: forced,
    }
}
