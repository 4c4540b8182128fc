//! Shared registry of live connections.
//!
//! Exists for shutdown accounting, not for mutating connection data: the
//! accept loop inserts, each handler removes itself on its terminal
//! transition, and the shutdown coordinator watches the population and
//! force-closes stragglers at the deadline.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{RwLock, oneshot};

/// State a registered connection can be in. Terminal connections are not
/// in the registry at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Open,
    Draining,
}

#[derive(Debug)]
struct Entry {
    peer: SocketAddr,
    state: LiveState,
    force_tx: Option<oneshot::Sender<()>>,
}

/// Registry shared between the accept loop, every connection handler,
/// and the shutdown coordinator. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<u64, Entry>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection if the population is below `limit`.
    ///
    /// The capacity check and the insert happen under one lock, so two
    /// racing accepts cannot both take the last slot. Returns the
    /// connection's forced-close receiver, or `None` when at capacity.
    pub async fn try_register(
        &self,
        id: u64,
        peer: SocketAddr,
        limit: usize,
    ) -> Option<oneshot::Receiver<()>> {
        let mut map = self.inner.write().await;
        if map.len() >= limit {
            return None;
        }
        let (force_tx, force_rx) = oneshot::channel();
        map.insert(
            id,
            Entry {
                peer,
                state: LiveState::Open,
                force_tx: Some(force_tx),
            },
        );
        Some(force_rx)
    }

    /// Records that a connection has begun its orderly close.
    pub async fn mark_draining(&self, id: u64) {
        if let Some(entry) = self.inner.write().await.get_mut(&id) {
            entry.state = LiveState::Draining;
        }
    }

    /// Removes a connection on its terminal transition. The second of two
    /// calls for the same id finds nothing and does nothing.
    pub async fn deregister(&self, id: u64) {
        self.inner.write().await.remove(&id);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// State of a registered connection, if still live.
    pub async fn state(&self, id: u64) -> Option<LiveState> {
        self.inner.read().await.get(&id).map(|e| e.state)
    }

    /// Peer address of a registered connection, if still live.
    pub async fn peer(&self, id: u64) -> Option<SocketAddr> {
        self.inner.read().await.get(&id).map(|e| e.peer)
    }

    /// Fires every registered connection's forced-close channel and
    /// returns how many were signaled. Entries stay registered until
    /// their handler observes the signal and deregisters itself.
    pub async fn force_all(&self) -> usize {
        let mut map = self.inner.write().await;
        let mut forced = 0;
        for entry in map.values_mut() {
            if let Some(tx) = entry.force_tx.take() {
                if tx.send(()).is_ok() {
                    forced += 1;
                }
            }
        }
        forced
    }
}
