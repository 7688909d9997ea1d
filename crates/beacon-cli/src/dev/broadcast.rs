//! Fan-out of build status to connected browser tabs.
//!
//! Each connected tab holds one mpsc channel; `broadcast` serializes a
//! message once and sends it to every channel. There is no buffering or
//! replay: a tab that connects mid-build sees only subsequent messages.
//! Per-name ordering is preserved because each orchestrator broadcasts
//! from a single task and the channels are FIFO.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::protocol::BuildStatus;

/// Per-client channel capacity. A tab that stops draining its channel
/// for this many messages is treated as gone.
const CLIENT_CHANNEL_CAPACITY: usize = 100;

/// Registry of connected push-channel clients.
#[derive(Default)]
pub struct Broadcaster {
    clients: RwLock<HashMap<usize, mpsc::Sender<String>>>,
    next_id: RwLock<usize>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly connected tab.
    ///
    /// Returns the client id and the receiving end of its channel.
    pub fn register(&self) -> (usize, mpsc::Receiver<String>) {
        let id = {
            let mut next = self.next_id.write();
            let id = *next;
            *next += 1;
            id
        };

        let (tx, rx) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    pub fn unregister(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Send a status message to every connected tab, verbatim.
    ///
    /// Clients whose channel is closed or full are dropped from the
    /// registry; a stuck tab must not stall the others. Sends never
    /// await, so the orchestrator's rebuild loop cannot be blocked by
    /// a tab that stopped draining its connection.
    pub async fn broadcast(&self, status: &BuildStatus) {
        let json = match serde_json::to_string(status) {
            Ok(json) => json,
            Err(err) => {
                tracing::error!("failed to encode build status: {err}");
                return;
            }
        };

        let clients = self.clients.read().clone();
        let mut dead = Vec::new();

        for (id, tx) in clients {
            match tx.try_send(json.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("client {id} is not draining its channel, dropping it");
                    dead.push(id);
                }
                Err(TrySendError::Closed(_)) => dead.push(id),
            }
        }

        for id in dead {
            tracing::debug!("dropping disconnected client {id}");
            self.unregister(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BuildReport;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_assigns_unique_ids() {
        let broadcaster = Broadcaster::new();
        let (id1, _rx1) = broadcaster.register();
        let (id2, _rx2) = broadcaster.register();

        assert_ne!(id1, id2);
        assert_eq!(broadcaster.client_count(), 2);

        broadcaster.unregister(id1);
        assert_eq!(broadcaster.client_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_client() {
        let broadcaster = Arc::new(Broadcaster::new());
        let (_id1, mut rx1) = broadcaster.register();
        let (_id2, mut rx2) = broadcaster.register();

        broadcaster.broadcast(&BuildStatus::started("app")).await;

        let msg1 = rx1.recv().await.unwrap();
        let msg2 = rx2.recv().await.unwrap();
        assert_eq!(msg1, msg2);
        assert!(msg1.contains(r#""name":"app""#));
    }

    #[tokio::test]
    async fn test_broadcast_preserves_per_name_order() {
        let broadcaster = Broadcaster::new();
        let (_id, mut rx) = broadcaster.register();

        broadcaster.broadcast(&BuildStatus::started("app")).await;
        broadcaster
            .broadcast(&BuildStatus::finished("app", BuildReport::clean()))
            .await;

        let first: BuildStatus = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        let second: BuildStatus = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert!(first.building);
        assert!(!second.building);
    }

    #[tokio::test]
    async fn test_stalled_client_does_not_block_broadcast() {
        let broadcaster = Broadcaster::new();
        // never drained: its channel fills up after CAPACITY messages
        let (_stuck_id, _stuck_rx) = broadcaster.register();
        let (_live_id, mut live_rx) = broadcaster.register();

        for _ in 0..=CLIENT_CHANNEL_CAPACITY {
            broadcaster.broadcast(&BuildStatus::started("app")).await;
            live_rx.recv().await.unwrap();
        }

        // the stuck client was dropped when its channel overflowed;
        // the live client saw every message without stalling
        assert_eq!(broadcaster.client_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_client_is_pruned_on_broadcast() {
        let broadcaster = Broadcaster::new();
        let (_id1, rx1) = broadcaster.register();
        let (_id2, _rx2) = broadcaster.register();

        drop(rx1);
        broadcaster.broadcast(&BuildStatus::started("app")).await;

        assert_eq!(broadcaster.client_count(), 1);
    }
}
