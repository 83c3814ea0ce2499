//! The set of live peer connections, keyed by a connection-scoped identifier.

use crate::message::Message;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Identifies one connection for its lifetime. Two connections to the same address get
/// distinct ids.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PeerId(u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeerInfo {
    pub id: PeerId,
    pub addr: SocketAddr,
    pub direction: Direction,
}

struct PeerHandle {
    info: PeerInfo,
    outbox: mpsc::UnboundedSender<Message>,
}

/// Arena of connection handles. Sending only enqueues onto the peer's outbox, so a slow or
/// dead peer never holds up the others.
#[derive(Default)]
pub struct PeerSet {
    next_id: AtomicU64,
    peers: Mutex<HashMap<PeerId, PeerHandle>>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(
        &self,
        addr: SocketAddr,
        direction: Direction,
        outbox: mpsc::UnboundedSender<Message>,
    ) -> PeerId {
        let id = PeerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let info = PeerInfo {
            id,
            addr,
            direction,
        };
        self.peers.lock().await.insert(id, PeerHandle { info, outbox });
        id
    }

    pub async fn remove(&self, id: PeerId) -> Option<PeerInfo> {
        self.peers.lock().await.remove(&id).map(|handle| handle.info)
    }

    /// Queues `message` for one peer. Returns false if the peer is gone.
    pub async fn send_to(&self, id: PeerId, message: Message) -> bool {
        let peers = self.peers.lock().await;
        match peers.get(&id) {
            Some(handle) => handle.outbox.send(message).is_ok(),
            None => {
                debug!(peer = %id, "dropping message for departed peer");
                false
            }
        }
    }

    /// Queues `message` for every peer and returns how many accepted it.
    pub async fn broadcast(&self, message: Message) -> usize {
        let peers = self.peers.lock().await;
        let mut delivered = 0;
        for (id, handle) in peers.iter() {
            match handle.outbox.send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(peer = %id, event = message.event(), "broadcast to closed peer"),
            }
        }
        debug!(event = message.event(), delivered, "broadcast");
        delivered
    }

    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn list(&self) -> Vec<PeerInfo> {
        let mut peers: Vec<PeerInfo> = self
            .peers
            .lock()
            .await
            .values()
            .map(|handle| handle.info.clone())
            .collect();
        peers.sort_by_key(|info| info.id);
        peers
    }
}
