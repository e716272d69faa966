//! Connection Registry
//!
//! Tracks one outbound channel per connected client and routes broadcasts.
//! Owns no game data.

use std::collections::BTreeMap;

use tokio::sync::mpsc;

use crate::game::state::ConnectionId;
use crate::network::protocol::ServerMessage;

/// The recipient set of a broadcast, made explicit so the relay's contract
/// is unambiguous: the same operation serves "everyone", "everyone but the
/// sender", and the join handshake's direct replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    /// Every connected client, sender included.
    All,
    /// Every connected client except the named one.
    AllExcept(ConnectionId),
    /// Only the named client.
    Only(ConnectionId),
}

impl Recipients {
    /// Whether a broadcast with this recipient set reaches `id`.
    pub fn includes(self, id: ConnectionId) -> bool {
        match self {
            Recipients::All => true,
            Recipients::AllExcept(excluded) => id != excluded,
            Recipients::Only(target) => id == target,
        }
    }
}

/// One entry per connected client. Entries exist from accept to disconnect.
pub struct ConnectionRegistry {
    entries: BTreeMap<ConnectionId, mpsc::Sender<ServerMessage>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register a connection's outbound channel.
    pub fn insert(&mut self, id: ConnectionId, sender: mpsc::Sender<ServerMessage>) {
        self.entries.insert(id, sender);
    }

    /// Remove a connection on disconnect.
    pub fn remove(&mut self, id: ConnectionId) {
        self.entries.remove(&id);
    }

    /// Number of connected clients.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no clients are connected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Send a message to the recipient set, fire-and-forget. A full or
    /// closed channel drops the message rather than suspending the relay
    /// task; no acknowledgement is awaited.
    pub fn broadcast(&self, recipients: Recipients, message: ServerMessage) {
        for (id, sender) in &self.entries {
            if recipients.includes(*id) {
                let _ = sender.try_send(message.clone());
            }
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    fn cid(n: u8) -> ConnectionId {
        ConnectionId::from_bytes([n; 16])
    }

    #[test]
    fn test_recipients_includes() {
        let a = cid(1);
        let b = cid(2);

        assert!(Recipients::All.includes(a));
        assert!(Recipients::All.includes(b));

        assert!(!Recipients::AllExcept(a).includes(a));
        assert!(Recipients::AllExcept(a).includes(b));

        assert!(Recipients::Only(a).includes(a));
        assert!(!Recipients::Only(a).includes(b));
    }

    #[test]
    fn test_broadcast_all_except_sender() {
        let mut registry = ConnectionRegistry::new();
        let a = cid(1);
        let b = cid(2);
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        registry.insert(a, tx_a);
        registry.insert(b, tx_b);

        let msg = ServerMessage::ScoreUpdate(Map::new());
        registry.broadcast(Recipients::AllExcept(a), msg.clone());

        assert_eq!(rx_b.try_recv().ok(), Some(msg));
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_survives_closed_receiver() {
        let mut registry = ConnectionRegistry::new();
        let a = cid(1);
        let b = cid(2);
        let (tx_a, rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        registry.insert(a, tx_a);
        registry.insert(b, tx_b);

        drop(rx_a);

        let msg = ServerMessage::ScoreUpdate(Map::new());
        registry.broadcast(Recipients::All, msg.clone());

        // The closed channel is skipped silently; b still gets the message.
        assert_eq!(rx_b.try_recv().ok(), Some(msg));
    }

    #[test]
    fn test_broadcast_drops_for_stalled_client() {
        let mut registry = ConnectionRegistry::new();
        let a = cid(1);
        let b = cid(2);
        let (tx_a, mut rx_a) = mpsc::channel(1);
        let (tx_b, mut rx_b) = mpsc::channel(8);

        // a's writer is stalled: its queue is already full.
        tx_a.try_send(ServerMessage::ScoreUpdate(Map::new())).unwrap();
        registry.insert(a, tx_a);
        registry.insert(b, tx_b);

        let msg = ServerMessage::Players(Map::new());
        registry.broadcast(Recipients::All, msg.clone());

        // The stalled client loses the message; the healthy one still gets
        // it, and the call returned without suspending.
        assert_eq!(rx_b.try_recv().ok(), Some(msg));
        assert!(matches!(rx_a.try_recv().ok(), Some(ServerMessage::ScoreUpdate(_))));
        assert!(rx_a.try_recv().is_err());
    }
}
