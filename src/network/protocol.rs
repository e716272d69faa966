//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON text frames, adjacently tagged as
//! `{"type": <name>, "data": <payload>}` with the event names the browser
//! client uses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::pose::Pose;
use crate::game::state::{ConnectionId, Treasure, TreasureId};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Enter the world with an initial pose.
    PlayerJoin(Pose),

    /// Report a new pose. Overwrites the previous one wholesale.
    PlayerMove(Pose),

    /// Claim a treasure by id, e.g. `"treasure-3"`.
    TreasureCollected(TreasureId),
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client. Always full-state snapshots: the
/// state is small and bounded, so snapshots beat a delta protocol at this
/// scale (a known scaling limit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Full player mapping: connection id -> pose.
    Players(BTreeMap<ConnectionId, Pose>),

    /// Ordered treasure list with collected flags.
    TreasureUpdate(Vec<Treasure>),

    /// Full score mapping: connection id -> points.
    ScoreUpdate(BTreeMap<ConnectionId, u32>),
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
