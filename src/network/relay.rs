//! Event Relay
//!
//! Translates inbound per-connection events into state mutations and outbound
//! broadcasts. `apply` is the single entry point and runs to completion on
//! the relay task; it is the only writer of [`WorldState`].
//!
//! Kept free of sockets and timers so every relay rule is testable in
//! isolation: scheduling the respawn is reported back to the caller rather
//! than performed here.

use tracing::debug;

use crate::game::pose::Pose;
use crate::game::state::{ConnectionId, TreasureId, WorldState};
use crate::network::protocol::ServerMessage;
use crate::network::registry::Recipients;

/// An inbound event as seen by the relay task. Connect/disconnect come from
/// the transport lifecycle, respawns from expired timers, the rest from
/// parsed client messages.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Transport accepted a new connection.
    Connected(ConnectionId),
    /// Client entered the world with an initial pose.
    Joined(ConnectionId, Pose),
    /// Client reported a new pose.
    Moved(ConnectionId, Pose),
    /// Client claims a treasure.
    Collected(ConnectionId, TreasureId),
    /// A respawn timer fired for a treasure.
    Respawned(TreasureId),
    /// Transport lost the connection.
    Disconnected(ConnectionId),
}

/// One outbound message with its recipient set.
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    /// Who receives the message.
    pub recipients: Recipients,
    /// The full-state snapshot to send.
    pub message: ServerMessage,
}

impl Broadcast {
    fn new(recipients: Recipients, message: ServerMessage) -> Self {
        Self { recipients, message }
    }
}

/// Everything an event produced: messages to send, and at most one respawn
/// timer to schedule (a successful collection).
#[derive(Debug, Default)]
pub struct RelayOutput {
    /// Broadcasts to perform, in order.
    pub broadcasts: Vec<Broadcast>,
    /// Treasure whose one-shot respawn timer must be scheduled.
    pub schedule_respawn: Option<TreasureId>,
}

/// Apply one event to the world and compute the resulting broadcasts.
///
/// Invalid events (unknown treasure, already-collected treasure) mutate
/// nothing and broadcast nothing.
pub fn apply(state: &mut WorldState, event: RelayEvent) -> RelayOutput {
    let mut out = RelayOutput::default();

    match event {
        RelayEvent::Connected(id) => {
            // Score exists from connect time, before the explicit join.
            state.insert_score(id);
        }

        RelayEvent::Joined(id, pose) => {
            state.upsert_player(id, pose);

            // The joiner gets the whole world; everyone else just the
            // updated player mapping.
            out.broadcasts.push(Broadcast::new(
                Recipients::Only(id),
                ServerMessage::Players(state.players_snapshot()),
            ));
            out.broadcasts.push(Broadcast::new(
                Recipients::Only(id),
                ServerMessage::TreasureUpdate(state.treasures_snapshot()),
            ));
            out.broadcasts.push(Broadcast::new(
                Recipients::Only(id),
                ServerMessage::ScoreUpdate(state.scores_snapshot()),
            ));
            out.broadcasts.push(Broadcast::new(
                Recipients::AllExcept(id),
                ServerMessage::Players(state.players_snapshot()),
            ));
        }

        RelayEvent::Moved(id, pose) => {
            state.upsert_player(id, pose);

            out.broadcasts.push(Broadcast::new(
                Recipients::AllExcept(id),
                ServerMessage::Players(state.players_snapshot()),
            ));
        }

        RelayEvent::Collected(id, treasure_id) => {
            if state.collect(id, treasure_id) {
                out.broadcasts.push(Broadcast::new(
                    Recipients::All,
                    ServerMessage::TreasureUpdate(state.treasures_snapshot()),
                ));
                out.broadcasts.push(Broadcast::new(
                    Recipients::All,
                    ServerMessage::ScoreUpdate(state.scores_snapshot()),
                ));
                out.schedule_respawn = Some(treasure_id);
            } else {
                debug!("Ignoring collect of {} by {}", treasure_id, id);
            }
        }

        RelayEvent::Respawned(treasure_id) => {
            if state.respawn(treasure_id) {
                out.broadcasts.push(Broadcast::new(
                    Recipients::All,
                    ServerMessage::TreasureUpdate(state.treasures_snapshot()),
                ));
            }
        }

        RelayEvent::Disconnected(id) => {
            state.remove_connection(id);

            out.broadcasts.push(Broadcast::new(
                Recipients::All,
                ServerMessage::Players(state.players_snapshot()),
            ));
            out.broadcasts.push(Broadcast::new(
                Recipients::All,
                ServerMessage::ScoreUpdate(state.scores_snapshot()),
            ));
        }
    }

    out
}
