//! Shared Game State
//!
//! The server-held mappings and their value types. Everything here is plain
//! data with synchronous mutation methods; the relay task in `network/` is
//! the only writer.
//!
//! - `pose`: position + rotation value types (relayed verbatim)
//! - `state`: the three authoritative mappings (players, treasures, scores)

pub mod pose;
pub mod state;

// Re-export key types
pub use pose::{Pose, Vec3};
pub use state::{ConnectionId, Treasure, TreasureId, WorldState};
