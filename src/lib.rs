//! # Tomb Hunt Relay Server
//!
//! Authoritative state relay for the Tomb Hunt multiplayer treasure game.
//! Browser clients connect over WebSocket, report their pose, and race to
//! collect a fixed set of shared treasures; the server holds the three
//! authoritative mappings and rebroadcasts full-state snapshots on every
//! mutation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TOMB HUNT SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Shared state (single-writer)              │
//! │  ├── pose.rs     - Position + rotation value types           │
//! │  └── state.rs    - Players, treasures, scores                │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── protocol.rs - Wire message types                        │
//! │  ├── registry.rs - Connection registry + broadcast routing   │
//! │  ├── relay.rs    - Event -> mutation -> broadcast relay      │
//! │  └── server.rs   - WebSocket server + relay task             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//!
//! Every inbound event (from any connection) and every respawn timer firing
//! is funneled into a single channel consumed by one relay task. Handlers
//! run to completion, so the state store needs no locking and
//! first-collector-wins falls out of serialization. Broadcasts are
//! fire-and-forget.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod game;
pub mod network;

// Re-export commonly used types
pub use game::pose::{Pose, Vec3};
pub use game::state::{ConnectionId, Treasure, TreasureId, WorldState};
pub use network::protocol::{ClientMessage, ServerMessage};
pub use network::server::{RelayServer, RelayServerError, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of treasures in the shared set
pub const TREASURE_COUNT: usize = 10;

/// Points awarded per collected treasure
pub const POINTS_PER_TREASURE: u32 = 10;

/// Delay before a collected treasure becomes available again (ms)
pub const RESPAWN_DELAY_MS: u64 = 30_000;

/// Default listen port (overridden by the PORT environment variable)
pub const DEFAULT_PORT: u16 = 3000;
