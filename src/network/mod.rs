//! Network Layer
//!
//! WebSocket transport, wire protocol, and the event relay. Everything
//! non-deterministic lives here; the state store in `game/` is only ever
//! touched by the relay task.

pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{ConnectionRegistry, Recipients};
pub use relay::{Broadcast, RelayEvent, RelayOutput};
pub use server::{RelayServer, RelayServerError, ServerConfig};
