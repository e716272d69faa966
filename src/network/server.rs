//! WebSocket Relay Server
//!
//! Async WebSocket server. Each connection gets a reader task and a writer
//! task; every parsed event is funneled into one channel consumed by the
//! single relay task, which owns the world state and the connection
//! registry. Respawn timers are detached one-shot sleeps that feed the same
//! channel, so timer firings serialize with client events.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument};

use crate::game::state::{ConnectionId, WorldState};
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::network::registry::ConnectionRegistry;
use crate::network::relay::{self, RelayEvent};
use crate::{DEFAULT_PORT, POINTS_PER_TREASURE, RESPAWN_DELAY_MS, TREASURE_COUNT};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Number of treasures in the shared set.
    pub treasure_count: usize,
    /// Points awarded per collected treasure.
    pub points_per_treasure: u32,
    /// Delay before a collected treasure respawns.
    pub respawn_delay: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            treasure_count: TREASURE_COUNT,
            points_per_treasure: POINTS_PER_TREASURE,
            respawn_delay: Duration::from_millis(RESPAWN_DELAY_MS),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Build the default configuration with the listen port taken from the
    /// `PORT` environment variable when set.
    pub fn from_env() -> Result<Self, RelayServerError> {
        let mut config = Self::default();
        if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port.parse().map_err(RelayServerError::InvalidPort)?;
            config.bind_addr.set_port(port);
        }
        Ok(config)
    }
}

/// Relay server errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// PORT environment variable is not a valid port number.
    #[error("Invalid PORT value: {0}")]
    InvalidPort(std::num::ParseIntError),
}

/// Input to the relay task. Registration carries the connection's outbound
/// channel; everything else is a plain relay event.
#[derive(Debug)]
enum RelayCommand {
    /// A new connection with its outbound message channel.
    Register(ConnectionId, mpsc::Sender<ServerMessage>),
    /// An inbound event (client message, lifecycle, or timer firing).
    Event(RelayEvent),
}

/// The relay server.
pub struct RelayServer {
    /// Server configuration.
    config: ServerConfig,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl RelayServer {
    /// Create a new relay server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            shutdown_tx,
        }
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), RelayServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Relay server listening on {}", self.config.bind_addr);

        let (event_tx, event_rx) = mpsc::channel::<RelayCommand>(256);

        // The single writer of the world state.
        let state = WorldState::new(self.config.treasure_count, self.config.points_per_treasure);
        let relay_handle = tokio::spawn(run_relay(
            state,
            event_rx,
            event_tx.clone(),
            self.config.respawn_delay,
        ));

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr, event_tx.clone());
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        relay_handle.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        event_tx: mpsc::Sender<RelayCommand>,
    ) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let id = ConnectionId::generate();
            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            // Register with the relay task. The score entry is created here,
            // before any explicit join.
            if event_tx.send(RelayCommand::Register(id, msg_tx)).await.is_err() {
                return;
            }
            info!("Connection {} ({}) registered", id, addr);

            // Writer task: serialize and send outbound messages.
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Reader loop: events reach the relay channel in receive order,
            // preserving per-connection ordering.
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        // Malformed input is ignored, not reported.
                                        debug!("Invalid message from {}: {}", id, e);
                                        continue;
                                    }
                                };

                                let event = match client_msg {
                                    ClientMessage::PlayerJoin(pose) => RelayEvent::Joined(id, pose),
                                    ClientMessage::PlayerMove(pose) => RelayEvent::Moved(id, pose),
                                    ClientMessage::TreasureCollected(treasure_id) => {
                                        RelayEvent::Collected(id, treasure_id)
                                    }
                                };

                                if event_tx.send(RelayCommand::Event(event)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Connection {} closed", id);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", id, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            sender_task.abort();

            let _ = event_tx
                .send(RelayCommand::Event(RelayEvent::Disconnected(id)))
                .await;

            info!("Connection {} cleaned up", id);
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// The relay task: consumes the event channel one command at a time, applies
/// each to the world, performs the resulting broadcasts, and schedules
/// respawn timers. Runs until the server shuts down; the state store lives
/// and dies with it.
async fn run_relay(
    mut state: WorldState,
    mut events: mpsc::Receiver<RelayCommand>,
    event_tx: mpsc::Sender<RelayCommand>,
    respawn_delay: Duration,
) {
    let mut registry = ConnectionRegistry::new();

    while let Some(command) = events.recv().await {
        match command {
            RelayCommand::Register(id, sender) => {
                registry.insert(id, sender);
                relay::apply(&mut state, RelayEvent::Connected(id));
            }
            RelayCommand::Event(event) => {
                // Drop the registry entry before computing the disconnect
                // broadcasts so only remaining connections are addressed.
                if let RelayEvent::Disconnected(id) = &event {
                    registry.remove(*id);
                }

                let output = relay::apply(&mut state, event);

                for broadcast in output.broadcasts {
                    registry.broadcast(broadcast.recipients, broadcast.message);
                }

                // One-shot, uncancellable: once scheduled the timer always
                // fires, even if the collector disconnects meanwhile.
                if let Some(treasure_id) = output.schedule_respawn {
                    let tx = event_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(respawn_delay).await;
                        let _ = tx
                            .send(RelayCommand::Event(RelayEvent::Respawned(treasure_id)))
                            .await;
                    });
                }
            }
        }
    }
}
