//! Tomb Hunt Relay Server
//!
//! Authoritative state relay for the Tomb Hunt multiplayer treasure game.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tomb_hunt::{RelayServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (RUST_LOG overrides the default level)
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = ServerConfig::from_env()?;

    info!("Tomb Hunt Server v{}", VERSION);
    info!("Treasures: {}", config.treasure_count);
    info!(
        "Respawn delay: {} ms",
        config.respawn_delay.as_millis()
    );

    let server = RelayServer::new(config);
    server.run().await?;

    Ok(())
}
