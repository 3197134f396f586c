//! `farkle-server`: runs the Farkle WebSocket server.
//!
//! Configuration comes from `FARKLE_*` environment variables; log levels
//! from `RUST_LOG` (default `info`).

use farkle::{FarkleError, FarkleServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), FarkleError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        addr = %config.bind_addr(),
        slots = config.game.slots,
        dice = config.game.dice_per_hand,
        retention_secs = config.registry.retention.as_secs(),
        "configuration loaded"
    );

    let server = FarkleServer::builder().config(config).build().await?;
    server.run().await
}
