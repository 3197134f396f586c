//! # Farkle
//!
//! Server-authoritative multiplayer Farkle over WebSocket.
//!
//! Clients send intents (`create`, `join`, `roll`, `toggle_select`,
//! `set_aside`, `bank`); the server decides what happened and pushes events
//! and full `game_state` snapshots to everyone at the table.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use farkle::FarkleServer;
//!
//! # async fn start() -> Result<(), farkle::FarkleError> {
//! let server = FarkleServer::builder()
//!     .bind("127.0.0.1:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod hub;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::FarkleError;
pub use server::{FarkleServer, FarkleServerBuilder};

pub use farkle_game::{
    random_roller_factory, sequence_roller_factory, GameConfig, RollerFactory,
};
pub use farkle_registry::{Registry, RegistryConfig};
