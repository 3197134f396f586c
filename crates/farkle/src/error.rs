//! Unified error type for the Farkle server.

use farkle_game::GameError;
use farkle_protocol::ProtocolError;
use farkle_registry::RegistryError;
use farkle_transport::TransportError;

use crate::ConfigError;

/// Top-level error wrapping every crate-specific error.
///
/// Intent-level variants (`Game`, `Registry`, `NotInGame`, `AlreadyInGame`)
/// display the text the client sees; they never end a connection.
#[derive(Debug, thiserror::Error)]
pub enum FarkleError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A turn intent from a participant with no session.
    #[error("You are not in any game")]
    NotInGame,

    /// A create or join while still seated in an unfinished session.
    #[error("You are already in a game")]
    AlreadyInGame,

    /// The hub task is gone; the server is shutting down.
    #[error("server is shutting down")]
    HubClosed,
}
