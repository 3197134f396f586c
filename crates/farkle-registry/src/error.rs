//! Error types for the registry layer.

use farkle_game::GameError;
use farkle_protocol::GameCode;

/// Errors from creating, joining, or looking up sessions.
///
/// The display text is what the client sees.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No live session has this code.
    #[error("Game not found")]
    NotFound(GameCode),

    /// A join arrived with an empty code.
    #[error("Game code required")]
    CodeRequired,

    /// Every attempt to draw an unused code collided.
    #[error("Could not allocate a game code, try again")]
    CodeSpaceExhausted,

    /// The session itself refused the seat (full, finished, ...).
    #[error(transparent)]
    Game(#[from] GameError),
}
