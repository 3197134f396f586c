//! Error types for the game layer.

/// Why a session rejected an intent.
///
/// Every rejection is a complete no-op on the session. The display text is
/// what the client sees in its private `error` event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("The game has ended")]
    Finished,

    /// The caller is not bound to any slot of this session.
    #[error("You are not in any game")]
    NotSeated,

    /// Fewer than two slots are occupied.
    #[error("Waiting for more players to join")]
    WaitingForPlayers,

    #[error("Not your turn")]
    NotYourTurn,

    /// Only slot 0 may send `start`.
    #[error("Only the game creator can start the game")]
    NotCreator,

    #[error("Game is full")]
    Full,

    #[error("You are already in this game")]
    AlreadySeated,

    /// Reroll attempted before anything was set aside from the last roll.
    #[error("You must set aside at least one scoring die before rolling again")]
    MustSetAsideBeforeRoll,

    #[error("You must roll the dice first")]
    MustRollFirst,

    #[error("Invalid index")]
    InvalidIndex,

    #[error("You cannot select a die that is already set aside")]
    DieAlreadyHeld,

    #[error("You must select dice before setting aside")]
    NothingSelected,

    #[error("Select dice that are not already set aside")]
    SelectionAlreadyHeld,

    /// The selection doesn't split exactly into scoring combinations.
    #[error("Invalid selection: all dice must score")]
    InvalidSelection,

    #[error("You have no points to bank")]
    NothingToBank,

    /// Active dice remain but nothing was set aside from the last roll.
    #[error("You must set aside at least one combination before banking")]
    MustSetAsideBeforeBank,
}
