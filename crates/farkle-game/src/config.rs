//! Game configuration and coarse session status.

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Rules shared by every session on a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Player slots per session.
    pub slots: usize,

    /// Dice in a full hand.
    pub dice_per_hand: usize,

    /// Target used when a creator asks for none.
    pub default_victory_target: u32,

    /// Lower bound for a requested target.
    pub min_victory_target: u32,

    /// Upper bound for a requested target.
    pub max_victory_target: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            slots: 2,
            dice_per_hand: 6,
            default_victory_target: 2000,
            min_victory_target: 100,
            max_victory_target: 100_000,
        }
    }
}

impl GameConfig {
    /// Resolves a creator's requested target.
    ///
    /// Absent or non-positive requests take the default; anything else is
    /// clamped into `[min, max]`.
    pub fn victory_target(&self, requested: Option<i64>) -> u32 {
        match requested {
            Some(target) if target > 0 => {
                let clamped = target.clamp(
                    i64::from(self.min_victory_target),
                    i64::from(self.max_victory_target),
                );
                u32::try_from(clamped).unwrap_or(self.max_victory_target)
            }
            _ => self.default_victory_target,
        }
    }
}

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// Transitions only move forward:
///
/// ```text
/// Active → FinalRound → Finished
///    └─────────────────────↗   (forfeit)
/// ```
///
/// - **Active**: normal play, nobody has reached the target.
/// - **FinalRound**: one slot reached the target; every other occupied
///   slot gets exactly one more turn.
/// - **Finished**: a winner is fixed. Only slot unbinding and eviction
///   happen from here on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Active,
    FinalRound,
    Finished,
}

impl GameStatus {
    /// Returns `true` if intents can still change the game.
    pub fn is_playing(&self) -> bool {
        !matches!(self, Self::Finished)
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::FinalRound => write!(f, "FinalRound"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}
