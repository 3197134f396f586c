//! Authoritative Farkle session state machine.
//!
//! One [`Session`] per game. It owns turn order, dice, holding rules,
//! bust detection, the final round, and departures. Sessions are plain
//! synchronous values; the registry wraps each in its own lock.
//!
//! # Key types
//!
//! - [`Session`]: the aggregate; every operation returns the events to deliver
//! - [`GameConfig`]: slots, dice per hand, victory target bounds
//! - [`GameStatus`]: Active → FinalRound → Finished
//! - [`DiceRoller`]: where faces come from ([`RandomRoller`], [`SequenceRoller`])
//! - [`GameError`]: why an intent was rejected

mod config;
mod dice;
mod error;
mod session;

pub use config::{GameConfig, GameStatus};
pub use dice::{
    random_roller_factory, sequence_roller_factory, DiceRoller, RandomRoller,
    RollerFactory, SequenceRoller,
};
pub use error::GameError;
pub use farkle_scoring::FACES;
pub use session::{DisconnectOutcome, Outbound, Session};
