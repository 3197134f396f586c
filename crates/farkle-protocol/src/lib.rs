//! Wire protocol for the Farkle server.
//!
//! This crate defines the "language" that browser clients and the server
//! speak:
//!
//! - **Intents** ([`ClientIntent`]): what a client asks the server to do.
//!   Clients never send state, only intents.
//! - **Events** ([`ServerEvent`], [`GameStateView`]): what the server
//!   tells clients after it has decided what happened.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the game
//! layer. It doesn't know about connections or sessions; it only knows
//! how to serialize and deserialize messages.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientIntent) → Game (Session)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientIntent, Die, GameCode, GameStateView, ParticipantId, PlayerView,
    Recipient, ScoredMove, ServerEvent, StatusView, INTENT_TAGS,
};
