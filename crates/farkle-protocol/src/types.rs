//! Core protocol types for the Farkle wire format.
//!
//! Every type here travels "on the wire" as a JSON text frame. Intents and
//! events are internally tagged by a `type` field in `snake_case`, and
//! their fields use `camelCase` so browser clients can consume them
//! without a mapping layer:
//!
//! ```text
//! {"type":"toggle_select","index":2}
//! {"type":"game_joined","gameCode":"K7QXA","slotIndex":1}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Codec, ProtocolError};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for one connected participant.
///
/// Assigned by the server from the connection id. Clients never see it:
/// on the wire a participant is always addressed by its slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The short human-enterable code that identifies a game session.
///
/// Codes are normalised on construction (surrounding whitespace trimmed,
/// ASCII upper-cased) so that a code typed as `" k7qxa "` finds `K7QXA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameCode(String);

impl GameCode {
    /// Builds a normalised code from user input.
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the code is empty after normalisation.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Specifies who should receive a server event.
///
/// Session operations return a list of `(Recipient, ServerEvent)` pairs;
/// the connection coordinator resolves each recipient to the participants
/// currently bound to the session's slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every participant bound to the session.
    All,

    /// Only the participant bound to this slot.
    Slot(usize),
}

// ---------------------------------------------------------------------------
// Game data carried inside events
// ---------------------------------------------------------------------------

/// One die of the current hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Die {
    /// Face value, always 1..=6.
    pub value: u8,
    /// Set aside earlier this hand; excluded from rerolls and bust checks.
    pub held: bool,
}

/// A scoring subset banked within the current turn by a set-aside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredMove {
    /// 1-based position within the turn.
    pub sequence_id: u32,
    pub values: Vec<u8>,
    pub points: u32,
}

/// Scoreboard row for one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub name: String,
    pub total: u32,
    /// `true` while a participant is bound to the slot.
    pub active: bool,
}

/// Coarse session status as shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusView {
    Playing,
    Finished,
}

/// Full snapshot of a session, broadcast after every successful operation.
///
/// Optional slots use `-1` on the wire so that clients can treat every
/// field as a plain number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub players: Vec<PlayerView>,
    pub current_turn: usize,
    pub dice: Vec<Die>,
    pub selected: Vec<usize>,
    pub remaining_active_dice_count: usize,
    pub turn_points: u32,
    pub turn_moves: Vec<ScoredMove>,
    pub victory_target: u32,
    pub final_round_trigger_slot: i32,
    pub winner_slot: i32,
    pub status: StatusView,
}

// ---------------------------------------------------------------------------
// ClientIntent (client → server)
// ---------------------------------------------------------------------------

/// Every `type` tag the server accepts, aliases included.
pub const INTENT_TAGS: &[&str] = &[
    "ping",
    "create",
    "join",
    "start",
    "roll",
    "toggle_select",
    "set_aside",
    "apartar",
    "bank",
];

/// What a client asks the server to do.
///
/// `#[serde(tag = "type")]` produces the "internally tagged" shape
/// `{ "type": "join", "gameCode": "K7QXA" }` rather than
/// `{ "Join": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientIntent {
    /// Liveness probe, answered privately with `pong`.
    Ping,

    /// Create a new session and take slot 0.
    Create {
        #[serde(default)]
        player_name: String,
        /// Requested target. Absent or non-positive means "use the
        /// configured default"; anything else is clamped into range.
        #[serde(default, alias = "victoryScore")]
        victory_target: Option<i64>,
    },

    /// Take the first empty slot of an existing session.
    Join {
        #[serde(default)]
        game_code: String,
        #[serde(default)]
        player_name: String,
    },

    /// Creator-only advisory signal that play begins.
    Start,

    Roll,

    /// Flip one die in or out of the pending selection.
    ToggleSelect { index: i64 },

    /// Score the pending selection and hold those dice.
    #[serde(alias = "apartar")]
    SetAside,

    Bank,
}

/// Just enough structure to read the tag before the full decode.
#[derive(Deserialize)]
struct TagProbe {
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl ClientIntent {
    /// Decodes an inbound frame into an intent.
    ///
    /// The tag is checked first so that a frame with an unrecognised
    /// `type` reports [`ProtocolError::UnknownType`] naming that tag,
    /// while a known tag with a bad payload reports a decode error.
    pub fn decode<C: Codec>(
        codec: &C,
        data: &[u8],
    ) -> Result<Self, ProtocolError> {
        let probe: TagProbe = codec.decode(data)?;
        let kind = probe.kind.ok_or_else(|| {
            ProtocolError::InvalidMessage("missing type".into())
        })?;
        if !INTENT_TAGS.contains(&kind.as_str()) {
            return Err(ProtocolError::UnknownType(kind));
        }
        codec.decode(data)
    }

    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Create { .. } => "create",
            Self::Join { .. } => "join",
            Self::Start => "start",
            Self::Roll => "roll",
            Self::ToggleSelect { .. } => "toggle_select",
            Self::SetAside => "set_aside",
            Self::Bank => "bank",
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent (server → client)
// ---------------------------------------------------------------------------

/// What the server tells clients.
///
/// Whether an event is private or broadcast is decided by the
/// [`Recipient`] it is paired with, not by the event itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    Pong,
    GameCreated {
        game_code: GameCode,
    },
    GameJoined {
        game_code: GameCode,
        slot_index: usize,
    },
    GameStarted,
    PlayerJoined {
        slot_index: usize,
        name: String,
    },
    /// `winner_slot` is `-1` unless the departure ended the game by forfeit.
    PlayerDisconnected {
        slot_index: usize,
        winner_slot: i32,
    },
    RollResult {
        dice: Vec<Die>,
    },
    Farkle {
        message: String,
    },
    HotDice {
        message: String,
    },
    FinalRound {
        message: String,
    },
    TurnChanged {
        message: String,
    },
    GameOver {
        winner_slot: usize,
        message: String,
    },
    GameState(GameStateView),
    Error {
        message: String,
    },
}

impl ServerEvent {
    /// Convenience constructor for a rejection.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The wire tag, for log lines and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pong => "pong",
            Self::GameCreated { .. } => "game_created",
            Self::GameJoined { .. } => "game_joined",
            Self::GameStarted => "game_started",
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerDisconnected { .. } => "player_disconnected",
            Self::RollResult { .. } => "roll_result",
            Self::Farkle { .. } => "farkle",
            Self::HotDice { .. } => "hot_dice",
            Self::FinalRound { .. } => "final_round",
            Self::TurnChanged { .. } => "turn_changed",
            Self::GameOver { .. } => "game_over",
            Self::GameState(_) => "game_state",
            Self::Error { .. } => "error",
        }
    }
}
