//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in serialization, not in
//! networking or game rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or wrong
    /// field types inside an otherwise known intent.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but is not a valid intent, e.g. it has no
    /// `type` field at all.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The frame carries a `type` tag the server does not understand.
    ///
    /// The display text is sent back to the client verbatim.
    #[error("unknown type: {0}")]
    UnknownType(String),
}
