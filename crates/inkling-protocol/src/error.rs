//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// Encoding failures mean a bug in a wire type; decoding failures and
/// invalid codes come from untrusted client input.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// or an unknown frame `type`.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A room code that is the wrong length or uses characters outside
    /// the code alphabet.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),

    /// The message decoded fine but violates protocol rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
