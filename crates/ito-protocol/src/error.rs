//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A
//! `ProtocolError` always means a frame could not be turned into (or out
//! of) bytes, never that a room operation was refused; refusals travel
//! inside an [`Ack`](crate::Ack) instead.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Common causes: malformed JSON, an unknown event name, missing
    /// required fields, or a field of the wrong type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but breaks a protocol rule, e.g. a request sent
    /// before the handshake or a handshake with the wrong version.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
