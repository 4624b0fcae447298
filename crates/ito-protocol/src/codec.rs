//! Codec trait and implementations for serializing/deserializing frames.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The server loop only depends on the [`Codec`] trait, so the JSON wire
//! format browsers speak today can be swapped without touching the room
//! logic.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is the format the browser client speaks. It is behind the `json`
/// feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use ito_protocol::{Codec, Envelope, JsonCodec, Payload};
///
/// let codec = JsonCodec;
///
/// let envelope = Envelope {
///     seq: 1,
///     timestamp: 5000,
///     payload: Payload::Heartbeat { client_time: 5000 },
/// };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
