//! Unified error type for the ito server.

use ito_protocol::ProtocolError;
use ito_room::RoomError;
use ito_session::SessionError;
use ito_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically. Room
/// rejections normally travel inside an ack; the `Room` variant exists
/// for callers driving the store directly.
#[derive(Debug, thiserror::Error)]
pub enum ItoError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad handshake).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (duplicate or unknown connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, wrong phase).
    #[error(transparent)]
    Room(#[from] RoomError),
}
