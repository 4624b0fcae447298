//! Error types for the session layer.

use ito_transport::ConnectionId;

/// Errors that can occur while tracking connections.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A session for this connection id is already registered.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// No session exists for the given connection. It either never
    /// completed its handshake or has already been unregistered.
    #[error("session not found for connection {0}")]
    NotFound(ConnectionId),
}
