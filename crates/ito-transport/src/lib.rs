//! Transport abstraction layer for the ito party server.
//!
//! Provides the [`Transport`] and [`Connection`] traits the server loop is
//! written against, plus the WebSocket implementation browsers talk to.
//!
//! A connection is the *transient* half of a player's identity: every
//! reconnect produces a fresh [`ConnectionId`], while the stable player id
//! travels inside the requests themselves.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for one live connection.
///
/// Allocated by the transport on accept and never reused for the lifetime
/// of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}

/// A single bidirectional connection.
///
/// `send` and `recv` must be callable concurrently from different tasks:
/// the server reads requests on one task while a writer task pushes
/// broadcasts on another.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
