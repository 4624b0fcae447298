//! The session manager: tracks every live connection.
//!
//! It's responsible for:
//! - Registering a connection's outbound channel after its handshake
//! - Delivering events to a connection by id
//! - Forgetting the connection when its socket closes
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself. It is owned by the
//! coordinator and only touched while the coordinator's lock is held,
//! alongside the room store, so both always agree on membership.

use std::collections::HashMap;

use ito_protocol::ServerEvent;
use ito_transport::ConnectionId;

use crate::{Outbound, OutboundSender, Session, SessionError};

/// Registry of live connections.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ send()* ──→ unregister()
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionManager {
    /// Creates a new, empty session manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and the channel its writer task drains.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyRegistered`] if the id is in use.
    pub fn register(
        &mut self,
        connection_id: ConnectionId,
        sender: OutboundSender,
    ) -> Result<(), SessionError> {
        if self.sessions.contains_key(&connection_id) {
            return Err(SessionError::AlreadyRegistered(connection_id));
        }
        self.sessions
            .insert(connection_id, Session::new(connection_id, sender));
        tracing::debug!(%connection_id, "session registered");
        Ok(())
    }

    /// Removes a connection, returning its final session record.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the id is unknown.
    pub fn unregister(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?;
        tracing::debug!(%connection_id, "session unregistered");
        Ok(session)
    }

    /// Queues an event for one connection. Returns `false` if the
    /// connection is unknown or its writer has gone away; callers treat
    /// that as a silent drop, the disconnect path cleans up.
    pub fn send(&self, connection_id: ConnectionId, event: ServerEvent) -> bool {
        match self.sessions.get(&connection_id) {
            Some(session) => {
                let name = event.name();
                let delivered = session.send(Outbound::Event(event));
                if !delivered {
                    tracing::debug!(%connection_id, event = name, "dropped event for closed writer");
                }
                delivered
            }
            None => false,
        }
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
