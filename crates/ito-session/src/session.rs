//! Session types: the server's record of one live connection.
//!
//! A session tracks:
//! - WHICH transport connection it is (`ConnectionId`)
//! - WHERE its outbound messages go (an unbounded channel drained by the
//!   connection's writer task)
//!
//! Room membership is not kept here; the room store indexes it.

use ito_protocol::{Ack, Payload, ServerEvent};
use ito_transport::ConnectionId;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A message queued for delivery to one connection.
///
/// Events and acks share one channel so a client always sees the
/// broadcasts caused by its request before the request's ack.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// A room broadcast.
    Event(ServerEvent),
    /// The acknowledgement of the request with the given id.
    Ack { ack_id: u64, ack: Ack },
    /// A connection-level reply (heartbeat, health, protocol error).
    Frame(Payload),
}

/// Channel sender for delivering outbound messages to a connection.
///
/// Unbounded because senders run inside the coordinator's critical
/// section and must never wait on a slow client.
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single live connection on the server.
///
/// Created once the handshake completes, removed when the socket closes.
/// The player identity lives in the room store, not here: a session is
/// transient and a reconnecting player gets a fresh one.
#[derive(Debug, Clone)]
pub struct Session {
    connection_id: ConnectionId,
    sender: OutboundSender,
}

impl Session {
    pub(crate) fn new(connection_id: ConnectionId, sender: OutboundSender) -> Self {
        Self {
            connection_id,
            sender,
        }
    }

    /// The transport connection this session wraps.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Queues a message. Returns `false` if the writer task is gone.
    pub fn send(&self, msg: Outbound) -> bool {
        self.sender.send(msg).is_ok()
    }
}
