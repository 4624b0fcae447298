//! Wire protocol for the ito party server.
//!
//! This crate defines the "language" that browser clients and the server
//! speak:
//!
//! - **Types** ([`Envelope`], [`Payload`], [`RoomCode`], [`RoomStatus`], …):
//!   the frame structure and identities.
//! - **Messages** ([`ClientRequest`], [`Ack`], [`ServerEvent`]): the
//!   request/acknowledge calls and the unprompted broadcasts.
//! - **Views** ([`PublicRoomView`], [`VotingView`], [`GameView`]): the
//!   per-recipient projections every broadcast carries.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, bytes out.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the room
//! layer. It knows nothing about connections or rooms, only how the
//! messages about them look.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Coordinator (rooms)
//! ```

mod codec;
mod error;
mod messages;
mod types;
mod views;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{Ack, ClientRequest, RejoinPhase, RejoinState, ServerEvent};
pub use types::{
    AckFrame, Card, Envelope, ErrorKind, Locale, Payload, PlayerId, Request,
    RoomCode, RoomStatus, Theme, ThemeId,
};
pub use views::{
    GamePlayer, GameView, OrderedCard, PlayerRef, PublicPlayer,
    PublicRoomView, RevealedCard, VoteCount, VotingPlayer, VotingView,
};

// Connection ids appear in handshake acks; re-exported so clients of this
// crate don't need a direct transport dependency.
pub use ito_transport::ConnectionId;
