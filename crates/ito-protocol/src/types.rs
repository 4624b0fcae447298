//! Core protocol types: identities, room status, themes, and the envelope
//! every frame travels in.
//!
//! Field names are camelCase on the wire because the consumers are
//! JavaScript clients; Rust code keeps its snake_case names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ClientRequest, ServerEvent, messages::Ack};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The stable identity of a player.
///
/// Generated and persisted by the client (e.g. in local storage) and sent
/// with every room request. Unlike a connection id it survives reconnects,
/// so it is what the server treats as "the same person".
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Borrows the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A shareable room code such as `"K7QM"`.
///
/// Codes are case-insensitive for humans typing them in, so every
/// construction path (including deserialization) normalizes to trimmed
/// upper case. Two codes compare equal iff they name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Borrows the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomCode {
    fn from(s: String) -> Self {
        Self(s.trim().to_uppercase())
    }
}

impl From<&str> for RoomCode {
    fn from(s: &str) -> Self {
        Self(s.trim().to_uppercase())
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a theme in the catalog (1-based).
pub type ThemeId = u32;

/// A card value, dealt from `0..=100`.
pub type Card = u8;

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

/// A discussion theme: players rank their secret card along the scale
/// running from `min` to `max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: ThemeId,
    pub title: String,
    pub min: String,
    pub max: String,
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The phase a room is in.
///
/// ```text
/// lobby ──start──→ drawing ──animation done──→ voting ──resolve──→ playing ──all revealed──→ reveal
///   ↑                                                                                          │
///   └────────────────────────────────────── reset ─────────────────────────────────────────────┘
/// ```
///
/// `drawing`/`voting` together are "theme selection"; `playing`/`reveal`
/// together are "round in progress". Reset is accepted from any phase
/// other than the lobby itself.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Lobby,
    Drawing,
    Voting,
    Playing,
    Reveal,
}

impl RoomStatus {
    /// Returns `true` if new players may join.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` while a theme is being chosen.
    pub fn is_theme_selection(self) -> bool {
        matches!(self, Self::Drawing | Self::Voting)
    }

    /// Returns `true` while cards are dealt.
    pub fn is_round(self) -> bool {
        matches!(self, Self::Playing | Self::Reveal)
    }

    /// Returns `true` if moving from `self` to `target` is a legal
    /// transition. Self-loops that re-broadcast state (a vote, a redraw, a
    /// single reveal) count as legal.
    pub fn can_transition_to(self, target: Self) -> bool {
        use RoomStatus::*;
        match (self, target) {
            (Lobby, Drawing)
            | (Drawing, Voting)
            | (Voting, Voting)
            | (Voting, Playing)
            | (Playing, Playing)
            | (Playing, Reveal)
            | (Reveal, Reveal) => true,
            (Lobby, Lobby) => false,
            (_, Lobby) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lobby => "lobby",
            Self::Drawing => "drawing",
            Self::Voting => "voting",
            Self::Playing => "playing",
            Self::Reveal => "reveal",
        })
    }
}

// ---------------------------------------------------------------------------
// Errors on the wire
// ---------------------------------------------------------------------------

/// Classification of a refused request, sent next to the human-readable
/// message so clients can branch without parsing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Room, player, or theme does not exist.
    NotFound,
    /// Caller is not the host for a host-only action.
    Unauthorized,
    /// Action is not valid in the room's current status.
    InvalidPhase,
    /// Room full, or too few players.
    Capacity,
    /// Name collision.
    Conflict,
    /// Input out of range or malformed.
    Validation,
}

/// Language used for error messages sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Brazilian Portuguese.
    #[default]
    Pt,
    /// English.
    En,
}

impl FromStr for Locale {
    type Err = String;

    /// Accepts a bare language (`pt`, `en`) or a region tag (`pt-BR`,
    /// `en_US`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match lang.as_str() {
            "pt" => Ok(Self::Pt),
            "en" => Ok(Self::En),
            _ => Err(format!("unsupported locale: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A client request awaiting exactly one [`Ack`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Client-chosen correlation id, echoed in the matching ack.
    pub ack_id: u64,
    /// The operation being requested.
    pub call: ClientRequest,
}

/// The acknowledgement for one [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckFrame {
    pub ack_id: u64,
    pub ack: Ack,
}

/// The content of a frame.
///
/// Adjacently tagged, so every payload is `{"type": ..., "data": ...}` and
/// the client can switch on `type` before looking at the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
pub enum Payload {
    /// Client → Server, first frame: "I speak protocol `version`."
    Handshake { version: u32 },

    /// Server → Client: handshake accepted.
    HandshakeAck { connection_id: u64, server_time: u64 },

    /// Client → Server keep-alive.
    Heartbeat { client_time: u64 },

    /// Server → Client keep-alive reply, echoing `client_time` for RTT.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Client → Server liveness probe. Accepted in place of the handshake,
    /// in which case the server answers and closes.
    HealthCheck,

    /// Server → Client reply to [`Payload::HealthCheck`].
    Health { status: String, rooms: usize },

    /// Client → Server room operation.
    Request(Request),

    /// Server → Client acknowledgement of a request.
    Ack(AckFrame),

    /// Server → Client broadcast; no ack expected.
    Event(ServerEvent),

    /// Server → Client protocol failure (HTTP-style `code`).
    Error { code: u16, message: String },
}

/// The top-level frame. Every message on the wire is an `Envelope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-direction, per-connection sequence number.
    pub seq: u64,

    /// Milliseconds since the sender started.
    pub timestamp: u64,

    pub payload: Payload,
}
