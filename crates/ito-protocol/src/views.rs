//! Per-recipient projections of a room.
//!
//! The server never sends raw room state. Each broadcast carries one of
//! these views, built for a specific observer, so hidden information
//! (other players' cards, who voted for what) never leaves the server.

use serde::{Deserialize, Serialize};

use crate::{Card, PlayerId, RoomCode, RoomStatus, Theme, ThemeId};

/// Just enough to name a player in a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub player_id: PlayerId,
    pub name: String,
}

/// A roster entry in the lobby view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPlayer {
    pub player_id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_you: bool,
    pub disconnected: bool,
}

/// The lobby view: roster and flags only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRoomView {
    pub code: RoomCode,
    pub status: RoomStatus,
    /// Whether the observer is the host.
    pub is_host: bool,
    pub players: Vec<PublicPlayer>,
}

/// Aggregate ballots for one theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCount {
    pub theme_id: ThemeId,
    pub votes: usize,
}

/// A roster entry in the voting view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingPlayer {
    pub player_id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_you: bool,
    pub has_voted: bool,
    pub disconnected: bool,
}

/// The voting view.
///
/// Exposes per-theme totals and whether each player has voted, plus the
/// observer's own ballot. It never maps another player to their choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingView {
    pub code: RoomCode,
    pub status: RoomStatus,
    pub is_host: bool,
    pub drawn_number: Option<u32>,
    pub themes: Vec<Theme>,
    pub vote_counts: Vec<VoteCount>,
    pub has_voted: bool,
    pub my_vote: Option<ThemeId>,
    pub selected_theme: Option<Theme>,
    /// Whole seconds left on the majority countdown, if one is running.
    pub countdown_seconds: Option<u64>,
    pub players: Vec<VotingPlayer>,
}

/// A roster entry in the game view. `card` is `None` unless the entry is
/// the observer or has been revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePlayer {
    pub player_id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_you: bool,
    pub card: Option<Card>,
    pub revealed: bool,
    pub disconnected: bool,
}

/// The in-round view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub code: RoomCode,
    pub status: RoomStatus,
    pub is_host: bool,
    pub selected_theme: Option<Theme>,
    pub drawn_number: Option<u32>,
    pub players: Vec<GamePlayer>,
}

/// The card a player just exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedCard {
    pub player_id: PlayerId,
    pub name: String,
    pub card: Card,
}

/// One entry of the final, ascending reveal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedCard {
    pub name: String,
    pub card: Card,
}
