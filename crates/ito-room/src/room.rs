//! Room and player records.
//!
//! These are plain data. Every mutation goes through
//! [`RoomStore`](crate::RoomStore); other crates only get shared
//! references and read through the accessors below.

use std::collections::HashMap;

use ito_protocol::{Card, PlayerId, PlayerRef, RoomCode, RoomStatus, Theme, ThemeId};
use ito_transport::ConnectionId;
use tokio::time::Instant;

use crate::RoomError;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A member of a room.
///
/// A disconnected player stays in the roster as a "ghost" until they
/// reconnect or their grace window runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub(crate) connection_id: ConnectionId,
    pub(crate) player_id: PlayerId,
    pub(crate) name: String,
    pub(crate) card: Option<Card>,
    pub(crate) revealed: bool,
    pub(crate) disconnected_at: Option<Instant>,
}

impl Player {
    pub(crate) fn new(connection_id: ConnectionId, player_id: PlayerId, name: String) -> Self {
        Self {
            connection_id,
            player_id,
            name,
            card: None,
            revealed: false,
            disconnected_at: None,
        }
    }

    /// The connection currently (or last) representing this player.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn card(&self) -> Option<Card> {
        self.card
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn is_connected(&self) -> bool {
        self.disconnected_at.is_none()
    }

    /// When the player dropped, if they are a ghost.
    pub fn disconnected_at(&self) -> Option<Instant> {
        self.disconnected_at
    }

    /// The short form used in join/leave notifications.
    pub fn to_ref(&self) -> PlayerRef {
        PlayerRef {
            player_id: self.player_id.clone(),
            name: self.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One game room.
#[derive(Debug, Clone)]
pub struct Room {
    pub(crate) code: RoomCode,
    pub(crate) host_connection: ConnectionId,
    pub(crate) host_player_id: PlayerId,
    /// Who created the room; gets host authority back on reconnect.
    pub(crate) original_host: PlayerId,
    pub(crate) players: Vec<Player>,
    pub(crate) status: RoomStatus,
    pub(crate) voting_themes: Option<Vec<Theme>>,
    pub(crate) votes: HashMap<ConnectionId, ThemeId>,
    pub(crate) selected_theme: Option<Theme>,
    pub(crate) drawn_number: Option<u32>,
    pub(crate) majority_countdown_end: Option<Instant>,
}

impl Room {
    pub(crate) fn new(code: RoomCode, host: Player) -> Self {
        Self {
            code,
            host_connection: host.connection_id,
            host_player_id: host.player_id.clone(),
            original_host: host.player_id.clone(),
            players: vec![host],
            status: RoomStatus::Lobby,
            voting_themes: None,
            votes: HashMap::new(),
            selected_theme: None,
            drawn_number: None,
            majority_countdown_end: None,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    /// Roster in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn host_connection(&self) -> ConnectionId {
        self.host_connection
    }

    pub fn host_player_id(&self) -> &PlayerId {
        &self.host_player_id
    }

    pub fn voting_themes(&self) -> Option<&[Theme]> {
        self.voting_themes.as_deref()
    }

    pub fn selected_theme(&self) -> Option<&Theme> {
        self.selected_theme.as_ref()
    }

    pub fn drawn_number(&self) -> Option<u32> {
        self.drawn_number
    }

    pub fn majority_countdown_end(&self) -> Option<Instant> {
        self.majority_countdown_end
    }

    /// The ballot cast from `connection_id`, if any.
    pub fn vote_of(&self, connection_id: ConnectionId) -> Option<ThemeId> {
        self.votes.get(&connection_id).copied()
    }

    /// Returns `true` if `connection_id` holds host authority.
    pub fn is_host(&self, connection_id: ConnectionId) -> bool {
        self.host_connection == connection_id
    }

    pub fn player(&self, connection_id: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.connection_id == connection_id)
    }

    pub fn player_by_id(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.player_id == player_id)
    }

    pub(crate) fn player_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.connection_id == connection_id)
    }

    /// Members with a live connection, in roster order.
    pub fn connected_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_connected())
    }

    /// Returns `true` if every member is a ghost.
    pub fn all_disconnected(&self) -> bool {
        self.players.iter().all(|p| !p.is_connected())
    }

    /// Case-insensitive name collision with a member other than `player_id`.
    /// Ghosts still hold their name.
    pub fn name_taken(&self, name: &str, player_id: &PlayerId) -> bool {
        let wanted = name.to_lowercase();
        self.players
            .iter()
            .any(|p| &p.player_id != player_id && p.name.to_lowercase() == wanted)
    }

    // -- Guards -------------------------------------------------------------

    /// Rejects unless `connection_id` holds host authority.
    pub fn ensure_host(&self, connection_id: ConnectionId) -> Result<(), RoomError> {
        if self.is_host(connection_id) {
            Ok(())
        } else {
            Err(RoomError::NotHost)
        }
    }

    /// Rejects unless `connection_id` is a member.
    pub fn ensure_member(&self, connection_id: ConnectionId) -> Result<&Player, RoomError> {
        self.player(connection_id).ok_or(RoomError::PlayerNotFound)
    }

    /// Rejects unless the room may move to `target`.
    pub fn ensure_transition(&self, target: RoomStatus) -> Result<(), RoomError> {
        if self.status.can_transition_to(target) {
            Ok(())
        } else {
            Err(RoomError::WrongPhase(self.status))
        }
    }

    /// Moves host authority to the first connected member, if any.
    /// Returns the new host's player id when it changed.
    pub(crate) fn reassign_host(&mut self) -> Option<PlayerId> {
        let next = self.connected_players().next()?;
        let (connection_id, player_id) = (next.connection_id, next.player_id.clone());
        if connection_id == self.host_connection {
            return None;
        }
        self.host_connection = connection_id;
        self.host_player_id = player_id.clone();
        Some(player_id)
    }
}
