//! The room store: sole owner of every live room.
//!
//! All mutation goes through this type. Operations run to completion
//! under the caller's exclusive borrow, so nobody ever observes a
//! half-updated room. Guards that depend on who is calling (host-only,
//! phase checks) live on [`Room`]; the store enforces membership,
//! capacity, and naming rules and keeps its connection index in sync.

use std::collections::HashMap;

use ito_protocol::{
    OrderedCard, PlayerId, RevealedCard, RoomCode, RoomStatus, Theme, ThemeId,
};
use ito_transport::ConnectionId;
use rand::Rng;
use tokio::time::Instant;

use crate::{Player, Room, RoomConfig, RoomError, ThemeCatalog, rules};

/// Characters used in room codes. Excludes `0`, `O`, `1` and `I`.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a room code.
pub const CODE_LEN: usize = 4;

const MAX_CODE_ATTEMPTS: usize = 1_000;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How a join request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// A new member was added.
    New,
    /// The player id was already a member; its seat moved to the new
    /// connection.
    Rebound { previous: ConnectionId },
}

/// How a rejoin request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconnection {
    /// The player was no longer a member and was re-admitted to the lobby.
    Rejoined,
    /// The existing seat moved to the new connection.
    Reconnected { previous: ConnectionId },
}

/// A member removed from a room.
#[derive(Debug, Clone)]
pub struct Departure {
    pub code: RoomCode,
    pub player: Player,
    /// Set when host authority moved because of this departure.
    pub new_host: Option<PlayerId>,
    /// The room was destroyed because it became empty.
    pub room_deleted: bool,
}

/// A member that lost its connection and is now a ghost.
#[derive(Debug, Clone)]
pub struct Disconnection {
    pub code: RoomCode,
    pub player_id: PlayerId,
    pub disconnected_at: Instant,
    /// Set when host authority moved because of this disconnect.
    pub new_host: Option<PlayerId>,
    /// Every member of the room is now disconnected.
    pub all_disconnected: bool,
}

/// Ballots cast by currently connected members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTally {
    pub voted: usize,
    pub connected: usize,
}

impl VoteTally {
    /// Every connected member has voted.
    pub fn all_voted(self) -> bool {
        self.connected > 0 && self.voted >= self.connected
    }

    /// Strictly more than half of the connected members have voted.
    pub fn has_majority(self) -> bool {
        self.voted * 2 > self.connected
    }
}

/// The result of one player revealing.
#[derive(Debug, Clone)]
pub struct Reveal {
    pub card: RevealedCard,
    /// Present when this reveal completed the round.
    pub ordered: Option<Vec<OrderedCard>>,
}

// ---------------------------------------------------------------------------
// RoomStore
// ---------------------------------------------------------------------------

/// All live rooms, keyed by code, plus an index from live connection to
/// the room it belongs to.
#[derive(Debug)]
pub struct RoomStore {
    rooms: HashMap<RoomCode, Room>,
    connections: HashMap<ConnectionId, RoomCode>,
    config: RoomConfig,
    catalog: ThemeCatalog,
}

impl RoomStore {
    pub fn new(config: RoomConfig, catalog: ThemeCatalog) -> Self {
        Self {
            rooms: HashMap::new(),
            connections: HashMap::new(),
            config,
            catalog,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ThemeCatalog {
        &self.catalog
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Looks up a room.
    ///
    /// # Errors
    /// Returns [`RoomError::RoomNotFound`] for an unknown code.
    pub fn get(&self, code: &RoomCode) -> Result<&Room, RoomError> {
        self.rooms
            .get(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))
    }

    /// The room a live connection belongs to.
    pub fn room_of(&self, connection_id: ConnectionId) -> Option<&RoomCode> {
        self.connections.get(&connection_id)
    }

    fn room_mut(&mut self, code: &RoomCode) -> Result<&mut Room, RoomError> {
        self.rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))
    }

    fn validate_name(&self, raw: &str) -> Result<String, RoomError> {
        self.config
            .validate_name(raw)
            .ok_or(RoomError::InvalidName(self.config.max_name_len))
    }

    fn generate_code(&self, rng: &mut impl Rng) -> Result<RoomCode, RoomError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code: String = (0..CODE_LEN)
                .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
                .collect();
            let code = RoomCode::from(code);
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(RoomError::CodeSpaceExhausted)
    }

    // -- Membership ---------------------------------------------------------

    /// Creates a room with the caller as host.
    ///
    /// # Errors
    /// [`RoomError::InvalidName`] or, if no unused code could be found,
    /// [`RoomError::CodeSpaceExhausted`].
    pub fn create_room(
        &mut self,
        connection_id: ConnectionId,
        name: &str,
        player_id: PlayerId,
        rng: &mut impl Rng,
    ) -> Result<&Room, RoomError> {
        let name = self.validate_name(name)?;
        let code = self.generate_code(rng)?;
        let host = Player::new(connection_id, player_id, name);

        self.connections.insert(connection_id, code.clone());
        tracing::info!(%code, host = %host.player_id, "room created");
        Ok(self
            .rooms
            .entry(code.clone())
            .or_insert_with(|| Room::new(code, host)))
    }

    /// Adds a player to a lobby.
    ///
    /// A player id that is already a member keeps its seat and moves to
    /// the new connection instead of being added twice.
    ///
    /// # Errors
    /// [`RoomError::RoomNotFound`], [`RoomError::GameInProgress`],
    /// [`RoomError::InvalidName`], [`RoomError::RoomFull`] or
    /// [`RoomError::NameTaken`].
    pub fn join_room(
        &mut self,
        code: &RoomCode,
        connection_id: ConnectionId,
        name: &str,
        player_id: PlayerId,
    ) -> Result<JoinKind, RoomError> {
        let name = self.validate_name(name)?;
        let max_players = self.config.max_players;
        let room = self.room_mut(code)?;

        if !room.status.is_joinable() {
            return Err(RoomError::GameInProgress);
        }
        if let Some(index) = room.players.iter().position(|p| p.player_id == player_id) {
            let previous = rebind(room, index, connection_id);
            self.reindex(previous, connection_id, code);
            return Ok(JoinKind::Rebound { previous });
        }
        if room.players.len() >= max_players {
            return Err(RoomError::RoomFull(max_players));
        }
        if room.name_taken(&name, &player_id) {
            return Err(RoomError::NameTaken(name));
        }

        tracing::debug!(%code, %player_id, "player joined");
        room.players.push(Player::new(connection_id, player_id, name));
        self.connections.insert(connection_id, code.clone());
        Ok(JoinKind::New)
    }

    /// Resumes a seat after a dropped connection.
    ///
    /// If the player id is no longer a member and the room is in the
    /// lobby, it is admitted again as a new member.
    ///
    /// # Errors
    /// [`RoomError::RoomNotFound`]; for re-admission, the same errors as
    /// [`join_room`](Self::join_room).
    pub fn reconnect_player(
        &mut self,
        code: &RoomCode,
        connection_id: ConnectionId,
        player_id: PlayerId,
        name: &str,
    ) -> Result<Reconnection, RoomError> {
        let room = self.room_mut(code)?;
        match room.players.iter().position(|p| p.player_id == player_id) {
            Some(index) => {
                let previous = rebind(room, index, connection_id);
                self.reindex(previous, connection_id, code);
                tracing::info!(%code, %player_id, "player reconnected");
                Ok(Reconnection::Reconnected { previous })
            }
            None => match self.join_room(code, connection_id, name, player_id)? {
                JoinKind::New => Ok(Reconnection::Rejoined),
                JoinKind::Rebound { previous } => Ok(Reconnection::Reconnected { previous }),
            },
        }
    }

    fn reindex(&mut self, previous: ConnectionId, current: ConnectionId, code: &RoomCode) {
        if previous != current {
            self.connections.remove(&previous);
        }
        self.connections.insert(current, code.clone());
    }

    /// Removes `target` from a lobby on the host's behalf.
    ///
    /// # Errors
    /// [`RoomError::RoomNotFound`], [`RoomError::NotHost`],
    /// [`RoomError::WrongPhase`], [`RoomError::PlayerNotFound`] or
    /// [`RoomError::CannotKickSelf`].
    pub fn kick_player(
        &mut self,
        code: &RoomCode,
        caller: ConnectionId,
        target: &PlayerId,
    ) -> Result<Player, RoomError> {
        let room = self.get(code)?;
        room.ensure_host(caller)?;
        if room.status != RoomStatus::Lobby {
            return Err(RoomError::WrongPhase(room.status));
        }
        let index = room
            .players
            .iter()
            .position(|p| &p.player_id == target)
            .ok_or(RoomError::PlayerNotFound)?;
        if room.players[index].connection_id == caller {
            return Err(RoomError::CannotKickSelf);
        }

        let departure = self.remove_member(code, index)?;
        tracing::info!(%code, player_id = %target, "player kicked");
        Ok(departure.player)
    }

    /// Removes the member on `connection_id` from whatever room it is in.
    pub fn leave_room(&mut self, connection_id: ConnectionId) -> Option<Departure> {
        let code = self.connections.get(&connection_id)?.clone();
        self.remove_connection(&code, connection_id)
    }

    /// Removes the member on `connection_id` from `code` only. Used when a
    /// connection has already taken a seat elsewhere.
    pub fn remove_connection(&mut self, code: &RoomCode, connection_id: ConnectionId) -> Option<Departure> {
        let index = self
            .rooms
            .get(code)?
            .players
            .iter()
            .position(|p| p.connection_id == connection_id)?;
        self.remove_member(code, index).ok()
    }

    /// Flags the member on `connection_id` as a ghost and moves host
    /// authority to the first connected member if needed.
    pub fn mark_disconnected(
        &mut self,
        connection_id: ConnectionId,
        now: Instant,
    ) -> Option<Disconnection> {
        let code = self.connections.remove(&connection_id)?;
        let room = self.rooms.get_mut(&code)?;
        let player = room.player_mut(connection_id)?;
        player.disconnected_at = Some(now);
        let player_id = player.player_id.clone();

        let new_host = if room.is_host(connection_id) {
            room.reassign_host()
        } else {
            None
        };
        let all_disconnected = room.all_disconnected();
        tracing::info!(%code, %player_id, ?new_host, all_disconnected, "player disconnected");

        Some(Disconnection {
            code,
            player_id,
            disconnected_at: now,
            new_host,
            all_disconnected,
        })
    }

    /// Removes a ghost whose grace window ran out.
    ///
    /// Does nothing unless the player is still disconnected since exactly
    /// `since`; a reconnect (or a later disconnect) supersedes the expiry.
    pub fn expire_player(
        &mut self,
        code: &RoomCode,
        player_id: &PlayerId,
        since: Instant,
    ) -> Option<Departure> {
        let index = self
            .rooms
            .get(code)?
            .players
            .iter()
            .position(|p| &p.player_id == player_id && p.disconnected_at == Some(since))?;
        let departure = self.remove_member(code, index).ok()?;
        tracing::info!(%code, %player_id, "disconnected player expired");
        Some(departure)
    }

    /// Destroys a room if every member is still disconnected.
    pub fn expire_room(&mut self, code: &RoomCode) -> Option<Room> {
        if !self.rooms.get(code)?.all_disconnected() {
            return None;
        }
        let room = self.rooms.remove(code)?;
        for player in &room.players {
            self.connections.remove(&player.connection_id);
        }
        tracing::info!(%code, "abandoned room destroyed");
        Some(room)
    }

    fn remove_member(&mut self, code: &RoomCode, index: usize) -> Result<Departure, RoomError> {
        let room = self.room_mut(code)?;
        let player = room.players.remove(index);
        room.votes.remove(&player.connection_id);

        let mut new_host = None;
        if room.host_player_id == player.player_id {
            new_host = room.reassign_host();
            if new_host.is_none() {
                if let Some(first) = room.players.first() {
                    room.host_connection = first.connection_id;
                    room.host_player_id = first.player_id.clone();
                    new_host = Some(first.player_id.clone());
                }
            }
        }

        let room_deleted = room.players.is_empty();
        if self.connections.get(&player.connection_id) == Some(code) {
            self.connections.remove(&player.connection_id);
        }
        if room_deleted {
            self.rooms.remove(code);
            tracing::info!(%code, "room destroyed (empty)");
        }

        Ok(Departure {
            code: code.clone(),
            player,
            new_host,
            room_deleted,
        })
    }

    // -- Narrow setters -----------------------------------------------------

    /// Sets the room's status.
    pub fn set_status(&mut self, code: &RoomCode, status: RoomStatus) -> Result<(), RoomError> {
        self.room_mut(code)?.status = status;
        Ok(())
    }

    /// Records the number that seeds the theme window.
    pub fn set_drawn_number(&mut self, code: &RoomCode, number: u32) -> Result<(), RoomError> {
        self.room_mut(code)?.drawn_number = Some(number);
        Ok(())
    }

    /// Opens a vote over `themes`: clears ballots, any running countdown
    /// and any previous selection, and moves the room to voting.
    pub fn set_voting_themes(&mut self, code: &RoomCode, themes: Vec<Theme>) -> Result<(), RoomError> {
        let room = self.room_mut(code)?;
        room.voting_themes = Some(themes);
        room.votes.clear();
        room.majority_countdown_end = None;
        room.selected_theme = None;
        room.status = RoomStatus::Voting;
        Ok(())
    }

    /// Sets or clears the majority countdown deadline.
    pub fn set_countdown(&mut self, code: &RoomCode, end: Option<Instant>) -> Result<(), RoomError> {
        self.room_mut(code)?.majority_countdown_end = end;
        Ok(())
    }

    /// Records (or changes) the caller's ballot.
    ///
    /// # Errors
    /// [`RoomError::PlayerNotFound`] for a non-member and
    /// [`RoomError::ThemeNotFound`] for a theme not on offer.
    pub fn record_vote(
        &mut self,
        code: &RoomCode,
        connection_id: ConnectionId,
        theme_id: ThemeId,
    ) -> Result<VoteTally, RoomError> {
        let room = self.room_mut(code)?;
        room.ensure_member(connection_id)?;
        let on_offer = room
            .voting_themes
            .as_deref()
            .is_some_and(|themes| themes.iter().any(|t| t.id == theme_id));
        if !on_offer {
            return Err(RoomError::ThemeNotFound(theme_id));
        }
        room.votes.insert(connection_id, theme_id);
        self.tally(code)
    }

    /// Counts ballots from connected members.
    pub fn tally(&self, code: &RoomCode) -> Result<VoteTally, RoomError> {
        let room = self.get(code)?;
        let connected: Vec<&Player> = room.connected_players().collect();
        Ok(VoteTally {
            voted: connected
                .iter()
                .filter(|p| room.votes.contains_key(&p.connection_id))
                .count(),
            connected: connected.len(),
        })
    }

    /// Starts a round on `theme`: deals cards, stops the countdown and
    /// moves the room to playing. On error the room is unchanged.
    pub fn begin_round(
        &mut self,
        code: &RoomCode,
        theme: Theme,
        rng: &mut impl Rng,
    ) -> Result<(), RoomError> {
        let room = self.room_mut(code)?;
        rules::deal_cards(&mut room.players, rng)?;
        room.selected_theme = Some(theme);
        room.majority_countdown_end = None;
        room.status = RoomStatus::Playing;
        tracing::info!(%code, players = room.players.len(), "round started");
        Ok(())
    }

    /// Reveals the caller's card. If that completes the round the room
    /// moves to reveal and the ordered cards are returned.
    ///
    /// # Errors
    /// [`RoomError::PlayerNotFound`] for a non-member.
    pub fn reveal_card(&mut self, code: &RoomCode, connection_id: ConnectionId) -> Result<Reveal, RoomError> {
        let room = self.room_mut(code)?;
        let card = room
            .ensure_member(connection_id)?
            .card
            .ok_or(RoomError::WrongPhase(room.status))?;
        let player = rules::reveal_card(&mut room.players, connection_id).ok_or(RoomError::PlayerNotFound)?;
        let card = RevealedCard {
            player_id: player.player_id.clone(),
            name: player.name.clone(),
            card,
        };
        Ok(Reveal {
            card,
            ordered: self.finish_if_all_revealed(code)?,
        })
    }

    /// Moves the room to reveal if every card is showing.
    pub fn finish_if_all_revealed(&mut self, code: &RoomCode) -> Result<Option<Vec<OrderedCard>>, RoomError> {
        let room = self.room_mut(code)?;
        if room.status != RoomStatus::Playing || !rules::all_revealed(&room.players) {
            return Ok(None);
        }
        room.status = RoomStatus::Reveal;
        Ok(Some(rules::ordered_reveal(&room.players)))
    }

    /// Reveals every card and moves the room to reveal.
    pub fn reveal_all(&mut self, code: &RoomCode) -> Result<Vec<OrderedCard>, RoomError> {
        let room = self.room_mut(code)?;
        for player in &mut room.players {
            player.revealed = true;
        }
        room.status = RoomStatus::Reveal;
        Ok(rules::ordered_reveal(&room.players))
    }

    /// Returns the room to the lobby, keeping roster and host.
    pub fn reset_room(&mut self, code: &RoomCode) -> Result<(), RoomError> {
        let room = self.room_mut(code)?;
        room.status = RoomStatus::Lobby;
        room.voting_themes = None;
        room.votes.clear();
        room.selected_theme = None;
        room.drawn_number = None;
        room.majority_countdown_end = None;
        for player in &mut room.players {
            player.card = None;
            player.revealed = false;
        }
        tracing::info!(%code, "room reset");
        Ok(())
    }
}

/// Moves the seat at `index` to `connection_id`: clears the ghost flag,
/// carries the pending ballot over and restores host authority where the
/// player is entitled to it. Returns the previous connection id.
fn rebind(room: &mut Room, index: usize, connection_id: ConnectionId) -> ConnectionId {
    let player = &mut room.players[index];
    let previous = std::mem::replace(&mut player.connection_id, connection_id);
    player.disconnected_at = None;
    let player_id = player.player_id.clone();

    if let Some(vote) = room.votes.remove(&previous) {
        room.votes.insert(connection_id, vote);
    }
    if room.host_connection == previous || room.original_host == player_id {
        room.host_connection = connection_id;
        room.host_player_id = player_id;
    }
    previous
}
