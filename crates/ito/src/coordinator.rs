//! The session coordinator: turns client requests into room transitions
//! and fans the results out to every affected connection.
//!
//! # Exclusion
//!
//! One async mutex guards the room store and the session registry
//! together. Every request, disconnect and timer callback runs its whole
//! mutation *and* queues its broadcasts while holding it, so:
//!
//! - no operation observes another's half-applied state
//! - per-room broadcast order equals mutation order
//! - the broadcasts a request causes are queued before its ack
//!
//! Broadcasting never blocks: events go onto unbounded per-connection
//! channels drained by each connection's writer task.
//!
//! # Timers
//!
//! A timer callback may already be waiting on the lock when the action it
//! was meant for gets cancelled. Callbacks therefore re-check, under the
//! lock, that the room still expects them (same countdown deadline, same
//! disconnect instant) before acting.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use ito_protocol::{
    Ack, ClientRequest, Locale, PlayerId, RejoinState, RoomCode, RoomStatus, ServerEvent, Theme,
    ThemeId,
};
use ito_room::{
    Departure, JoinKind, Reconnection, Room, RoomConfig, RoomError, RoomStore, ThemeCatalog, rules,
};
use ito_session::{OutboundSender, SessionError, SessionManager};
use ito_timer::TimerRegistry;
use ito_transport::ConnectionId;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Identifies a pending delayed action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TimerKey {
    /// Majority-vote countdown.
    Countdown(RoomCode),
    /// A ghost's grace window.
    PlayerGrace(RoomCode, PlayerId),
    /// Every member of the room is a ghost.
    RoomGrace(RoomCode),
}

impl TimerKey {
    fn code(&self) -> &RoomCode {
        match self {
            Self::Countdown(code) | Self::PlayerGrace(code, _) | Self::RoomGrace(code) => code,
        }
    }
}

/// State guarded by the coordinator lock.
struct Inner {
    rooms: RoomStore,
    sessions: SessionManager,
    rng: StdRng,
}

/// The event-driven orchestrator behind every connection.
pub struct Coordinator {
    inner: Mutex<Inner>,
    timers: TimerRegistry<TimerKey>,
    locale: Locale,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("locale", &self.locale)
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Creates a coordinator over the built-in theme catalog.
    pub fn new(config: RoomConfig, locale: Locale) -> Arc<Self> {
        Self::with_parts(config, ThemeCatalog::builtin(), locale, StdRng::from_os_rng())
    }

    /// Creates a coordinator with an explicit catalog and random source.
    pub fn with_parts(
        config: RoomConfig,
        catalog: ThemeCatalog,
        locale: Locale,
        rng: StdRng,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                rooms: RoomStore::new(config, catalog),
                sessions: SessionManager::new(),
                rng,
            }),
            timers: TimerRegistry::new(),
            locale,
        })
    }

    /// The language used for rejection messages.
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Registers a connection's outbound channel.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyRegistered`] for a duplicate id.
    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        sender: OutboundSender,
    ) -> Result<(), SessionError> {
        self.inner.lock().await.sessions.register(connection_id, sender)
    }

    /// Forgets a connection. A room member becomes a ghost and gets a
    /// grace window to reconnect.
    pub async fn disconnect(self: &Arc<Self>, connection_id: ConnectionId) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if let Err(e) = inner.sessions.unregister(connection_id) {
            tracing::debug!(%connection_id, error = %e, "disconnect for unknown session");
        }

        let now = Instant::now();
        let Some(gone) = inner.rooms.mark_disconnected(connection_id, now) else {
            return;
        };
        let code = gone.code.clone();

        if let Ok(room) = inner.rooms.get(&code) {
            if let Some(player) = room.player_by_id(&gone.player_id) {
                let player = player.to_ref();
                inner.emit(&code, None, |room, observer| ServerEvent::PlayerDisconnected {
                    player: player.clone(),
                    new_host: gone.new_host.clone(),
                    room: rules::public_view(room, observer),
                });
            }
        }

        let grace = inner.rooms.config().reconnect_grace;
        let deadline = gone.disconnected_at + grace;
        let (key_code, player_id, since) = (code.clone(), gone.player_id.clone(), gone.disconnected_at);
        let this = Arc::downgrade(self);
        self.timers.schedule_at(
            TimerKey::PlayerGrace(code.clone(), gone.player_id.clone()),
            deadline,
            async move {
                if let Some(this) = this.upgrade() {
                    this.player_grace_elapsed(key_code, player_id, since).await;
                }
            },
        );
        if gone.all_disconnected {
            self.schedule_room_grace(&code, deadline);
        }
    }

    /// Applies one client request and returns its acknowledgement.
    ///
    /// Broadcasts caused by the request are queued before this returns.
    pub async fn handle(self: &Arc<Self>, connection_id: ConnectionId, request: ClientRequest) -> Ack {
        let name = request.name();
        let code = request.code().cloned();
        let mut guard = self.inner.lock().await;
        match self.apply(&mut guard, connection_id, request) {
            Ok(ack) => ack,
            Err(e) => {
                tracing::debug!(%connection_id, request = name, code = ?code, error = %e, "request rejected");
                Ack::rejected(e.kind(), e.message(self.locale))
            }
        }
    }

    /// A snapshot of a room, for inspection.
    pub async fn room(&self, code: &RoomCode) -> Option<Room> {
        self.inner.lock().await.rooms.get(code).ok().cloned()
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.inner.lock().await.rooms.len()
    }

    // -- Request dispatch ---------------------------------------------------

    fn apply(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        request: ClientRequest,
    ) -> Result<Ack, RoomError> {
        match request {
            ClientRequest::CreateRoom {
                player_name,
                player_id,
            } => self.create_room(inner, conn, &player_name, player_id),
            ClientRequest::JoinRoom {
                code,
                player_name,
                player_id,
            } => self.join_room(inner, conn, &code, &player_name, player_id),
            ClientRequest::RejoinRoom {
                code,
                player_name,
                player_id,
            } => self.rejoin_room(inner, conn, &code, &player_name, player_id),
            ClientRequest::KickPlayer {
                code,
                target_player_id,
            } => self.kick_player(inner, conn, &code, &target_player_id),
            ClientRequest::LeaveRoom(code) => self.leave_room(inner, conn, &code),
            ClientRequest::StartGame(code) => self.start_game(inner, conn, &code),
            ClientRequest::DrawAnimationComplete(code) => self.draw_complete(inner, conn, &code),
            ClientRequest::ChangeThemeNumber { code, new_number } => {
                self.change_theme_number(inner, conn, &code, new_number)
            }
            ClientRequest::VoteTheme { code, theme_id } => {
                self.vote_theme(inner, conn, &code, theme_id)
            }
            ClientRequest::SkipVoting(code) => self.skip_voting(inner, conn, &code),
            ClientRequest::ForceStartGame { code, theme_id } => {
                self.force_start(inner, conn, &code, theme_id)
            }
            ClientRequest::RevealCard(code) => self.reveal_card(inner, conn, &code),
            ClientRequest::RevealAllCards(code) => self.reveal_all(inner, conn, &code),
            ClientRequest::ResetGame(code) => self.reset_game(inner, conn, &code),
        }
    }

    // -- Membership ---------------------------------------------------------

    fn create_room(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        name: &str,
        player_id: PlayerId,
    ) -> Result<Ack, RoomError> {
        let previous = inner.rooms.room_of(conn).cloned();
        let room = inner.rooms.create_room(conn, name, player_id, &mut inner.rng)?;
        let view = rules::public_view(room, conn);
        self.leave_previous(inner, conn, previous, &view.code);
        Ok(Ack::with_room(view))
    }

    fn join_room(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
        name: &str,
        player_id: PlayerId,
    ) -> Result<Ack, RoomError> {
        let previous = inner.rooms.room_of(conn).cloned();
        let kind = inner.rooms.join_room(code, conn, name, player_id.clone())?;
        self.leave_previous(inner, conn, previous, code);

        match kind {
            JoinKind::New => inner.announce_arrival(code, conn, false),
            JoinKind::Rebound { previous } => {
                tracing::debug!(%code, %previous, %conn, "seat moved to new connection");
                self.cancel_grace(code, &player_id);
                inner.announce_arrival(code, conn, true);
            }
        }
        Ok(Ack::with_room(rules::public_view(inner.rooms.get(code)?, conn)))
    }

    fn rejoin_room(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
        name: &str,
        player_id: PlayerId,
    ) -> Result<Ack, RoomError> {
        let previous = inner.rooms.room_of(conn).cloned();
        let outcome = inner.rooms.reconnect_player(code, conn, player_id.clone(), name)?;
        self.leave_previous(inner, conn, previous, code);
        self.cancel_grace(code, &player_id);

        match outcome {
            Reconnection::Rejoined => inner.announce_arrival(code, conn, false),
            Reconnection::Reconnected { previous } => {
                tracing::debug!(%code, %previous, %conn, "seat moved to new connection");
                inner.announce_arrival(code, conn, true);
            }
        }

        let room = inner.rooms.get(code)?;
        let state = match room.status() {
            RoomStatus::Lobby => RejoinState::Lobby(rules::public_view(room, conn)),
            RoomStatus::Drawing => RejoinState::Drawing {
                room: rules::public_view(room, conn),
                drawn_number: room.drawn_number(),
            },
            RoomStatus::Voting => RejoinState::Voting(rules::voting_view(room, conn, Instant::now())),
            RoomStatus::Playing | RoomStatus::Reveal => {
                RejoinState::Playing(rules::game_view(room, conn))
            }
        };
        Ok(Ack::rejoined(state))
    }

    fn kick_player(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
        target: &PlayerId,
    ) -> Result<Ack, RoomError> {
        let kicked = inner.rooms.kick_player(code, conn, target)?;
        self.timers.cancel(&TimerKey::PlayerGrace(code.clone(), target.clone()));

        inner.sessions.send(
            kicked.connection_id(),
            ServerEvent::KickedFromRoom {
                code: code.clone(),
                message: kicked_message(self.locale).to_owned(),
            },
        );

        let player = kicked.to_ref();
        inner.emit(code, None, |room, observer| ServerEvent::PlayerLeft {
            player: player.clone(),
            room: rules::public_view(room, observer),
        });
        Ok(Ack::with_room(rules::public_view(inner.rooms.get(code)?, conn)))
    }

    fn leave_room(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
    ) -> Result<Ack, RoomError> {
        inner.rooms.get(code)?.ensure_member(conn)?;
        if let Some(departure) = inner.rooms.leave_room(conn) {
            self.after_departure(inner, departure);
        }
        Ok(Ack::ok())
    }

    /// Drops `conn`'s seat in `previous` once it holds one in `current`.
    fn leave_previous(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        previous: Option<RoomCode>,
        current: &RoomCode,
    ) {
        let Some(previous) = previous.filter(|p| p != current) else {
            return;
        };
        if let Some(departure) = inner.rooms.remove_connection(&previous, conn) {
            self.after_departure(inner, departure);
        }
    }

    /// Notifies the remaining members and settles any round the departure
    /// completed.
    fn after_departure(self: &Arc<Self>, inner: &mut Inner, departure: Departure) {
        let code = departure.code;
        if departure.room_deleted {
            self.timers.cancel_where(|key| key.code() == &code);
            return;
        }
        self.timers.cancel(&TimerKey::PlayerGrace(code.clone(), departure.player.player_id().clone()));

        let player = departure.player.to_ref();
        inner.emit(&code, None, |room, observer| ServerEvent::PlayerLeft {
            player: player.clone(),
            room: rules::public_view(room, observer),
        });

        let Ok(room) = inner.rooms.get(&code) else {
            return;
        };
        if room.all_disconnected() && !self.timers.is_scheduled(&TimerKey::RoomGrace(code.clone())) {
            let deadline = Instant::now() + inner.rooms.config().reconnect_grace;
            self.schedule_room_grace(&code, deadline);
        }
        match room.status() {
            RoomStatus::Voting => {
                if inner.rooms.tally(&code).is_ok_and(|t| t.all_voted()) {
                    if let Err(e) = self.resolve_vote(inner, &code) {
                        tracing::warn!(%code, error = %e, "could not resolve vote after departure");
                    }
                }
            }
            RoomStatus::Playing => {
                if let Ok(Some(ordered)) = inner.rooms.finish_if_all_revealed(&code) {
                    inner.emit(&code, None, |_, _| ServerEvent::AllRevealed {
                        ordered_cards: ordered.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    // -- Theme selection ----------------------------------------------------

    fn start_game(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
    ) -> Result<Ack, RoomError> {
        let room = inner.rooms.get(code)?;
        room.ensure_host(conn)?;
        room.ensure_transition(RoomStatus::Drawing)?;
        let min_players = inner.rooms.config().min_players;
        if room.players().len() < min_players {
            return Err(RoomError::NotEnoughPlayers(min_players));
        }

        let drawn_number = inner.rooms.catalog().random_number(&mut inner.rng);
        inner.rooms.set_drawn_number(code, drawn_number)?;
        inner.rooms.set_status(code, RoomStatus::Drawing)?;
        tracing::info!(%code, drawn_number, "theme draw started");

        inner.emit(code, None, |_, _| ServerEvent::DrawNumber {
            code: code.clone(),
            drawn_number,
        });
        Ok(Ack::ok())
    }

    fn draw_complete(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
    ) -> Result<Ack, RoomError> {
        let room = inner.rooms.get(code)?;
        // Every client reports the end of its animation; only the host's
        // report advances the room.
        if !room.is_host(conn) {
            return Ok(Ack::ok());
        }
        if room.status() != RoomStatus::Drawing {
            return Err(RoomError::WrongPhase(room.status()));
        }
        let number = room
            .drawn_number()
            .ok_or(RoomError::WrongPhase(room.status()))?;
        self.open_vote(inner, code, number)?;
        Ok(Ack::ok())
    }

    fn change_theme_number(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
        new_number: Option<u32>,
    ) -> Result<Ack, RoomError> {
        let room = inner.rooms.get(code)?;
        room.ensure_host(conn)?;
        if room.status() != RoomStatus::Voting {
            return Err(RoomError::WrongPhase(room.status()));
        }
        let catalog = inner.rooms.catalog();
        let number = match new_number {
            Some(n) if catalog.contains(n) => n,
            Some(n) => {
                return Err(RoomError::ThemeNumberOutOfRange {
                    number: n,
                    max: catalog.len(),
                });
            }
            None => catalog.random_number(&mut inner.rng),
        };

        inner.rooms.set_drawn_number(code, number)?;
        self.open_vote(inner, code, number)?;
        Ok(Ack::with_drawn_number(number))
    }

    /// Offers the window around `number`, discarding ballots and any
    /// running countdown.
    fn open_vote(self: &Arc<Self>, inner: &mut Inner, code: &RoomCode, number: u32) -> Result<(), RoomError> {
        self.timers.cancel(&TimerKey::Countdown(code.clone()));
        let radius = inner.rooms.config().theme_radius;
        let themes = inner.rooms.catalog().around(number, radius);
        inner.rooms.set_voting_themes(code, themes)?;
        tracing::info!(%code, number, "voting opened");

        let now = Instant::now();
        inner.emit(code, None, |room, observer| {
            ServerEvent::VotingStarted(rules::voting_view(room, observer, now))
        });
        Ok(())
    }

    fn vote_theme(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
        theme_id: ThemeId,
    ) -> Result<Ack, RoomError> {
        let room = inner.rooms.get(code)?;
        if room.status() != RoomStatus::Voting {
            return Err(RoomError::WrongPhase(room.status()));
        }
        let countdown_running = room.majority_countdown_end().is_some();
        let tally = inner.rooms.record_vote(code, conn, theme_id)?;
        tracing::debug!(%code, %conn, theme_id, voted = tally.voted, connected = tally.connected, "vote recorded");

        if tally.all_voted() {
            self.resolve_vote(inner, code)?;
            return Ok(Ack::ok());
        }
        if tally.has_majority() && !countdown_running {
            self.start_countdown(inner, code)?;
        }

        let now = Instant::now();
        inner.emit(code, None, |room, observer| {
            ServerEvent::VoteUpdate(rules::voting_view(room, observer, now))
        });
        Ok(Ack::ok())
    }

    fn start_countdown(self: &Arc<Self>, inner: &mut Inner, code: &RoomCode) -> Result<(), RoomError> {
        let deadline = Instant::now() + inner.rooms.config().majority_countdown;
        inner.rooms.set_countdown(code, Some(deadline))?;

        let this = Arc::downgrade(self);
        let key_code = code.clone();
        self.timers.schedule_at(TimerKey::Countdown(code.clone()), deadline, async move {
            if let Some(this) = this.upgrade() {
                this.countdown_elapsed(key_code, deadline).await;
            }
        });
        tracing::info!(%code, "majority reached, countdown started");
        Ok(())
    }

    fn skip_voting(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
    ) -> Result<Ack, RoomError> {
        let room = inner.rooms.get(code)?;
        room.ensure_host(conn)?;
        if room.status() != RoomStatus::Voting {
            return Err(RoomError::WrongPhase(room.status()));
        }
        let theme = rules::random_theme(room.voting_themes().unwrap_or_default(), &mut inner.rng)
            .ok_or(RoomError::WrongPhase(room.status()))?;
        self.start_round(inner, code, theme)?;
        Ok(Ack::ok())
    }

    fn force_start(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
        theme_id: Option<ThemeId>,
    ) -> Result<Ack, RoomError> {
        let room = inner.rooms.get(code)?;
        room.ensure_host(conn)?;
        if room.status() != RoomStatus::Voting {
            return Err(RoomError::WrongPhase(room.status()));
        }
        let offered = room.voting_themes().unwrap_or_default();
        let chosen = theme_id.and_then(|id| offered.iter().find(|t| t.id == id).cloned());
        let theme = match chosen {
            Some(theme) => theme,
            None => leader_or_random(room, &mut inner.rng)
                .ok_or(RoomError::WrongPhase(room.status()))?,
        };
        self.start_round(inner, code, theme)?;
        Ok(Ack::ok())
    }

    /// Closes the vote on the current leader (random among ties, or among
    /// all offered themes if nobody voted) and starts the round.
    fn resolve_vote(self: &Arc<Self>, inner: &mut Inner, code: &RoomCode) -> Result<(), RoomError> {
        let room = inner.rooms.get(code)?;
        let theme = leader_or_random(room, &mut inner.rng)
            .ok_or(RoomError::WrongPhase(room.status()))?;
        self.start_round(inner, code, theme)
    }

    /// Deals cards on `theme` and sends every member their game view.
    fn start_round(self: &Arc<Self>, inner: &mut Inner, code: &RoomCode, theme: Theme) -> Result<(), RoomError> {
        let theme_id = theme.id;
        inner.rooms.begin_round(code, theme, &mut inner.rng)?;
        self.timers.cancel(&TimerKey::Countdown(code.clone()));
        tracing::info!(%code, theme_id, "game started");

        inner.emit(code, None, |room, observer| {
            ServerEvent::GameStarted(rules::game_view(room, observer))
        });
        Ok(())
    }

    // -- Round --------------------------------------------------------------

    fn reveal_card(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
    ) -> Result<Ack, RoomError> {
        let room = inner.rooms.get(code)?;
        if room.status() != RoomStatus::Playing {
            return Err(RoomError::WrongPhase(room.status()));
        }
        let reveal = inner.rooms.reveal_card(code, conn)?;
        tracing::debug!(%code, player_id = %reveal.card.player_id, card = reveal.card.card, "card revealed");

        inner.emit(code, None, |room, observer| ServerEvent::CardRevealed {
            player: reveal.card.clone(),
            game_state: rules::game_view(room, observer),
        });
        if let Some(ordered) = reveal.ordered {
            tracing::info!(%code, "all cards revealed");
            inner.emit(code, None, |_, _| ServerEvent::AllRevealed {
                ordered_cards: ordered.clone(),
            });
        }
        Ok(Ack::ok())
    }

    fn reveal_all(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
    ) -> Result<Ack, RoomError> {
        let room = inner.rooms.get(code)?;
        room.ensure_host(conn)?;
        if !room.status().is_round() {
            return Err(RoomError::WrongPhase(room.status()));
        }
        let ordered = inner.rooms.reveal_all(code)?;
        tracing::info!(%code, "host revealed all cards");

        inner.emit(code, None, |room, observer| ServerEvent::AllCardsRevealed {
            game_state: rules::game_view(room, observer),
            ordered_cards: ordered.clone(),
        });
        Ok(Ack::ok())
    }

    fn reset_game(
        self: &Arc<Self>,
        inner: &mut Inner,
        conn: ConnectionId,
        code: &RoomCode,
    ) -> Result<Ack, RoomError> {
        let room = inner.rooms.get(code)?;
        room.ensure_host(conn)?;
        room.ensure_transition(RoomStatus::Lobby)?;
        self.timers.cancel(&TimerKey::Countdown(code.clone()));
        inner.rooms.reset_room(code)?;

        inner.emit(code, None, |room, observer| {
            ServerEvent::GameReset(rules::public_view(room, observer))
        });
        Ok(Ack::ok())
    }

    // -- Timers -------------------------------------------------------------

    fn cancel_grace(&self, code: &RoomCode, player_id: &PlayerId) {
        self.timers.cancel(&TimerKey::PlayerGrace(code.clone(), player_id.clone()));
        self.timers.cancel(&TimerKey::RoomGrace(code.clone()));
    }

    fn schedule_room_grace(self: &Arc<Self>, code: &RoomCode, deadline: Instant) {
        let this: Weak<Self> = Arc::downgrade(self);
        let key_code = code.clone();
        self.timers.schedule_at(TimerKey::RoomGrace(code.clone()), deadline, async move {
            if let Some(this) = this.upgrade() {
                this.room_grace_elapsed(key_code).await;
            }
        });
    }

    async fn countdown_elapsed(self: Arc<Self>, code: RoomCode, deadline: Instant) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let still_wanted = inner.rooms.get(&code).is_ok_and(|room| {
            room.status() == RoomStatus::Voting && room.majority_countdown_end() == Some(deadline)
        });
        if !still_wanted {
            return;
        }
        tracing::info!(%code, "countdown elapsed, resolving vote");
        if let Err(e) = self.resolve_vote(inner, &code) {
            tracing::warn!(%code, error = %e, "could not resolve vote after countdown");
        }
    }

    async fn player_grace_elapsed(self: Arc<Self>, code: RoomCode, player_id: PlayerId, since: Instant) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if let Some(departure) = inner.rooms.expire_player(&code, &player_id, since) {
            self.after_departure(inner, departure);
        }
    }

    async fn room_grace_elapsed(self: Arc<Self>, code: RoomCode) {
        let mut guard = self.inner.lock().await;
        if guard.rooms.expire_room(&code).is_some() {
            self.timers.cancel_where(|key| key.code() == &code);
        }
    }
}

impl Inner {
    /// Sends one event per connected member of `code`, built for that
    /// member, skipping `except`.
    fn emit(
        &self,
        code: &RoomCode,
        except: Option<ConnectionId>,
        event: impl Fn(&Room, ConnectionId) -> ServerEvent,
    ) {
        let Ok(room) = self.rooms.get(code) else {
            return;
        };
        for player in room.connected_players() {
            let observer = player.connection_id();
            if Some(observer) != except {
                self.sessions.send(observer, event(room, observer));
            }
        }
    }

    /// Tells everyone else in the room that `conn` arrived.
    fn announce_arrival(&self, code: &RoomCode, conn: ConnectionId, returning: bool) {
        let Some(player) = self.rooms.get(code).ok().and_then(|r| r.player(conn)) else {
            return;
        };
        let player = player.to_ref();
        self.emit(code, Some(conn), |room, observer| {
            let room = rules::public_view(room, observer);
            if returning {
                ServerEvent::PlayerReconnected {
                    player: player.clone(),
                    room,
                }
            } else {
                ServerEvent::PlayerJoined {
                    player: player.clone(),
                    room,
                }
            }
        });
    }
}

/// The vote leader, or a random offered theme when nobody voted.
fn leader_or_random(room: &Room, rng: &mut StdRng) -> Option<Theme> {
    let themes = room.voting_themes().unwrap_or_default();
    let votes: HashMap<ConnectionId, ThemeId> = room
        .players()
        .iter()
        .filter_map(|p| room.vote_of(p.connection_id()).map(|v| (p.connection_id(), v)))
        .collect();
    rules::vote_winner(themes, &votes, rng).or_else(|| rules::random_theme(themes, rng))
}

fn kicked_message(locale: Locale) -> &'static str {
    match locale {
        Locale::Pt => "Você foi removido da sala pelo host",
        Locale::En => "You were removed from the room by the host",
    }
}
