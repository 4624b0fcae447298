//! Room-level messages: what clients ask for, how the server answers, and
//! what it pushes unprompted.

use serde::{Deserialize, Serialize};

use crate::{
    ErrorKind, GameView, OrderedCard, PlayerId, PlayerRef, PublicRoomView,
    RevealedCard, RoomCode, ThemeId, VotingView,
};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A room operation requested by a client.
///
/// Tagged by event name: `{"event": "vote-theme", "data": {"code": "K7QM",
/// "themeId": 62}}`. Operations that only need a room code carry the bare
/// code string as `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientRequest {
    CreateRoom {
        player_name: String,
        player_id: PlayerId,
    },
    JoinRoom {
        code: RoomCode,
        player_name: String,
        player_id: PlayerId,
    },
    /// Resume a seat after a dropped connection.
    RejoinRoom {
        code: RoomCode,
        player_name: String,
        player_id: PlayerId,
    },
    KickPlayer {
        code: RoomCode,
        target_player_id: PlayerId,
    },
    LeaveRoom(RoomCode),
    StartGame(RoomCode),
    DrawAnimationComplete(RoomCode),
    ChangeThemeNumber {
        code: RoomCode,
        /// `None` asks the server for a fresh random draw.
        #[serde(default)]
        new_number: Option<u32>,
    },
    VoteTheme {
        code: RoomCode,
        theme_id: ThemeId,
    },
    SkipVoting(RoomCode),
    ForceStartGame {
        code: RoomCode,
        #[serde(default)]
        theme_id: Option<ThemeId>,
    },
    RevealCard(RoomCode),
    RevealAllCards(RoomCode),
    ResetGame(RoomCode),
}

impl ClientRequest {
    /// The wire event name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create-room",
            Self::JoinRoom { .. } => "join-room",
            Self::RejoinRoom { .. } => "rejoin-room",
            Self::KickPlayer { .. } => "kick-player",
            Self::LeaveRoom(_) => "leave-room",
            Self::StartGame(_) => "start-game",
            Self::DrawAnimationComplete(_) => "draw-animation-complete",
            Self::ChangeThemeNumber { .. } => "change-theme-number",
            Self::VoteTheme { .. } => "vote-theme",
            Self::SkipVoting(_) => "skip-voting",
            Self::ForceStartGame { .. } => "force-start-game",
            Self::RevealCard(_) => "reveal-card",
            Self::RevealAllCards(_) => "reveal-all-cards",
            Self::ResetGame(_) => "reset-game",
        }
    }

    /// The room the request targets; `None` only for `create-room`.
    pub fn code(&self) -> Option<&RoomCode> {
        match self {
            Self::CreateRoom { .. } => None,
            Self::JoinRoom { code, .. }
            | Self::RejoinRoom { code, .. }
            | Self::KickPlayer { code, .. }
            | Self::ChangeThemeNumber { code, .. }
            | Self::VoteTheme { code, .. }
            | Self::ForceStartGame { code, .. }
            | Self::LeaveRoom(code)
            | Self::StartGame(code)
            | Self::DrawAnimationComplete(code)
            | Self::SkipVoting(code)
            | Self::RevealCard(code)
            | Self::RevealAllCards(code)
            | Self::ResetGame(code) => Some(code),
        }
    }
}

// ---------------------------------------------------------------------------
// Broadcasts
// ---------------------------------------------------------------------------

/// A message pushed to one or more room members. Every variant carries a
/// view projected for the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    PlayerJoined {
        player: PlayerRef,
        room: PublicRoomView,
    },
    PlayerLeft {
        player: PlayerRef,
        room: PublicRoomView,
    },
    PlayerDisconnected {
        player: PlayerRef,
        /// Set when host authority moved because of this disconnect.
        new_host: Option<PlayerId>,
        room: PublicRoomView,
    },
    PlayerReconnected {
        player: PlayerRef,
        room: PublicRoomView,
    },
    /// Start of the draw animation; the theme window is not known yet.
    DrawNumber {
        code: RoomCode,
        drawn_number: u32,
    },
    VotingStarted(VotingView),
    VoteUpdate(VotingView),
    GameStarted(GameView),
    CardRevealed {
        player: RevealedCard,
        game_state: GameView,
    },
    AllRevealed {
        ordered_cards: Vec<OrderedCard>,
    },
    AllCardsRevealed {
        game_state: GameView,
        ordered_cards: Vec<OrderedCard>,
    },
    GameReset(PublicRoomView),
    KickedFromRoom {
        code: RoomCode,
        message: String,
    },
}

impl ServerEvent {
    /// The wire event name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayerJoined { .. } => "player-joined",
            Self::PlayerLeft { .. } => "player-left",
            Self::PlayerDisconnected { .. } => "player-disconnected",
            Self::PlayerReconnected { .. } => "player-reconnected",
            Self::DrawNumber { .. } => "draw-number",
            Self::VotingStarted(_) => "voting-started",
            Self::VoteUpdate(_) => "vote-update",
            Self::GameStarted(_) => "game-started",
            Self::CardRevealed { .. } => "card-revealed",
            Self::AllRevealed { .. } => "all-revealed",
            Self::AllCardsRevealed { .. } => "all-cards-revealed",
            Self::GameReset(_) => "game-reset",
            Self::KickedFromRoom { .. } => "kicked-from-room",
        }
    }
}

// ---------------------------------------------------------------------------
// Acknowledgements
// ---------------------------------------------------------------------------

/// Which view a rejoin acknowledgement carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejoinPhase {
    Lobby,
    Drawing,
    Voting,
    Playing,
}

/// What a reconnecting client needs to restore its screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejoinState {
    Lobby(PublicRoomView),
    Drawing {
        room: PublicRoomView,
        drawn_number: Option<u32>,
    },
    Voting(VotingView),
    Playing(GameView),
}

/// The single response to a request.
///
/// Either `{"success": true, ...}` with the fields the operation returns,
/// or `{"success": false, "error": "...", "kind": "..."}`. Absent fields
/// are omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<PublicRoomView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawn_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RejoinPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_state: Option<VotingView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_state: Option<GameView>,
}

impl Ack {
    /// `{"success": true}`.
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// `{"success": true, "room": ...}`.
    pub fn with_room(room: PublicRoomView) -> Self {
        Self {
            room: Some(room),
            ..Self::ok()
        }
    }

    /// `{"success": true, "drawnNumber": n}`.
    pub fn with_drawn_number(drawn_number: u32) -> Self {
        Self {
            drawn_number: Some(drawn_number),
            ..Self::ok()
        }
    }

    /// `{"success": true, "state": ..., <matching view>}`.
    pub fn rejoined(state: RejoinState) -> Self {
        match state {
            RejoinState::Lobby(room) => Self {
                state: Some(RejoinPhase::Lobby),
                ..Self::with_room(room)
            },
            RejoinState::Drawing { room, drawn_number } => Self {
                state: Some(RejoinPhase::Drawing),
                drawn_number,
                ..Self::with_room(room)
            },
            RejoinState::Voting(view) => Self {
                state: Some(RejoinPhase::Voting),
                voting_state: Some(view),
                ..Self::ok()
            },
            RejoinState::Playing(view) => Self {
                state: Some(RejoinPhase::Playing),
                game_state: Some(view),
                ..Self::ok()
            },
        }
    }

    /// `{"success": false, "error": message, "kind": kind}`.
    pub fn rejected(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            kind: Some(kind),
            ..Self::default()
        }
    }
}
