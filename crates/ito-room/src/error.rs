//! Error types for the room layer.
//!
//! Every rejection carries an [`ErrorKind`] for clients to branch on and a
//! localized message for them to display. A rejected operation never
//! leaves a room partially modified.

use ito_protocol::{ErrorKind, Locale, RoomCode, RoomStatus, ThemeId};

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// The caller or the targeted player is not a member of the room.
    #[error("player not found in room")]
    PlayerNotFound,

    /// The theme id is not part of the catalog or the current vote.
    #[error("theme {0} not found")]
    ThemeNotFound(ThemeId),

    /// A host-only action was requested by someone else.
    #[error("only the host can do this")]
    NotHost,

    /// A join arrived after the round left the lobby.
    #[error("game already in progress")]
    GameInProgress,

    /// The action is not valid in the room's current status.
    #[error("action not allowed while room is {0}")]
    WrongPhase(RoomStatus),

    /// The room already holds the maximum number of players.
    #[error("room is full (max {0} players)")]
    RoomFull(usize),

    /// Too few players to start.
    #[error("at least {0} players are required")]
    NotEnoughPlayers(usize),

    /// Another player in the room already uses this name.
    #[error("name {0:?} is already taken")]
    NameTaken(String),

    /// The host tried to kick themselves.
    #[error("the host cannot kick themselves")]
    CannotKickSelf,

    /// Empty or overlong display name.
    #[error("name must be 1 to {0} characters")]
    InvalidName(usize),

    /// A requested theme number is outside the catalog.
    #[error("theme number must be between 1 and {max}, got {number}")]
    ThemeNumberOutOfRange { number: u32, max: u32 },

    /// More players than distinct card values.
    #[error("cannot deal unique cards to {0} players")]
    DeckExhausted(usize),

    /// Every attempt to generate an unused room code collided.
    #[error("no free room code available")]
    CodeSpaceExhausted,
}

impl RoomError {
    /// The classification sent alongside the message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound(_) | Self::PlayerNotFound | Self::ThemeNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::NotHost | Self::CannotKickSelf => ErrorKind::Unauthorized,
            Self::GameInProgress | Self::WrongPhase(_) => ErrorKind::InvalidPhase,
            Self::RoomFull(_)
            | Self::NotEnoughPlayers(_)
            | Self::DeckExhausted(_)
            | Self::CodeSpaceExhausted => ErrorKind::Capacity,
            Self::NameTaken(_) => ErrorKind::Conflict,
            Self::InvalidName(_) | Self::ThemeNumberOutOfRange { .. } => ErrorKind::Validation,
        }
    }

    /// The message shown to players.
    pub fn message(&self, locale: Locale) -> String {
        match locale {
            Locale::Pt => self.message_pt(),
            Locale::En => self.message_en(),
        }
    }

    fn message_pt(&self) -> String {
        match self {
            Self::RoomNotFound(_) => "Sala não encontrada".into(),
            Self::PlayerNotFound => "Jogador não encontrado".into(),
            Self::ThemeNotFound(_) => "Tema não encontrado".into(),
            Self::NotHost => "Apenas o host pode fazer isso".into(),
            Self::GameInProgress => "Jogo já começou".into(),
            Self::WrongPhase(_) => "Ação não permitida nesta fase do jogo".into(),
            Self::RoomFull(max) => format!("Sala cheia (máximo {max} jogadores)"),
            Self::NotEnoughPlayers(min) => format!("Mínimo de {min} jogadores"),
            Self::NameTaken(_) => "Nome já está em uso nesta sala".into(),
            Self::CannotKickSelf => "Você não pode remover a si mesmo".into(),
            Self::InvalidName(max) => format!("O nome deve ter entre 1 e {max} caracteres"),
            Self::ThemeNumberOutOfRange { max, .. } => {
                format!("Número deve ser entre 1 e {max}")
            }
            Self::DeckExhausted(_) => "Jogadores demais para distribuir cartas".into(),
            Self::CodeSpaceExhausted => "Erro ao criar sala".into(),
        }
    }

    fn message_en(&self) -> String {
        match self {
            Self::RoomNotFound(_) => "Room not found".into(),
            Self::PlayerNotFound => "Player not found".into(),
            Self::ThemeNotFound(_) => "Theme not found".into(),
            Self::NotHost => "Only the host can do that".into(),
            Self::GameInProgress => "Game already started".into(),
            Self::WrongPhase(_) => "Action not allowed at this stage of the game".into(),
            Self::RoomFull(max) => format!("Room is full ({max} players max)"),
            Self::NotEnoughPlayers(min) => format!("At least {min} players required"),
            Self::NameTaken(_) => "Name already taken in this room".into(),
            Self::CannotKickSelf => "You cannot kick yourself".into(),
            Self::InvalidName(max) => format!("Name must be 1 to {max} characters"),
            Self::ThemeNumberOutOfRange { max, .. } => {
                format!("Number must be between 1 and {max}")
            }
            Self::DeckExhausted(_) => "Too many players to deal cards".into(),
            Self::CodeSpaceExhausted => "Could not create room".into(),
        }
    }
}
