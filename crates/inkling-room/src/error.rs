//! Error types for the room layer.

use inkling_protocol::{PlayerId, RoomCode, RoomStatus};
use inkling_session::SessionError;
use inkling_store::{BlobError, StoreError};

/// Coarse class of a failure, for mapping onto a transport's status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    /// The token is unknown.
    Unauthenticated,
    /// The token is known but may not do this.
    Forbidden,
    Conflict,
    /// The room is not in a state that allows the action.
    Precondition,
    Unavailable,
    Internal,
}

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// The target of a kick, vote or reaction belongs to another room.
    #[error("player {0} is not in this room")]
    TargetNotInRoom(PlayerId),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The player is not (or no longer) taking part in the live round.
    #[error("player {0} is not taking part in this round")]
    NotParticipant(PlayerId),

    #[error("player {0} already submitted a drawing this round")]
    AlreadySubmitted(PlayerId),

    #[error("player {0} already voted this round")]
    AlreadyVoted(PlayerId),

    #[error("room {code} is full ({max} players)")]
    CapacityExceeded { code: RoomCode, max: u32 },

    #[error("need at least {required} active players to start, have {active}")]
    InsufficientPlayers { required: usize, active: usize },

    #[error("no prompts available")]
    NoPromptsAvailable,

    #[error("no round has been started in this room")]
    RoundNotStarted,

    #[error("room is {actual}, expected {expected}")]
    WrongPhase {
        expected: RoomStatus,
        actual: RoomStatus,
    },

    #[error("no free room code after {0} attempts")]
    CodeSpaceExhausted(u32),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    /// The room's actor is gone or not answering.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound(_) | Self::PlayerNotFound(_) | Self::TargetNotInRoom(_) => {
                ErrorKind::NotFound
            }
            Self::Session(e) => session_kind(e),
            Self::NotParticipant(_) => ErrorKind::Forbidden,
            Self::AlreadySubmitted(_)
            | Self::AlreadyVoted(_)
            | Self::CapacityExceeded { .. }
            | Self::Store(StoreError::Conflict(_)) => ErrorKind::Conflict,
            Self::InsufficientPlayers { .. }
            | Self::NoPromptsAvailable
            | Self::RoundNotStarted
            | Self::WrongPhase { .. } => ErrorKind::Precondition,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::CodeSpaceExhausted(_) | Self::Store(_) | Self::Blob(_) => ErrorKind::Internal,
        }
    }
}

/// Classifies a token failure: unknown tokens are unauthenticated, known
/// ones that may not act are forbidden.
pub fn session_kind(err: &SessionError) -> ErrorKind {
    match err {
        SessionError::InvalidToken => ErrorKind::Unauthenticated,
        SessionError::Store(_) => ErrorKind::Internal,
        SessionError::WrongRoom { .. } | SessionError::Departed(_) | SessionError::NotAdmin(_) => {
            ErrorKind::Forbidden
        }
    }
}
