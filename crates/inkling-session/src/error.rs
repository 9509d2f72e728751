//! Error types for the session layer.

use inkling_protocol::{PlayerId, RoomId};

/// Why a token could not be used for an action.
///
/// `InvalidToken` means "we don't know who you are"; the others mean "we
/// know who you are and the answer is no".
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No player holds this token.
    #[error("invalid session token")]
    InvalidToken,

    /// The token is valid but belongs to a player of another room.
    #[error("player {player} does not belong to room {room}")]
    WrongRoom { player: PlayerId, room: RoomId },

    /// The player left or was kicked; their token no longer acts.
    #[error("player {0} is no longer in the room")]
    Departed(PlayerId),

    /// The action needs the room admin.
    #[error("player {0} is not the room admin")]
    NotAdmin(PlayerId),

    /// The lookup itself failed.
    #[error(transparent)]
    Store(#[from] inkling_store::StoreError),
}
