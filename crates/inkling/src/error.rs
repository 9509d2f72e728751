//! Unified error type for the Inkling facade.

use inkling_broadcast::TransportError;
use inkling_protocol::ProtocolError;
use inkling_room::{session_kind, ErrorKind, RoomError};
use inkling_session::SessionError;
use inkling_store::StoreError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum InklingError {
    /// Fan-out listener or connection failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed input, such as a room code outside the alphabet.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl InklingError {
    /// Coarse class for mapping onto status codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Room(e) => e.kind(),
            Self::Session(e) => session_kind(e),
            // A code that cannot exist names no room.
            Self::Protocol(ProtocolError::InvalidRoomCode(_)) => ErrorKind::NotFound,
            Self::Protocol(_) => ErrorKind::Precondition,
            Self::Store(StoreError::Conflict(_)) => ErrorKind::Conflict,
            Self::Transport(_) | Self::Store(_) | Self::Config(_) => ErrorKind::Internal,
        }
    }
}
