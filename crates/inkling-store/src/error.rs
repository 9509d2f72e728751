//! Error types for the storage layer.

use std::fmt;

/// A unique constraint enforced inside [`commit`](crate::EntityStore::commit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Row id already taken.
    PrimaryKey,
    /// One room per code.
    RoomCode,
    /// One player per session token.
    SessionToken,
    /// One participant row per (game, player).
    Participant,
    /// One drawing per (game, player).
    Drawing,
    /// One vote per (game, voter).
    Vote,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PrimaryKey => "primary key",
            Self::RoomCode => "room code",
            Self::SessionToken => "session token",
            Self::Participant => "game participant",
            Self::Drawing => "drawing per player",
            Self::Vote => "vote per voter",
        };
        f.write_str(s)
    }
}

/// Errors from an [`EntityStore`](crate::EntityStore).
///
/// A failed commit leaves the store exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(Constraint),

    /// An update or child insert referenced a row that doesn't exist.
    #[error("missing row: {0}")]
    MissingRow(String),

    /// The backing store failed (connection lost, disk full, ...).
    #[error("store backend failed: {0}")]
    Backend(String),
}

/// Errors from a [`BlobStore`](crate::BlobStore).
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
