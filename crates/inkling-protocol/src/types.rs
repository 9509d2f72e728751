//! Core identifiers and phase enums shared by every Inkling layer.
//!
//! These travel on the wire (inside events and action responses), so
//! each one has a stable serde representation: ids are bare integers,
//! codes are strings, phases are SCREAMING_SNAKE_CASE strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Newtype over `u64` so a `PlayerId` can never be passed where a
/// `GameId` is expected. `Ord` matters: the vote tie-break picks the
/// lowest id, and tallies are kept in id order.
///
/// `#[serde(transparent)]` serializes `PlayerId(42)` as just `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The storage identity of a room. Clients address rooms by
/// [`RoomCode`]; this id is what child rows point at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// Identifies one round (a `Game` row) within a room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// Characters a room code may contain. `I`, `O`, `0` and `1` are left out
/// because they are easy to confuse when read aloud or copied by hand.
pub const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of characters in a room code (32^6 ≈ 1.07 billion codes).
pub const CODE_LENGTH: usize = 6;

/// A short, human-shareable room code such as `"K7QXRM"`.
///
/// Construction always goes through [`RoomCode::parse`], so a value of
/// this type is known to be well-formed. Parsing is forgiving about case
/// and surrounding whitespace because players type these codes by hand.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalizes and validates a room code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomCode`] if the trimmed,
    /// upper-cased input is not exactly [`CODE_LENGTH`] characters from
    /// [`CODE_ALPHABET`].
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim().to_ascii_uppercase();
        let valid = code.len() == CODE_LENGTH
            && code.bytes().all(|b| CODE_ALPHABET.contains(&b));
        if !valid {
            return Err(ProtocolError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(code))
    }

    /// Builds a code from positions in [`CODE_ALPHABET`]. Positions wrap
    /// around, so every input yields a well-formed code.
    pub fn from_indices(indices: [usize; CODE_LENGTH]) -> Self {
        Self(
            indices
                .iter()
                .map(|i| CODE_ALPHABET[i % CODE_ALPHABET.len()] as char)
                .collect(),
        )
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The visible phase of a room.
///
/// ```text
/// LOBBY → DRAWING → VOTING → RESULTS → LOBBY
///   ↑_______________________________|  (forced end from any phase)
/// ```
///
/// Every status may also fall straight back to `LOBBY` (host reset,
/// everyone left the round, or the sweeper expired it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    #[default]
    Lobby,
    Drawing,
    Voting,
    Results,
}

impl RoomStatus {
    /// Returns `true` while a round is live (drawing, voting or showing
    /// results). The sweeper only looks at rooms in these phases.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Drawing | Self::Voting | Self::Results)
    }

    /// The next phase in the normal cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Lobby => Self::Drawing,
            Self::Drawing => Self::Voting,
            Self::Voting => Self::Results,
            Self::Results => Self::Lobby,
        }
    }

    /// Returns `true` if moving to `target` is a legal transition: either
    /// the next phase in the cycle, or a forced return to `LOBBY`.
    pub fn can_transition_to(self, target: Self) -> bool {
        target == Self::Lobby || self.next() == target
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lobby => "LOBBY",
            Self::Drawing => "DRAWING",
            Self::Voting => "VOTING",
            Self::Results => "RESULTS",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// Round-level status recorded on a `Game` row.
///
/// Mirrors the room phase while the round is live and becomes
/// `COMPLETED` once the room goes back to the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Drawing,
    Voting,
    Results,
    Completed,
}

impl GameStatus {
    /// Returns `true` once the round can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Drawing => "DRAWING",
            Self::Voting => "VOTING",
            Self::Results => "RESULTS",
            Self::Completed => "COMPLETED",
        };
        f.write_str(s)
    }
}

/// Which side won a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    /// The players voted out the imposter.
    Artists,
    /// The imposter survived the vote.
    Imposter,
}
