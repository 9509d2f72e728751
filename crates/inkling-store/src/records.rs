//! Stored rows.
//!
//! Rows are plain data. Timestamps are epoch milliseconds. Nothing is ever
//! hard-deleted except a withdrawn drawing: departed players and
//! participants are flagged inactive so past rounds keep their references.

use inkling_protocol::{
    GameId, GameStatus, PlayerId, PlayerView, RoomCode, RoomId, RoomStatus,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    pub id: RoomId,
    pub code: RoomCode,
    pub status: RoomStatus,
    pub draw_seconds: u32,
    pub vote_seconds: u32,
    pub max_players: u32,
    /// The live round, if any. Updated in the same changeset as `status`.
    pub current_game_id: Option<GameId>,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub room_id: RoomId,
    pub name: String,
    pub is_admin: bool,
    pub avatar: Option<String>,
    /// Bearer credential. Never leaves the store except in a join receipt.
    pub session_token: String,
    pub active: bool,
}

impl PlayerRecord {
    /// The redacted projection safe to broadcast.
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            is_admin: self.is_admin,
            avatar: self.avatar.clone(),
        }
    }
}

/// One round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub id: GameId,
    pub room_id: RoomId,
    pub status: GameStatus,
    pub round_number: u32,
    pub prompt_common: String,
    pub prompt_imposter: String,
    pub imposter_id: PlayerId,
    pub created_at: u64,
}

impl GameRecord {
    /// The prompt `player` should see.
    pub fn prompt_for(&self, player: PlayerId) -> &str {
        if player == self.imposter_id {
            &self.prompt_imposter
        } else {
            &self.prompt_common
        }
    }
}

/// A player's membership in one round, separate from room membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub active: bool,
    pub left_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingRecord {
    pub game_id: GameId,
    pub player_id: PlayerId,
    /// Blob store path, relative to the blob root.
    pub file_path: String,
    pub submitted_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    pub game_id: GameId,
    pub voter_id: PlayerId,
    pub target_id: PlayerId,
    pub created_at: u64,
}

/// A catalog entry: what most players draw, and the imposter's near-miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub common: String,
    pub imposter: String,
}

impl PromptPair {
    pub fn new(common: impl Into<String>, imposter: impl Into<String>) -> Self {
        Self {
            common: common.into(),
            imposter: imposter.into(),
        }
    }
}
