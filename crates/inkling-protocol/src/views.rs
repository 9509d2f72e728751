//! Response shapes returned by room actions.
//!
//! Everything here is a *projection*: a view built from stored rows for
//! one caller. None of them carry a session token, with the single
//! exception of [`JoinReceipt`], which goes only to the player who joined.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{GameId, PlayerId, RoomCode, RoomId, RoomStatus, Winner};

/// Vote counts keyed by the accused player, in ascending id order.
pub type Tally = BTreeMap<PlayerId, u32>;

/// The public, redacted projection of a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub is_admin: bool,
    pub avatar: Option<String>,
}

/// What `create_room` hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub code: RoomCode,
    pub status: RoomStatus,
}

/// Full room state: settings, active players and, while a round is live,
/// the ids of players still taking part in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub code: RoomCode,
    pub status: RoomStatus,
    pub players: Vec<PlayerView>,
    pub draw_seconds: u32,
    pub vote_seconds: u32,
    pub max_players: u32,
    pub active_game_participants: Vec<PlayerId>,
}

/// Returned to the joining player only. `session_token` is the bearer
/// credential for every later action, so it must never be broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinReceipt {
    pub player_id: PlayerId,
    pub is_admin: bool,
    pub session_token: String,
}

/// Returned by `start`. Deliberately omits the imposter and their prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStart {
    pub game_id: GameId,
    pub room_id: RoomId,
    pub prompt_common: String,
}

/// A single player's own prompt for the live round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptView {
    pub game_id: GameId,
    pub prompt: String,
}

/// Whether the caller already has a drawing in the live round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatus {
    pub has_submitted: bool,
    pub game_id: GameId,
    /// Epoch milliseconds.
    pub submitted_at: Option<u64>,
}

/// One gallery entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingView {
    pub player_id: PlayerId,
    pub url: String,
}

/// The outcome of a round's vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub imposter_id: PlayerId,
    /// `None` when nobody voted.
    pub voted_out_id: Option<PlayerId>,
    pub winner: Winner,
    pub tally: Tally,
}
