//! The broadcast event taxonomy.
//!
//! One [`RoomEvent`] is published per state change on the room's topic
//! (`rooms/{code}`). Clients re-derive their UI from this stream, so the
//! shapes here are a contract: adding a field is fine, renaming one is not.
//!
//! JSON looks like:
//!
//! ```json
//! { "type": "PLAYER_LEFT", "roomCode": "K7QXRM", "playerId": 4 }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{GameId, PlayerId, PlayerView, RoomCode, Tally};

/// Why a round was force-ended back to the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Every participant left the round.
    #[serde(rename = "All players left")]
    AllPlayersLeft,
    /// The sweeper found the round older than the maximum age.
    #[serde(rename = "Game timer expired")]
    TimerExpired,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllPlayersLeft => f.write_str("All players left"),
            Self::TimerExpired => f.write_str("Game timer expired"),
        }
    }
}

/// Everything the server broadcasts on a room topic.
///
/// Timestamps are epoch milliseconds computed on the server, so every
/// client animates the same countdown regardless of its own clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum RoomEvent {
    // -- Roster --
    PlayerJoined {
        room_code: RoomCode,
        player: PlayerView,
    },
    PlayerLeft {
        room_code: RoomCode,
        player_id: PlayerId,
    },
    AvatarUpdated {
        room_code: RoomCode,
        player: PlayerView,
    },

    // -- Room lifecycle --
    SettingsUpdated {
        room_code: RoomCode,
        draw_seconds: u32,
        vote_seconds: u32,
        max_players: u32,
    },
    RoomReset {
        room_code: RoomCode,
    },

    // -- Round --
    /// Sent just before `GAME_STARTED` so clients can run a synchronized
    /// countdown that ends at `start_at + seconds`.
    GameCountdown {
        room_code: RoomCode,
        start_at: u64,
        seconds: u32,
    },
    /// Never carries the imposter or the imposter prompt.
    GameStarted {
        room_code: RoomCode,
        game_id: GameId,
        prompt_common: String,
        server_time: u64,
        draw_seconds: u32,
        vote_seconds: u32,
        vote_start_time: u64,
        active_game_participants: Vec<PlayerId>,
    },
    /// Also sent when a drawing is withdrawn; clients refetch the gallery.
    DrawingUploaded {
        room_code: RoomCode,
        game_id: GameId,
        player_id: PlayerId,
    },
    DiscussStarted {
        room_code: RoomCode,
        server_time: u64,
        vote_seconds: u32,
    },
    VoteUpdate {
        room_code: RoomCode,
        game_id: GameId,
        tally: Tally,
    },
    ShowResults {
        room_code: RoomCode,
        game_id: GameId,
    },
    GameEnded {
        room_code: RoomCode,
        reason: EndReason,
    },
    PlayerLeftGame {
        room_code: RoomCode,
        player_id: PlayerId,
        player_name: String,
    },
    /// Transient; never persisted.
    Reaction {
        room_code: RoomCode,
        game_id: GameId,
        target_id: PlayerId,
        emoji: String,
    },
}

impl RoomEvent {
    /// The wire name of this event (its `type` tag). Handy for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerJoined { .. } => "PLAYER_JOINED",
            Self::PlayerLeft { .. } => "PLAYER_LEFT",
            Self::AvatarUpdated { .. } => "AVATAR_UPDATED",
            Self::SettingsUpdated { .. } => "SETTINGS_UPDATED",
            Self::RoomReset { .. } => "ROOM_RESET",
            Self::GameCountdown { .. } => "GAME_COUNTDOWN",
            Self::GameStarted { .. } => "GAME_STARTED",
            Self::DrawingUploaded { .. } => "DRAWING_UPLOADED",
            Self::DiscussStarted { .. } => "DISCUSS_STARTED",
            Self::VoteUpdate { .. } => "VOTE_UPDATE",
            Self::ShowResults { .. } => "SHOW_RESULTS",
            Self::GameEnded { .. } => "GAME_ENDED",
            Self::PlayerLeftGame { .. } => "PLAYER_LEFT_GAME",
            Self::Reaction { .. } => "REACTION",
        }
    }

    /// The room this event belongs to.
    pub fn room_code(&self) -> &RoomCode {
        match self {
            Self::PlayerJoined { room_code, .. }
            | Self::PlayerLeft { room_code, .. }
            | Self::AvatarUpdated { room_code, .. }
            | Self::SettingsUpdated { room_code, .. }
            | Self::RoomReset { room_code }
            | Self::GameCountdown { room_code, .. }
            | Self::GameStarted { room_code, .. }
            | Self::DrawingUploaded { room_code, .. }
            | Self::DiscussStarted { room_code, .. }
            | Self::VoteUpdate { room_code, .. }
            | Self::ShowResults { room_code, .. }
            | Self::GameEnded { room_code, .. }
            | Self::PlayerLeftGame { room_code, .. }
            | Self::Reaction { room_code, .. } => room_code,
        }
    }
}
