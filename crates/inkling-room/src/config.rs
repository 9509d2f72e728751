//! Room and sweeper configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Policy shared by every room a manager spawns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Active players needed to start a round.
    pub min_players: usize,

    /// Active players allowed in a room.
    pub max_players: u32,

    /// Drawing phase length for new rooms.
    pub default_draw_seconds: u32,
    pub min_draw_seconds: u32,
    pub max_draw_seconds: u32,

    /// Voting phase length for new rooms.
    pub default_vote_seconds: u32,
    pub min_vote_seconds: u32,
    pub max_vote_seconds: u32,

    /// Length of the synchronized countdown before drawing begins.
    pub countdown_seconds: u32,

    /// How far in the future the countdown starts, so every client has
    /// received the event before it begins.
    pub countdown_lead: Duration,

    /// Player names longer than this are cut (in characters).
    pub max_name_len: usize,

    /// Command channel capacity per room actor.
    pub channel_size: usize,

    /// Room code draws before giving up on finding a free one.
    pub code_attempts: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 3,
            max_players: 8,
            default_draw_seconds: 120,
            min_draw_seconds: 15,
            max_draw_seconds: 300,
            default_vote_seconds: 60,
            min_vote_seconds: 15,
            max_vote_seconds: 180,
            countdown_seconds: 3,
            countdown_lead: Duration::from_millis(800),
            max_name_len: 50,
            channel_size: 64,
            code_attempts: 32,
        }
    }
}

impl RoomConfig {
    /// Puts inverted bounds back in order and pulls the defaults inside
    /// them. A zero channel size becomes one.
    pub fn normalized(mut self) -> Self {
        if self.min_draw_seconds > self.max_draw_seconds {
            std::mem::swap(&mut self.min_draw_seconds, &mut self.max_draw_seconds);
        }
        if self.min_vote_seconds > self.max_vote_seconds {
            std::mem::swap(&mut self.min_vote_seconds, &mut self.max_vote_seconds);
        }
        self.default_draw_seconds = self.clamp_draw_seconds(self.default_draw_seconds);
        self.default_vote_seconds = self.clamp_vote_seconds(self.default_vote_seconds);
        self.channel_size = self.channel_size.max(1);
        self
    }

    pub fn clamp_draw_seconds(&self, seconds: u32) -> u32 {
        seconds.clamp(self.min_draw_seconds, self.max_draw_seconds)
    }

    pub fn clamp_vote_seconds(&self, seconds: u32) -> u32 {
        seconds.clamp(self.min_vote_seconds, self.max_vote_seconds)
    }
}

// ---------------------------------------------------------------------------
// SweeperConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Time between sweep passes.
    pub period: Duration,
    /// Rounds older than this are force-ended.
    pub max_game_age: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(30),
            max_game_age: Duration::from_secs(10 * 60),
        }
    }
}
