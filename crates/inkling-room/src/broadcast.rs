//! Typed event emission for one room, plus a recording publisher for
//! tests.
//!
//! The actor calls these only after the change they describe has been
//! committed to the store.

use std::sync::Arc;

use inkling_protocol::{
    room_topic, EndReason, GameId, PlayerId, PlayerView, Publisher, RoomCode, RoomEvent, Tally,
};
use parking_lot::Mutex;

/// Emits [`RoomEvent`]s on a single room's topic.
#[derive(Clone)]
pub struct EventBroadcaster {
    publisher: Arc<dyn Publisher>,
    code: RoomCode,
    topic: String,
}

impl EventBroadcaster {
    pub fn new(publisher: Arc<dyn Publisher>, code: RoomCode) -> Self {
        let topic = room_topic(&code);
        Self {
            publisher,
            code,
            topic,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    fn emit(&self, event: RoomEvent) {
        tracing::debug!(room = %self.code, event = event.kind(), "publishing");
        self.publisher.publish(&self.topic, event);
    }

    fn code(&self) -> RoomCode {
        self.code.clone()
    }

    // -- Roster -----------------------------------------------------------

    pub fn player_joined(&self, player: PlayerView) {
        self.emit(RoomEvent::PlayerJoined {
            room_code: self.code(),
            player,
        });
    }

    pub fn player_left(&self, player_id: PlayerId) {
        self.emit(RoomEvent::PlayerLeft {
            room_code: self.code(),
            player_id,
        });
    }

    pub fn avatar_updated(&self, player: PlayerView) {
        self.emit(RoomEvent::AvatarUpdated {
            room_code: self.code(),
            player,
        });
    }

    // -- Room lifecycle ---------------------------------------------------

    pub fn settings_updated(&self, draw_seconds: u32, vote_seconds: u32, max_players: u32) {
        self.emit(RoomEvent::SettingsUpdated {
            room_code: self.code(),
            draw_seconds,
            vote_seconds,
            max_players,
        });
    }

    pub fn room_reset(&self) {
        self.emit(RoomEvent::RoomReset {
            room_code: self.code(),
        });
    }

    // -- Round ------------------------------------------------------------

    pub fn countdown(&self, start_at: u64, seconds: u32) {
        self.emit(RoomEvent::GameCountdown {
            room_code: self.code(),
            start_at,
            seconds,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn game_started(
        &self,
        game_id: GameId,
        prompt_common: String,
        server_time: u64,
        draw_seconds: u32,
        vote_seconds: u32,
        vote_start_time: u64,
        active_game_participants: Vec<PlayerId>,
    ) {
        self.emit(RoomEvent::GameStarted {
            room_code: self.code(),
            game_id,
            prompt_common,
            server_time,
            draw_seconds,
            vote_seconds,
            vote_start_time,
            active_game_participants,
        });
    }

    pub fn drawing_uploaded(&self, game_id: GameId, player_id: PlayerId) {
        self.emit(RoomEvent::DrawingUploaded {
            room_code: self.code(),
            game_id,
            player_id,
        });
    }

    pub fn discuss_started(&self, server_time: u64, vote_seconds: u32) {
        self.emit(RoomEvent::DiscussStarted {
            room_code: self.code(),
            server_time,
            vote_seconds,
        });
    }

    pub fn vote_update(&self, game_id: GameId, tally: Tally) {
        self.emit(RoomEvent::VoteUpdate {
            room_code: self.code(),
            game_id,
            tally,
        });
    }

    pub fn show_results(&self, game_id: GameId) {
        self.emit(RoomEvent::ShowResults {
            room_code: self.code(),
            game_id,
        });
    }

    pub fn game_ended(&self, reason: EndReason) {
        self.emit(RoomEvent::GameEnded {
            room_code: self.code(),
            reason,
        });
    }

    pub fn player_left_game(&self, player_id: PlayerId, player_name: String) {
        self.emit(RoomEvent::PlayerLeftGame {
            room_code: self.code(),
            player_id,
            player_name,
        });
    }

    pub fn reaction(&self, game_id: GameId, target_id: PlayerId, emoji: String) {
        self.emit(RoomEvent::Reaction {
            room_code: self.code(),
            game_id,
            target_id,
            emoji,
        });
    }
}

// ---------------------------------------------------------------------------
// RecordingPublisher
// ---------------------------------------------------------------------------

/// A [`Publisher`] that keeps everything it is given. For tests.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, RoomEvent)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(topic, event)` so far, in publish order.
    pub fn published(&self) -> Vec<(String, RoomEvent)> {
        self.published.lock().clone()
    }

    pub fn events(&self) -> Vec<RoomEvent> {
        self.published.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Wire names of every event so far.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.published.lock().iter().map(|(_, e)| e.kind()).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.published.lock().iter().filter(|(_, e)| e.kind() == kind).count()
    }

    pub fn clear(&self) {
        self.published.lock().clear();
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, topic: &str, event: RoomEvent) {
        self.published.lock().push((topic.to_string(), event));
    }
}
