//! Room manager: creates rooms and routes callers to their actors.

use std::collections::HashMap;
use std::sync::Arc;

use inkling_protocol::{RoomCode, RoomId, RoomStatus, RoomSummary};
use inkling_store::{Constraint, RoomRecord, StoreError, Write};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::code::generate_code;
use crate::room::spawn_room;
use crate::{RoomConfig, RoomDeps, RoomError, RoomHandle};

/// Owns one [`RoomHandle`] per live room actor.
///
/// This is the entry point for room operations from higher layers.
/// Actors are spawned lazily: a room that exists in the store but has no
/// actor (after a restart, or if the actor stopped) gets one on first
/// access.
pub struct RoomManager {
    /// Running actors, keyed by room code.
    rooms: HashMap<RoomCode, RoomHandle>,

    deps: RoomDeps,
    config: Arc<RoomConfig>,

    /// Seeds each actor's generator and draws room codes.
    rng: StdRng,
}

impl RoomManager {
    pub fn new(deps: RoomDeps, config: RoomConfig) -> Self {
        Self::with_rng(deps, config, StdRng::from_os_rng())
    }

    /// Deterministic codes, imposters and prompts. For tests.
    pub fn with_seed(deps: RoomDeps, config: RoomConfig, seed: u64) -> Self {
        Self::with_rng(deps, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(deps: RoomDeps, config: RoomConfig, rng: StdRng) -> Self {
        Self {
            rooms: HashMap::new(),
            deps,
            config: Arc::new(config.normalized()),
            rng,
        }
    }

    pub fn deps(&self) -> &RoomDeps {
        &self.deps
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a room in the lobby with default settings.
    ///
    /// # Errors
    /// [`RoomError::CodeSpaceExhausted`] if every drawn code was taken.
    pub fn create_room(&mut self) -> Result<(RoomSummary, RoomHandle), RoomError> {
        for attempt in 1..=self.config.code_attempts {
            let room = RoomRecord {
                id: RoomId(self.deps.store.next_id()),
                code: generate_code(&mut self.rng),
                status: RoomStatus::Lobby,
                draw_seconds: self.config.default_draw_seconds,
                vote_seconds: self.config.default_vote_seconds,
                max_players: self.config.max_players,
                current_game_id: None,
                created_at: self.deps.clock.now_ms(),
            };
            match self.deps.store.commit(Write::InsertRoom(room.clone()).into()) {
                Ok(()) => {}
                Err(StoreError::Conflict(Constraint::RoomCode)) => {
                    tracing::debug!(code = %room.code, attempt, "room code taken, redrawing");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let handle = self.spawn(&room);
            tracing::info!(room = %room.code, room_id = %room.id, "room created");
            let summary = RoomSummary {
                id: room.id,
                code: room.code,
                status: room.status,
            };
            return Ok((summary, handle));
        }
        tracing::warn!(attempts = self.config.code_attempts, "room code space exhausted");
        Err(RoomError::CodeSpaceExhausted(self.config.code_attempts))
    }

    /// The handle for `code`, spawning the actor if the room exists but
    /// none is running.
    pub fn room(&mut self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        if let Some(handle) = self.rooms.get(code) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
            tracing::warn!(room = %code, "room actor stopped, respawning");
        }
        let room = self
            .deps
            .store
            .room_by_code(code)?
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;
        Ok(self.spawn(&room))
    }

    /// Like [`room`](Self::room), addressed by storage id.
    pub fn room_by_id(&mut self, id: RoomId) -> Result<Option<RoomHandle>, RoomError> {
        match self.deps.store.room(id)? {
            Some(room) => self.room(&room.code).map(Some),
            None => Ok(None),
        }
    }

    fn spawn(&mut self, room: &RoomRecord) -> RoomHandle {
        let rng = StdRng::from_rng(&mut self.rng);
        let handle = spawn_room(room, self.deps.clone(), self.config.clone(), rng);
        self.rooms.insert(room.code.clone(), handle.clone());
        handle
    }

    /// Number of running room actors.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
