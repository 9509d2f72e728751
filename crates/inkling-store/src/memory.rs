//! In-process [`EntityStore`] behind a `parking_lot::RwLock`.
//!
//! A commit takes the write lock, validates every write against the
//! current tables plus the effect of earlier writes in the same batch, and
//! only then applies them. A rejected batch touches nothing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use inkling_protocol::{GameId, PlayerId, RoomCode, RoomId};
use parking_lot::RwLock;

use crate::{
    Changeset, Constraint, DrawingRecord, EntityStore, GameRecord,
    ParticipantRecord, PlayerRecord, PromptPair, RoomRecord, StoreError,
    VoteRecord, Write,
};

type RoundKey = (GameId, PlayerId);

#[derive(Default)]
struct Tables {
    rooms: HashMap<RoomId, RoomRecord>,
    room_codes: HashMap<RoomCode, RoomId>,
    players: BTreeMap<PlayerId, PlayerRecord>,
    tokens: HashMap<String, PlayerId>,
    games: HashMap<GameId, GameRecord>,
    participants: BTreeMap<RoundKey, ParticipantRecord>,
    drawings: BTreeMap<RoundKey, DrawingRecord>,
    votes: BTreeMap<RoundKey, VoteRecord>,
}

fn round_range(game_id: GameId) -> std::ops::RangeInclusive<RoundKey> {
    (game_id, PlayerId(0))..=(game_id, PlayerId(u64::MAX))
}

/// Rows created or removed by earlier writes of the batch being validated.
#[derive(Default)]
struct Pending {
    rooms: HashSet<RoomId>,
    codes: HashSet<RoomCode>,
    players: HashSet<PlayerId>,
    tokens: HashSet<String>,
    games: HashSet<GameId>,
    participants: HashSet<RoundKey>,
    drawings_added: HashSet<RoundKey>,
    drawings_removed: HashSet<RoundKey>,
    votes: HashSet<RoundKey>,
}

impl Tables {
    fn room_exists(&self, pending: &Pending, id: RoomId) -> bool {
        self.rooms.contains_key(&id) || pending.rooms.contains(&id)
    }

    fn player_exists(&self, pending: &Pending, id: PlayerId) -> bool {
        self.players.contains_key(&id) || pending.players.contains(&id)
    }

    fn game_exists(&self, pending: &Pending, id: GameId) -> bool {
        self.games.contains_key(&id) || pending.games.contains(&id)
    }

    fn code_taken(&self, pending: &Pending, code: &RoomCode) -> bool {
        self.room_codes.contains_key(code) || pending.codes.contains(code)
    }

    fn token_taken(&self, pending: &Pending, token: &str) -> bool {
        self.tokens.contains_key(token) || pending.tokens.contains(token)
    }

    /// First pass: would `write` succeed after everything already in
    /// `pending`?
    fn check(&self, pending: &mut Pending, write: &Write) -> Result<(), StoreError> {
        match write {
            Write::InsertRoom(room) => {
                if self.room_exists(pending, room.id) {
                    return Err(StoreError::Conflict(Constraint::PrimaryKey));
                }
                if self.code_taken(pending, &room.code) {
                    return Err(StoreError::Conflict(Constraint::RoomCode));
                }
                pending.rooms.insert(room.id);
                pending.codes.insert(room.code.clone());
            }
            Write::UpdateRoom(room) => {
                if !self.room_exists(pending, room.id) {
                    return Err(StoreError::MissingRow(format!("room {}", room.id)));
                }
                if let Some(old) = self.rooms.get(&room.id) {
                    if old.code != room.code {
                        if self.code_taken(pending, &room.code) {
                            return Err(StoreError::Conflict(Constraint::RoomCode));
                        }
                        pending.codes.insert(room.code.clone());
                    }
                }
            }
            Write::InsertPlayer(player) => {
                if self.player_exists(pending, player.id) {
                    return Err(StoreError::Conflict(Constraint::PrimaryKey));
                }
                if !self.room_exists(pending, player.room_id) {
                    return Err(StoreError::MissingRow(format!(
                        "room {}",
                        player.room_id
                    )));
                }
                if self.token_taken(pending, &player.session_token) {
                    return Err(StoreError::Conflict(Constraint::SessionToken));
                }
                pending.players.insert(player.id);
                pending.tokens.insert(player.session_token.clone());
            }
            Write::UpdatePlayer(player) => {
                if !self.player_exists(pending, player.id) {
                    return Err(StoreError::MissingRow(format!(
                        "player {}",
                        player.id
                    )));
                }
                if let Some(old) = self.players.get(&player.id) {
                    if old.session_token != player.session_token {
                        if self.token_taken(pending, &player.session_token) {
                            return Err(StoreError::Conflict(Constraint::SessionToken));
                        }
                        pending.tokens.insert(player.session_token.clone());
                    }
                }
            }
            Write::InsertGame(game) => {
                if self.game_exists(pending, game.id) {
                    return Err(StoreError::Conflict(Constraint::PrimaryKey));
                }
                if !self.room_exists(pending, game.room_id) {
                    return Err(StoreError::MissingRow(format!("room {}", game.room_id)));
                }
                pending.games.insert(game.id);
            }
            Write::UpdateGame(game) => {
                if !self.game_exists(pending, game.id) {
                    return Err(StoreError::MissingRow(format!("game {}", game.id)));
                }
            }
            Write::InsertParticipant(p) => {
                if !self.game_exists(pending, p.game_id) {
                    return Err(StoreError::MissingRow(format!("game {}", p.game_id)));
                }
                let key = (p.game_id, p.player_id);
                if self.participants.contains_key(&key) || !pending.participants.insert(key) {
                    return Err(StoreError::Conflict(Constraint::Participant));
                }
            }
            Write::UpdateParticipant(p) => {
                let key = (p.game_id, p.player_id);
                if !self.participants.contains_key(&key)
                    && !pending.participants.contains(&key)
                {
                    return Err(StoreError::MissingRow(format!(
                        "participant {} in {}",
                        p.player_id, p.game_id
                    )));
                }
            }
            Write::InsertDrawing(d) => {
                if !self.game_exists(pending, d.game_id) {
                    return Err(StoreError::MissingRow(format!("game {}", d.game_id)));
                }
                let key = (d.game_id, d.player_id);
                let stored = self.drawings.contains_key(&key)
                    && !pending.drawings_removed.contains(&key);
                if stored || pending.drawings_added.contains(&key) {
                    return Err(StoreError::Conflict(Constraint::Drawing));
                }
                pending.drawings_added.insert(key);
                pending.drawings_removed.remove(&key);
            }
            Write::DeleteDrawing { game_id, player_id } => {
                let key = (*game_id, *player_id);
                pending.drawings_added.remove(&key);
                pending.drawings_removed.insert(key);
            }
            Write::InsertVote(v) => {
                if !self.game_exists(pending, v.game_id) {
                    return Err(StoreError::MissingRow(format!("game {}", v.game_id)));
                }
                let key = (v.game_id, v.voter_id);
                if self.votes.contains_key(&key) || !pending.votes.insert(key) {
                    return Err(StoreError::Conflict(Constraint::Vote));
                }
            }
        }
        Ok(())
    }

    /// Second pass. Only called once every write has been checked.
    fn apply(&mut self, write: Write) {
        match write {
            Write::InsertRoom(room) | Write::UpdateRoom(room) => {
                if let Some(old) = self.rooms.get(&room.id) {
                    self.room_codes.remove(&old.code);
                }
                self.room_codes.insert(room.code.clone(), room.id);
                self.rooms.insert(room.id, room);
            }
            Write::InsertPlayer(player) | Write::UpdatePlayer(player) => {
                if let Some(old) = self.players.get(&player.id) {
                    self.tokens.remove(&old.session_token);
                }
                self.tokens.insert(player.session_token.clone(), player.id);
                self.players.insert(player.id, player);
            }
            Write::InsertGame(game) | Write::UpdateGame(game) => {
                self.games.insert(game.id, game);
            }
            Write::InsertParticipant(p) | Write::UpdateParticipant(p) => {
                self.participants.insert((p.game_id, p.player_id), p);
            }
            Write::InsertDrawing(d) => {
                self.drawings.insert((d.game_id, d.player_id), d);
            }
            Write::DeleteDrawing { game_id, player_id } => {
                self.drawings.remove(&(game_id, player_id));
            }
            Write::InsertVote(v) => {
                self.votes.insert((v.game_id, v.voter_id), v);
            }
        }
    }
}

/// The in-memory entity store.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    prompts: Vec<PromptPair>,
    next_id: AtomicU64,
}

impl MemoryStore {
    /// An empty store with an empty prompt catalog.
    pub fn new() -> Self {
        Self::with_prompts(Vec::new())
    }

    /// An empty store whose catalog holds `prompts`.
    pub fn with_prompts(prompts: Vec<PromptPair>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            prompts,
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for MemoryStore {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn room(&self, id: RoomId) -> Result<Option<RoomRecord>, StoreError> {
        Ok(self.tables.read().rooms.get(&id).cloned())
    }

    fn room_by_code(&self, code: &RoomCode) -> Result<Option<RoomRecord>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .room_codes
            .get(code)
            .and_then(|id| tables.rooms.get(id))
            .cloned())
    }

    fn player(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        Ok(self.tables.read().players.get(&id).cloned())
    }

    fn player_by_token(&self, token: &str) -> Result<Option<PlayerRecord>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .tokens
            .get(token)
            .and_then(|id| tables.players.get(id))
            .cloned())
    }

    fn players_in_room(&self, room_id: RoomId) -> Result<Vec<PlayerRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .players
            .values()
            .filter(|p| p.room_id == room_id)
            .cloned()
            .collect())
    }

    fn game(&self, id: GameId) -> Result<Option<GameRecord>, StoreError> {
        Ok(self.tables.read().games.get(&id).cloned())
    }

    fn stale_games(&self, created_before: u64) -> Result<Vec<GameRecord>, StoreError> {
        let mut games: Vec<GameRecord> = self
            .tables
            .read()
            .games
            .values()
            .filter(|g| !g.status.is_terminal() && g.created_at < created_before)
            .cloned()
            .collect();
        games.sort_by_key(|g| g.id);
        Ok(games)
    }

    fn participants(&self, game_id: GameId) -> Result<Vec<ParticipantRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .participants
            .range(round_range(game_id))
            .map(|(_, p)| p.clone())
            .collect())
    }

    fn drawings(&self, game_id: GameId) -> Result<Vec<DrawingRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .drawings
            .range(round_range(game_id))
            .map(|(_, d)| d.clone())
            .collect())
    }

    fn drawing(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> Result<Option<DrawingRecord>, StoreError> {
        Ok(self.tables.read().drawings.get(&(game_id, player_id)).cloned())
    }

    fn votes(&self, game_id: GameId) -> Result<Vec<VoteRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .votes
            .range(round_range(game_id))
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn vote(
        &self,
        game_id: GameId,
        voter_id: PlayerId,
    ) -> Result<Option<VoteRecord>, StoreError> {
        Ok(self.tables.read().votes.get(&(game_id, voter_id)).cloned())
    }

    fn prompts(&self) -> Result<Vec<PromptPair>, StoreError> {
        Ok(self.prompts.clone())
    }

    fn commit(&self, changes: Changeset) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let mut pending = Pending::default();
        for write in changes.writes() {
            if let Err(e) = tables.check(&mut pending, write) {
                tracing::debug!(error = %e, "commit rejected");
                return Err(e);
            }
        }
        for write in changes.into_writes() {
            tables.apply(write);
        }
        Ok(())
    }
}
