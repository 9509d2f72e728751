//! Batched writes committed atomically.

use inkling_protocol::{GameId, PlayerId};

use crate::{
    DrawingRecord, GameRecord, ParticipantRecord, PlayerRecord, RoomRecord,
    VoteRecord,
};

/// One row-level write. Updates replace the whole row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    InsertRoom(RoomRecord),
    UpdateRoom(RoomRecord),
    InsertPlayer(PlayerRecord),
    UpdatePlayer(PlayerRecord),
    InsertGame(GameRecord),
    UpdateGame(GameRecord),
    InsertParticipant(ParticipantRecord),
    UpdateParticipant(ParticipantRecord),
    InsertDrawing(DrawingRecord),
    /// Deleting a drawing that doesn't exist is not an error.
    DeleteDrawing { game_id: GameId, player_id: PlayerId },
    InsertVote(VoteRecord),
}

/// An ordered batch of [`Write`]s applied all-or-nothing.
///
/// Later writes see earlier ones: a changeset may insert a game and then
/// its participants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    writes: Vec<Write>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: Write) -> &mut Self {
        self.writes.push(write);
        self
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

impl From<Write> for Changeset {
    fn from(write: Write) -> Self {
        Self {
            writes: vec![write],
        }
    }
}

impl Extend<Write> for Changeset {
    fn extend<I: IntoIterator<Item = Write>>(&mut self, iter: I) {
        self.writes.extend(iter);
    }
}
