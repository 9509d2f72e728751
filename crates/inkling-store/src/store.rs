//! The entity store collaborator trait.

use inkling_protocol::{GameId, PlayerId, RoomCode, RoomId};

use crate::{
    Changeset, DrawingRecord, GameRecord, ParticipantRecord, PlayerRecord,
    PromptPair, RoomRecord, StoreError, VoteRecord,
};

/// Durable rows for everything a room owns.
///
/// Reads return owned copies. Writes happen only through
/// [`commit`](Self::commit), which must:
///
/// - apply every write in the changeset or none of them;
/// - reject a changeset that would break a unique constraint (room code,
///   session token, participant/drawing per (game, player), vote per
///   (game, voter)) with [`StoreError::Conflict`], even if the caller
///   pre-checked.
///
/// Methods are synchronous and expected to be fast. They are called from
/// inside room actors.
pub trait EntityStore: Send + Sync + 'static {
    /// Allocates a fresh row id. Ids are unique across all tables.
    fn next_id(&self) -> u64;

    fn room(&self, id: RoomId) -> Result<Option<RoomRecord>, StoreError>;

    fn room_by_code(
        &self,
        code: &RoomCode,
    ) -> Result<Option<RoomRecord>, StoreError>;

    fn player(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StoreError>;

    fn player_by_token(
        &self,
        token: &str,
    ) -> Result<Option<PlayerRecord>, StoreError>;

    /// Every player ever in the room, active or not, in id order.
    fn players_in_room(
        &self,
        room_id: RoomId,
    ) -> Result<Vec<PlayerRecord>, StoreError>;

    fn game(&self, id: GameId) -> Result<Option<GameRecord>, StoreError>;

    /// Non-terminal games created strictly before `created_before`.
    fn stale_games(
        &self,
        created_before: u64,
    ) -> Result<Vec<GameRecord>, StoreError>;

    /// Participant rows for a game, in player id order.
    fn participants(
        &self,
        game_id: GameId,
    ) -> Result<Vec<ParticipantRecord>, StoreError>;

    /// Drawings for a game, in player id order.
    fn drawings(&self, game_id: GameId) -> Result<Vec<DrawingRecord>, StoreError>;

    fn drawing(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> Result<Option<DrawingRecord>, StoreError>;

    /// Votes for a game, in voter id order.
    fn votes(&self, game_id: GameId) -> Result<Vec<VoteRecord>, StoreError>;

    fn vote(
        &self,
        game_id: GameId,
        voter_id: PlayerId,
    ) -> Result<Option<VoteRecord>, StoreError>;

    /// The prompt catalog. Read-only at runtime.
    fn prompts(&self) -> Result<Vec<PromptPair>, StoreError>;

    /// Applies `changes` atomically.
    ///
    /// # Errors
    /// [`StoreError::Conflict`] on a unique constraint violation,
    /// [`StoreError::MissingRow`] if an update targets an absent row.
    /// Either way nothing was written.
    fn commit(&self, changes: Changeset) -> Result<(), StoreError>;
}
