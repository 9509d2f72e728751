//! Resolving tokens to players and checking what they may do.

use std::sync::Arc;

use inkling_protocol::RoomId;
use inkling_store::{EntityStore, PlayerRecord};

use crate::SessionError;

/// Resolves a bearer token to the player it identifies.
///
/// The server uses [`StoreAuthenticator`]; tests can substitute anything
/// that maps tokens to players.
pub trait Authenticator: Send + Sync + 'static {
    /// Returns the active player holding `token`.
    ///
    /// # Errors
    /// - [`SessionError::InvalidToken`] if no player holds it
    /// - [`SessionError::Departed`] if the player is no longer active
    fn authenticate(&self, token: &str) -> Result<PlayerRecord, SessionError>;

    /// [`authenticate`](Self::authenticate) plus [`require_member`].
    fn authorize(&self, token: &str, room_id: RoomId) -> Result<PlayerRecord, SessionError> {
        let player = self.authenticate(token)?;
        require_member(&player, room_id)?;
        Ok(player)
    }

    /// [`authorize`](Self::authorize) plus [`require_admin`].
    fn authorize_admin(
        &self,
        token: &str,
        room_id: RoomId,
    ) -> Result<PlayerRecord, SessionError> {
        let player = self.authorize(token, room_id)?;
        require_admin(&player)?;
        Ok(player)
    }
}

/// Looks tokens up in the entity store.
#[derive(Clone)]
pub struct StoreAuthenticator {
    store: Arc<dyn EntityStore>,
}

impl StoreAuthenticator {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

impl Authenticator for StoreAuthenticator {
    fn authenticate(&self, token: &str) -> Result<PlayerRecord, SessionError> {
        let player = self
            .store
            .player_by_token(token)?
            .ok_or(SessionError::InvalidToken)?;
        if !player.active {
            tracing::debug!(player_id = %player.id, "token of departed player rejected");
            return Err(SessionError::Departed(player.id));
        }
        Ok(player)
    }
}

/// Fails unless `player` belongs to `room_id`.
pub fn require_member(player: &PlayerRecord, room_id: RoomId) -> Result<(), SessionError> {
    if player.room_id != room_id {
        return Err(SessionError::WrongRoom {
            player: player.id,
            room: room_id,
        });
    }
    Ok(())
}

/// Fails unless `player` is the room admin.
pub fn require_admin(player: &PlayerRecord) -> Result<(), SessionError> {
    if !player.is_admin {
        return Err(SessionError::NotAdmin(player.id));
    }
    Ok(())
}
