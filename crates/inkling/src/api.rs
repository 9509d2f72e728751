//! The actions exposed to players and hosts.
//!
//! A transport binding (HTTP routes, RPC, a test) calls these with the raw
//! room code from the request and the caller's session token. Each call
//! resolves the room and forwards to its actor.

use std::sync::Arc;

use inkling_protocol::{
    DrawingView, JoinReceipt, PlayerId, PlayerView, PromptView, RoomCode, RoomSnapshot,
    RoomSummary, RoundResult, RoundStart, SubmissionStatus, Tally,
};
use inkling_room::{RoomHandle, RoomManager};
use inkling_session::SessionError;
use tokio::sync::Mutex;

use crate::InklingError;

/// Cheap to clone; every clone drives the same rooms.
#[derive(Clone)]
pub struct GameApi {
    rooms: Arc<Mutex<RoomManager>>,
}

impl GameApi {
    pub fn new(rooms: Arc<Mutex<RoomManager>>) -> Self {
        Self { rooms }
    }

    /// The shared manager, e.g. for a [`Sweeper`](inkling_room::Sweeper).
    pub fn manager(&self) -> &Arc<Mutex<RoomManager>> {
        &self.rooms
    }

    /// The manager lock is released before the caller talks to the actor.
    async fn room(&self, code: &str) -> Result<RoomHandle, InklingError> {
        let code = RoomCode::parse(code)?;
        Ok(self.rooms.lock().await.room(&code)?)
    }

    // -- Room lifecycle ---------------------------------------------------

    pub async fn create_room(&self) -> Result<RoomSummary, InklingError> {
        let (summary, _) = self.rooms.lock().await.create_room()?;
        Ok(summary)
    }

    pub async fn room_state(&self, code: &str) -> Result<RoomSnapshot, InklingError> {
        Ok(self.room(code).await?.snapshot().await?)
    }

    pub async fn update_settings(
        &self,
        code: &str,
        token: &str,
        draw_seconds: Option<u32>,
        vote_seconds: Option<u32>,
    ) -> Result<RoomSnapshot, InklingError> {
        let room = self.room(code).await?;
        Ok(room.update_settings(token, draw_seconds, vote_seconds).await?)
    }

    pub async fn reset_room(&self, code: &str, token: &str) -> Result<(), InklingError> {
        Ok(self.room(code).await?.reset(token).await?)
    }

    // -- Roster -----------------------------------------------------------

    pub async fn join_room(
        &self,
        code: &str,
        name: Option<String>,
    ) -> Result<JoinReceipt, InklingError> {
        Ok(self.room(code).await?.join(name).await?)
    }

    pub async fn leave_room(&self, code: &str, token: &str) -> Result<(), InklingError> {
        Ok(self.room(code).await?.leave(token).await?)
    }

    pub async fn kick_player(
        &self,
        code: &str,
        token: &str,
        target: PlayerId,
    ) -> Result<(), InklingError> {
        Ok(self.room(code).await?.kick(token, target).await?)
    }

    /// Not scoped by room code: the token alone names the player.
    pub async fn update_avatar(
        &self,
        token: &str,
        avatar: String,
    ) -> Result<PlayerView, InklingError> {
        let room = {
            let mut rooms = self.rooms.lock().await;
            let player = rooms
                .deps()
                .store
                .player_by_token(token)?
                .ok_or(SessionError::InvalidToken)?;
            rooms
                .room_by_id(player.room_id)?
                .ok_or(SessionError::InvalidToken)?
        };
        Ok(room.update_avatar(token, avatar).await?)
    }

    // -- Round ------------------------------------------------------------

    pub async fn start_round(&self, code: &str) -> Result<RoundStart, InklingError> {
        Ok(self.room(code).await?.start().await?)
    }

    pub async fn my_prompt(&self, code: &str, token: &str) -> Result<PromptView, InklingError> {
        Ok(self.room(code).await?.prompt(token).await?)
    }

    pub async fn leave_round(&self, code: &str, token: &str) -> Result<(), InklingError> {
        Ok(self.room(code).await?.leave_game(token).await?)
    }

    pub async fn submit_drawing(
        &self,
        code: &str,
        token: &str,
        file_name: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<DrawingView, InklingError> {
        let room = self.room(code).await?;
        Ok(room.submit_drawing(token, file_name, bytes).await?)
    }

    pub async fn withdraw_drawing(&self, code: &str, token: &str) -> Result<(), InklingError> {
        Ok(self.room(code).await?.unsubmit_drawing(token).await?)
    }

    pub async fn list_drawings(&self, code: &str) -> Result<Vec<DrawingView>, InklingError> {
        Ok(self.room(code).await?.drawings().await?)
    }

    pub async fn submission_status(
        &self,
        code: &str,
        token: &str,
    ) -> Result<SubmissionStatus, InklingError> {
        Ok(self.room(code).await?.submission_status(token).await?)
    }

    pub async fn react(
        &self,
        code: &str,
        token: &str,
        target: PlayerId,
        emoji: String,
    ) -> Result<(), InklingError> {
        Ok(self.room(code).await?.react(token, target, emoji).await?)
    }

    pub async fn cast_vote(
        &self,
        code: &str,
        token: &str,
        target: PlayerId,
    ) -> Result<Tally, InklingError> {
        Ok(self.room(code).await?.vote(token, target).await?)
    }

    pub async fn tally(&self, code: &str) -> Result<Tally, InklingError> {
        Ok(self.room(code).await?.tally().await?)
    }

    pub async fn result(&self, code: &str) -> Result<RoundResult, InklingError> {
        Ok(self.room(code).await?.result().await?)
    }

    pub async fn finish(&self, code: &str) -> Result<(), InklingError> {
        Ok(self.room(code).await?.finish().await?)
    }
}
