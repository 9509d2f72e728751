//! Room actor: one Tokio task per room, owning every mutation of it.
//!
//! All actions on a room, including the sweeper's expiry, arrive as
//! [`RoomCommand`]s on the actor's channel and run one at a time. That is
//! what makes read-validate-commit sequences (start, auto-advance, admin
//! hand-off) atomic per room without row locks. Events are published only
//! after the store accepted the changeset.

use std::collections::HashSet;
use std::sync::Arc;

use inkling_protocol::{
    DrawingView, EndReason, GameId, GameStatus, JoinReceipt, PlayerId, PlayerView, PromptView,
    RoomCode, RoomId, RoomSnapshot, RoomStatus, RoundResult, RoundStart, SubmissionStatus, Tally,
};
use inkling_session::issue_token;
use inkling_store::{
    BlobKey, Changeset, Constraint, DrawingRecord, GameRecord, ParticipantRecord, PlayerRecord,
    RoomRecord, StoreError, VoteRecord, Write,
};
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::broadcast::EventBroadcaster;
use crate::round::{self, active_ids, everyone_finished};
use crate::{RoomConfig, RoomDeps, RoomError};

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Commands sent to a room actor. Every variant carries a reply channel.
pub(crate) enum RoomCommand {
    Join {
        name: Option<String>,
        reply: Reply<JoinReceipt>,
    },
    Snapshot {
        reply: Reply<RoomSnapshot>,
    },
    UpdateSettings {
        token: String,
        draw_seconds: Option<u32>,
        vote_seconds: Option<u32>,
        reply: Reply<RoomSnapshot>,
    },
    Reset {
        token: String,
        reply: Reply<()>,
    },
    Leave {
        token: String,
        reply: Reply<()>,
    },
    Kick {
        token: String,
        target: PlayerId,
        reply: Reply<()>,
    },
    UpdateAvatar {
        token: String,
        avatar: String,
        reply: Reply<PlayerView>,
    },
    Start {
        reply: Reply<RoundStart>,
    },
    Prompt {
        token: String,
        reply: Reply<PromptView>,
    },
    LeaveGame {
        token: String,
        reply: Reply<()>,
    },
    SubmitDrawing {
        token: String,
        file_name: Option<String>,
        bytes: Vec<u8>,
        reply: Reply<DrawingView>,
    },
    UnsubmitDrawing {
        token: String,
        reply: Reply<()>,
    },
    Drawings {
        reply: Reply<Vec<DrawingView>>,
    },
    SubmissionStatus {
        token: String,
        reply: Reply<SubmissionStatus>,
    },
    React {
        token: String,
        target: PlayerId,
        emoji: String,
        reply: Reply<()>,
    },
    Vote {
        token: String,
        target: PlayerId,
        reply: Reply<Tally>,
    },
    GetTally {
        reply: Reply<Tally>,
    },
    GetResult {
        reply: Reply<RoundResult>,
    },
    Finish {
        reply: Reply<()>,
    },
    /// Sent by the sweeper. Re-checked inside the actor, since the round
    /// may have moved on since the sweeper's query.
    Expire {
        game_id: GameId,
        cutoff_ms: u64,
        reply: Reply<bool>,
    },
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone. Every method is one round-trip to the actor; if the
/// actor is gone the call fails with [`RoomError::Unavailable`].
#[derive(Clone, Debug)]
pub struct RoomHandle {
    room_id: RoomId,
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// `true` once the actor task has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    // -- Roster -----------------------------------------------------------

    /// Adds a player. The first active player becomes admin.
    pub async fn join(&self, name: Option<String>) -> Result<JoinReceipt, RoomError> {
        self.request(|reply| RoomCommand::Join { name, reply }).await
    }

    pub async fn leave(&self, token: &str) -> Result<(), RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::Leave { token, reply }).await
    }

    /// Admin only.
    pub async fn kick(&self, token: &str, target: PlayerId) -> Result<(), RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::Kick {
            token,
            target,
            reply,
        })
        .await
    }

    pub async fn update_avatar(&self, token: &str, avatar: String) -> Result<PlayerView, RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::UpdateAvatar {
            token,
            avatar,
            reply,
        })
        .await
    }

    // -- Room lifecycle ---------------------------------------------------

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Admin only. `None` keeps the current value; others are clamped.
    pub async fn update_settings(
        &self,
        token: &str,
        draw_seconds: Option<u32>,
        vote_seconds: Option<u32>,
    ) -> Result<RoomSnapshot, RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::UpdateSettings {
            token,
            draw_seconds,
            vote_seconds,
            reply,
        })
        .await
    }

    /// Admin only. Abandons any live round.
    pub async fn reset(&self, token: &str) -> Result<(), RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::Reset { token, reply }).await
    }

    // -- Round ------------------------------------------------------------

    pub async fn start(&self) -> Result<RoundStart, RoomError> {
        self.request(|reply| RoomCommand::Start { reply }).await
    }

    pub async fn prompt(&self, token: &str) -> Result<PromptView, RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::Prompt { token, reply }).await
    }

    /// Drops the caller out of the live round while keeping them in the
    /// room.
    pub async fn leave_game(&self, token: &str) -> Result<(), RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::LeaveGame { token, reply }).await
    }

    pub async fn submit_drawing(
        &self,
        token: &str,
        file_name: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<DrawingView, RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::SubmitDrawing {
            token,
            file_name,
            bytes,
            reply,
        })
        .await
    }

    pub async fn unsubmit_drawing(&self, token: &str) -> Result<(), RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::UnsubmitDrawing { token, reply })
            .await
    }

    pub async fn drawings(&self) -> Result<Vec<DrawingView>, RoomError> {
        self.request(|reply| RoomCommand::Drawings { reply }).await
    }

    pub async fn submission_status(&self, token: &str) -> Result<SubmissionStatus, RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::SubmissionStatus { token, reply })
            .await
    }

    pub async fn react(&self, token: &str, target: PlayerId, emoji: String) -> Result<(), RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::React {
            token,
            target,
            emoji,
            reply,
        })
        .await
    }

    /// Returns the tally after the vote.
    pub async fn vote(&self, token: &str, target: PlayerId) -> Result<Tally, RoomError> {
        let token = token.to_string();
        self.request(|reply| RoomCommand::Vote {
            token,
            target,
            reply,
        })
        .await
    }

    pub async fn tally(&self) -> Result<Tally, RoomError> {
        self.request(|reply| RoomCommand::GetTally { reply }).await
    }

    pub async fn result(&self) -> Result<RoundResult, RoomError> {
        self.request(|reply| RoomCommand::GetResult { reply }).await
    }

    /// Forces VOTING to RESULTS.
    pub async fn finish(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Finish { reply }).await
    }

    /// Ends `game_id` if it is still running and was created before
    /// `cutoff_ms`. Returns `true` if a live round was ended.
    pub async fn expire(&self, game_id: GameId, cutoff_ms: u64) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Expire {
            game_id,
            cutoff_ms,
            reply,
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// What a committed round change still has to announce.
enum Followup {
    Nothing,
    DiscussStarted,
    ShowResults(GameId),
    GameEnded(EndReason),
}

struct RoomActor {
    room_id: RoomId,
    code: RoomCode,
    deps: RoomDeps,
    config: Arc<RoomConfig>,
    events: EventBroadcaster,
    rng: StdRng,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        info!(room = %self.code, "room actor started");
        while let Some(cmd) = self.receiver.recv().await {
            self.handle(cmd).await;
        }
        info!(room = %self.code, "room actor stopped");
    }

    async fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { name, reply } => {
                let result = self.join(name);
                self.respond("join", reply, result);
            }
            RoomCommand::Snapshot { reply } => {
                let result = self.snapshot();
                self.respond("snapshot", reply, result);
            }
            RoomCommand::UpdateSettings {
                token,
                draw_seconds,
                vote_seconds,
                reply,
            } => {
                let result = self.update_settings(&token, draw_seconds, vote_seconds);
                self.respond("update_settings", reply, result);
            }
            RoomCommand::Reset { token, reply } => {
                let result = self.reset(&token);
                self.respond("reset", reply, result);
            }
            RoomCommand::Leave { token, reply } => {
                let result = self.leave(&token);
                self.respond("leave", reply, result);
            }
            RoomCommand::Kick {
                token,
                target,
                reply,
            } => {
                let result = self.kick(&token, target);
                self.respond("kick", reply, result);
            }
            RoomCommand::UpdateAvatar {
                token,
                avatar,
                reply,
            } => {
                let result = self.update_avatar(&token, avatar);
                self.respond("update_avatar", reply, result);
            }
            RoomCommand::Start { reply } => {
                let result = self.start();
                self.respond("start", reply, result);
            }
            RoomCommand::Prompt { token, reply } => {
                let result = self.prompt(&token);
                self.respond("prompt", reply, result);
            }
            RoomCommand::LeaveGame { token, reply } => {
                let result = self.leave_game(&token);
                self.respond("leave_game", reply, result);
            }
            RoomCommand::SubmitDrawing {
                token,
                file_name,
                bytes,
                reply,
            } => {
                let result = self.submit_drawing(&token, file_name, bytes).await;
                self.respond("submit_drawing", reply, result);
            }
            RoomCommand::UnsubmitDrawing { token, reply } => {
                let result = self.unsubmit_drawing(&token);
                self.respond("unsubmit_drawing", reply, result);
            }
            RoomCommand::Drawings { reply } => {
                let result = self.drawings();
                self.respond("drawings", reply, result);
            }
            RoomCommand::SubmissionStatus { token, reply } => {
                let result = self.submission_status(&token);
                self.respond("submission_status", reply, result);
            }
            RoomCommand::React {
                token,
                target,
                emoji,
                reply,
            } => {
                let result = self.react(&token, target, emoji);
                self.respond("react", reply, result);
            }
            RoomCommand::Vote {
                token,
                target,
                reply,
            } => {
                let result = self.vote(&token, target);
                self.respond("vote", reply, result);
            }
            RoomCommand::GetTally { reply } => {
                let result = self.tally();
                self.respond("tally", reply, result);
            }
            RoomCommand::GetResult { reply } => {
                let result = self.result();
                self.respond("result", reply, result);
            }
            RoomCommand::Finish { reply } => {
                let result = self.finish();
                self.respond("finish", reply, result);
            }
            RoomCommand::Expire {
                game_id,
                cutoff_ms,
                reply,
            } => {
                let result = self.expire(game_id, cutoff_ms);
                self.respond("expire", reply, result);
            }
        }
    }

    /// Sends the reply. The caller may have given up waiting; that's fine.
    fn respond<T>(&self, action: &'static str, reply: Reply<T>, result: Result<T, RoomError>) {
        if let Err(e) = &result {
            debug!(room = %self.code, action, error = %e, "action rejected");
        }
        let _ = reply.send(result);
    }

    // -- Lookups ----------------------------------------------------------

    fn now(&self) -> u64 {
        self.deps.clock.now_ms()
    }

    fn room(&self) -> Result<RoomRecord, RoomError> {
        self.deps
            .store
            .room(self.room_id)?
            .ok_or_else(|| RoomError::RoomNotFound(self.code.clone()))
    }

    /// Active players in id order.
    fn active_players(&self) -> Result<Vec<PlayerRecord>, RoomError> {
        let mut players = self.deps.store.players_in_room(self.room_id)?;
        players.retain(|p| p.active);
        Ok(players)
    }

    /// The most recent round, finished or not.
    fn current_game(&self, room: &RoomRecord) -> Result<GameRecord, RoomError> {
        let id = room.current_game_id.ok_or(RoomError::RoundNotStarted)?;
        self.deps
            .store
            .game(id)?
            .ok_or(RoomError::RoundNotStarted)
    }

    /// The current round if it is still running.
    fn live_game(&self, room: &RoomRecord) -> Result<Option<GameRecord>, RoomError> {
        let Some(id) = room.current_game_id else {
            return Ok(None);
        };
        Ok(self
            .deps
            .store
            .game(id)?
            .filter(|g| !g.status.is_terminal()))
    }

    fn room_player(&self, room: &RoomRecord, id: PlayerId) -> Result<PlayerRecord, RoomError> {
        let player = self
            .deps
            .store
            .player(id)?
            .ok_or(RoomError::PlayerNotFound(id))?;
        if player.room_id != room.id {
            return Err(RoomError::TargetNotInRoom(id));
        }
        Ok(player)
    }

    fn require_participant(
        participants: &[ParticipantRecord],
        player_id: PlayerId,
    ) -> Result<(), RoomError> {
        if participants.iter().any(|p| p.player_id == player_id && p.active) {
            Ok(())
        } else {
            Err(RoomError::NotParticipant(player_id))
        }
    }

    fn expect_phase(room: &RoomRecord, expected: RoomStatus) -> Result<(), RoomError> {
        if room.status != expected {
            return Err(RoomError::WrongPhase {
                expected,
                actual: room.status,
            });
        }
        Ok(())
    }

    /// Players who already did this phase's action.
    fn finished(&self, status: RoomStatus, game_id: GameId) -> Result<HashSet<PlayerId>, RoomError> {
        Ok(match status {
            RoomStatus::Drawing => self
                .deps
                .store
                .drawings(game_id)?
                .into_iter()
                .map(|d| d.player_id)
                .collect(),
            RoomStatus::Voting => self
                .deps
                .store
                .votes(game_id)?
                .into_iter()
                .map(|v| v.voter_id)
                .collect(),
            RoomStatus::Lobby | RoomStatus::Results => HashSet::new(),
        })
    }

    // -- Round transitions -----------------------------------------------

    /// Decides what the participant change in `participants` means for the
    /// round, pushing any room/game writes onto `changes`.
    ///
    /// No active participant left ends the round. Otherwise, if every
    /// active participant is in `finished`, the round advances one phase.
    fn settle(
        &self,
        room: &mut RoomRecord,
        game: &mut GameRecord,
        participants: &[ParticipantRecord],
        finished: &HashSet<PlayerId>,
        changes: &mut Changeset,
    ) -> Followup {
        let followup = if active_ids(participants).is_empty() {
            move_to(room, RoomStatus::Lobby);
            game.status = GameStatus::Completed;
            Followup::GameEnded(EndReason::AllPlayersLeft)
        } else if !everyone_finished(participants, finished) {
            return Followup::Nothing;
        } else {
            match room.status {
                RoomStatus::Drawing => {
                    move_to(room, RoomStatus::Voting);
                    game.status = GameStatus::Voting;
                    Followup::DiscussStarted
                }
                RoomStatus::Voting => {
                    move_to(room, RoomStatus::Results);
                    game.status = GameStatus::Results;
                    Followup::ShowResults(game.id)
                }
                RoomStatus::Lobby | RoomStatus::Results => return Followup::Nothing,
            }
        };
        changes.push(Write::UpdateGame(game.clone()));
        changes.push(Write::UpdateRoom(room.clone()));
        followup
    }

    /// Marks `player_id` as gone from the live round, if they were in it.
    fn withdraw_participant(
        &self,
        room: &mut RoomRecord,
        player_id: PlayerId,
        changes: &mut Changeset,
    ) -> Result<Followup, RoomError> {
        let Some(mut game) = self.live_game(room)? else {
            return Ok(Followup::Nothing);
        };
        let mut participants = self.deps.store.participants(game.id)?;
        let Some(row) = participants
            .iter_mut()
            .find(|p| p.player_id == player_id && p.active)
        else {
            return Ok(Followup::Nothing);
        };
        row.active = false;
        row.left_at = Some(self.now());
        changes.push(Write::UpdateParticipant(row.clone()));

        let finished = self.finished(room.status, game.id)?;
        Ok(self.settle(room, &mut game, &participants, &finished, changes))
    }

    fn announce(&self, followup: Followup, room: &RoomRecord) {
        match followup {
            Followup::Nothing => {}
            Followup::DiscussStarted => {
                info!(room = %self.code, "all drawings in, voting started");
                self.events.discuss_started(self.now(), room.vote_seconds);
            }
            Followup::ShowResults(game_id) => {
                info!(room = %self.code, %game_id, "all votes in, showing results");
                self.events.show_results(game_id);
            }
            Followup::GameEnded(reason) => {
                info!(room = %self.code, %reason, "round ended");
                self.events.game_ended(reason);
            }
        }
    }

    // -- Roster -----------------------------------------------------------

    fn join(&mut self, name: Option<String>) -> Result<JoinReceipt, RoomError> {
        let room = self.room()?;
        let active = self.active_players()?;
        if active.len() as u32 >= room.max_players {
            return Err(RoomError::CapacityExceeded {
                code: room.code,
                max: room.max_players,
            });
        }

        let name = round::display_name(&mut self.rng, name.as_deref(), self.config.max_name_len);
        let player = PlayerRecord {
            id: PlayerId(self.deps.store.next_id()),
            room_id: room.id,
            name,
            is_admin: !active.iter().any(|p| p.is_admin),
            avatar: None,
            session_token: issue_token(),
            active: true,
        };
        self.deps
            .store
            .commit(Write::InsertPlayer(player.clone()).into())?;

        info!(
            room = %self.code,
            player_id = %player.id,
            is_admin = player.is_admin,
            players = active.len() + 1,
            "player joined"
        );
        self.events.player_joined(player.view());

        Ok(JoinReceipt {
            player_id: player.id,
            is_admin: player.is_admin,
            session_token: player.session_token,
        })
    }

    fn leave(&mut self, token: &str) -> Result<(), RoomError> {
        let room = self.room()?;
        let player = self.deps.auth.authorize(token, room.id)?;
        self.remove_player(room, player)
    }

    fn kick(&mut self, token: &str, target: PlayerId) -> Result<(), RoomError> {
        let room = self.room()?;
        self.deps.auth.authorize_admin(token, room.id)?;
        let target = self.room_player(&room, target)?;
        if !target.active {
            return Err(RoomError::PlayerNotFound(target.id));
        }
        self.remove_player(room, target)
    }

    /// Soft-deletes `player`, hands admin on if needed and drops them out
    /// of the live round.
    fn remove_player(&mut self, mut room: RoomRecord, player: PlayerRecord) -> Result<(), RoomError> {
        let mut changes = Changeset::new();

        let mut promoted = None;
        if player.is_admin {
            let next = self
                .active_players()?
                .into_iter()
                .find(|p| p.id != player.id);
            if let Some(mut next) = next {
                next.is_admin = true;
                promoted = Some(next.id);
                changes.push(Write::UpdatePlayer(next));
            }
        }

        let departed = PlayerRecord {
            active: false,
            is_admin: false,
            ..player.clone()
        };
        changes.push(Write::UpdatePlayer(departed));

        let followup = self.withdraw_participant(&mut room, player.id, &mut changes)?;
        self.deps.store.commit(changes)?;

        info!(room = %self.code, player_id = %player.id, new_admin = ?promoted, "player left");
        self.events.player_left(player.id);
        self.announce(followup, &room);
        Ok(())
    }

    fn update_avatar(&mut self, token: &str, avatar: String) -> Result<PlayerView, RoomError> {
        let room = self.room()?;
        let mut player = self.deps.auth.authorize(token, room.id)?;
        player.avatar = Some(avatar);
        self.deps
            .store
            .commit(Write::UpdatePlayer(player.clone()).into())?;

        let view = player.view();
        self.events.avatar_updated(view.clone());
        Ok(view)
    }

    // -- Room lifecycle ---------------------------------------------------

    fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let room = self.room()?;
        let players = self
            .active_players()?
            .iter()
            .map(PlayerRecord::view)
            .collect();
        let active_game_participants = match room.current_game_id {
            Some(game_id) if room.status.is_active() => {
                active_ids(&self.deps.store.participants(game_id)?)
            }
            _ => Vec::new(),
        };
        Ok(RoomSnapshot {
            id: room.id,
            code: room.code,
            status: room.status,
            players,
            draw_seconds: room.draw_seconds,
            vote_seconds: room.vote_seconds,
            max_players: room.max_players,
            active_game_participants,
        })
    }

    fn update_settings(
        &mut self,
        token: &str,
        draw_seconds: Option<u32>,
        vote_seconds: Option<u32>,
    ) -> Result<RoomSnapshot, RoomError> {
        let mut room = self.room()?;
        self.deps.auth.authorize_admin(token, room.id)?;

        if let Some(seconds) = draw_seconds {
            room.draw_seconds = self.config.clamp_draw_seconds(seconds);
        }
        if let Some(seconds) = vote_seconds {
            room.vote_seconds = self.config.clamp_vote_seconds(seconds);
        }
        self.deps
            .store
            .commit(Write::UpdateRoom(room.clone()).into())?;

        info!(
            room = %self.code,
            draw_seconds = room.draw_seconds,
            vote_seconds = room.vote_seconds,
            "settings updated"
        );
        self.events
            .settings_updated(room.draw_seconds, room.vote_seconds, room.max_players);
        self.snapshot()
    }

    fn reset(&mut self, token: &str) -> Result<(), RoomError> {
        let mut room = self.room()?;
        self.deps.auth.authorize_admin(token, room.id)?;

        let mut changes = Changeset::new();
        if let Some(mut game) = self.live_game(&room)? {
            game.status = GameStatus::Completed;
            changes.push(Write::UpdateGame(game));
        }
        move_to(&mut room, RoomStatus::Lobby);
        changes.push(Write::UpdateRoom(room));
        self.deps.store.commit(changes)?;

        info!(room = %self.code, "room reset");
        self.events.room_reset();
        Ok(())
    }

    // -- Round ------------------------------------------------------------

    fn start(&mut self) -> Result<RoundStart, RoomError> {
        let mut room = self.room()?;
        Self::expect_phase(&room, RoomStatus::Lobby)?;

        let players = self.active_players()?;
        if players.len() < self.config.min_players {
            return Err(RoomError::InsufficientPlayers {
                required: self.config.min_players,
                active: players.len(),
            });
        }
        let prompts = self.deps.store.prompts()?;
        let prompt = round::pick_prompt(&mut self.rng, &prompts)
            .ok_or(RoomError::NoPromptsAvailable)?
            .clone();
        let imposter_id = round::pick_imposter(&mut self.rng, &players).ok_or(
            RoomError::InsufficientPlayers {
                required: self.config.min_players,
                active: 0,
            },
        )?;

        let previous_round = match room.current_game_id {
            Some(id) => self.deps.store.game(id)?.map_or(0, |g| g.round_number),
            None => 0,
        };
        let now = self.now();
        let game = GameRecord {
            id: GameId(self.deps.store.next_id()),
            room_id: room.id,
            status: GameStatus::Drawing,
            round_number: previous_round + 1,
            prompt_common: prompt.common,
            prompt_imposter: prompt.imposter,
            imposter_id,
            created_at: now,
        };

        let participant_ids: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
        let mut changes = Changeset::new().with(Write::InsertGame(game.clone()));
        changes.extend(participant_ids.iter().map(|&player_id| {
            Write::InsertParticipant(ParticipantRecord {
                game_id: game.id,
                player_id,
                active: true,
                left_at: None,
            })
        }));
        move_to(&mut room, RoomStatus::Drawing);
        room.current_game_id = Some(game.id);
        changes.push(Write::UpdateRoom(room.clone()));
        self.deps.store.commit(changes)?;

        info!(
            room = %self.code,
            game_id = %game.id,
            round = game.round_number,
            players = participant_ids.len(),
            "round started"
        );

        let start_at = now + self.config.countdown_lead.as_millis() as u64;
        let server_time = start_at + u64::from(self.config.countdown_seconds) * 1000;
        let vote_start_time = server_time + u64::from(room.draw_seconds) * 1000;
        self.events.countdown(start_at, self.config.countdown_seconds);
        self.events.game_started(
            game.id,
            game.prompt_common.clone(),
            server_time,
            room.draw_seconds,
            room.vote_seconds,
            vote_start_time,
            participant_ids,
        );

        Ok(RoundStart {
            game_id: game.id,
            room_id: room.id,
            prompt_common: game.prompt_common,
        })
    }

    fn prompt(&self, token: &str) -> Result<PromptView, RoomError> {
        let room = self.room()?;
        let player = self.deps.auth.authorize(token, room.id)?;
        let game = self.current_game(&room)?;
        Ok(PromptView {
            game_id: game.id,
            prompt: game.prompt_for(player.id).to_string(),
        })
    }

    fn leave_game(&mut self, token: &str) -> Result<(), RoomError> {
        let mut room = self.room()?;
        let player = self.deps.auth.authorize(token, room.id)?;

        let mut changes = Changeset::new();
        let followup = self.withdraw_participant(&mut room, player.id, &mut changes)?;
        if !changes.is_empty() {
            self.deps.store.commit(changes)?;
            info!(room = %self.code, player_id = %player.id, "player left the round");
        }

        self.announce(followup, &room);
        self.events.player_left_game(player.id, player.name);
        Ok(())
    }

    async fn submit_drawing(
        &mut self,
        token: &str,
        file_name: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<DrawingView, RoomError> {
        let mut room = self.room()?;
        let player = self.deps.auth.authorize(token, room.id)?;
        let mut game = self.current_game(&room)?;
        Self::expect_phase(&room, RoomStatus::Drawing)?;
        let participants = self.deps.store.participants(game.id)?;
        Self::require_participant(&participants, player.id)?;
        if self.deps.store.drawing(game.id, player.id)?.is_some() {
            return Err(RoomError::AlreadySubmitted(player.id));
        }

        // The blob goes first; if the row commit fails the file is an
        // unreferenced orphan, never a half-written one.
        let key = BlobKey::new(room.code.clone(), game.id, player.id, file_name.as_deref());
        let path = self.deps.blobs.put(key, bytes).await?;

        let mut changes = Changeset::from(Write::InsertDrawing(DrawingRecord {
            game_id: game.id,
            player_id: player.id,
            file_path: path.clone(),
            submitted_at: self.now(),
        }));
        let mut finished = self.finished(RoomStatus::Drawing, game.id)?;
        finished.insert(player.id);
        let followup = self.settle(&mut room, &mut game, &participants, &finished, &mut changes);

        self.deps.store.commit(changes).map_err(|e| match e {
            StoreError::Conflict(Constraint::Drawing) => RoomError::AlreadySubmitted(player.id),
            other => other.into(),
        })?;

        info!(room = %self.code, game_id = %game.id, player_id = %player.id, "drawing submitted");
        self.events.drawing_uploaded(game.id, player.id);
        self.announce(followup, &room);

        Ok(DrawingView {
            player_id: player.id,
            url: self.deps.blobs.resolve(&path),
        })
    }

    /// Allowed in any phase of a live round. A drawing withdrawn during
    /// voting stays withdrawn since submissions close with the drawing phase.
    fn unsubmit_drawing(&mut self, token: &str) -> Result<(), RoomError> {
        let room = self.room()?;
        let player = self.deps.auth.authorize(token, room.id)?;
        let game = self.current_game(&room)?;
        self.deps.store.commit(
            Write::DeleteDrawing {
                game_id: game.id,
                player_id: player.id,
            }
            .into(),
        )?;

        debug!(room = %self.code, game_id = %game.id, player_id = %player.id, "drawing withdrawn");
        self.events.drawing_uploaded(game.id, player.id);
        Ok(())
    }

    fn drawings(&self) -> Result<Vec<DrawingView>, RoomError> {
        let room = self.room()?;
        let game = self.current_game(&room)?;
        Ok(self
            .deps
            .store
            .drawings(game.id)?
            .into_iter()
            .map(|d| DrawingView {
                player_id: d.player_id,
                url: self.deps.blobs.resolve(&d.file_path),
            })
            .collect())
    }

    fn submission_status(&self, token: &str) -> Result<SubmissionStatus, RoomError> {
        let room = self.room()?;
        let player = self.deps.auth.authorize(token, room.id)?;
        let game = self.current_game(&room)?;
        let drawing = self.deps.store.drawing(game.id, player.id)?;
        Ok(SubmissionStatus {
            has_submitted: drawing.is_some(),
            game_id: game.id,
            submitted_at: drawing.map(|d| d.submitted_at),
        })
    }

    fn react(&self, token: &str, target: PlayerId, emoji: String) -> Result<(), RoomError> {
        let room = self.room()?;
        self.deps.auth.authorize(token, room.id)?;
        let game = self.current_game(&room)?;
        self.room_player(&room, target)?;
        self.events.reaction(game.id, target, emoji);
        Ok(())
    }

    fn vote(&mut self, token: &str, target: PlayerId) -> Result<Tally, RoomError> {
        let mut room = self.room()?;
        let voter = self.deps.auth.authorize(token, room.id)?;
        let mut game = self.current_game(&room)?;
        Self::expect_phase(&room, RoomStatus::Voting)?;
        let participants = self.deps.store.participants(game.id)?;
        Self::require_participant(&participants, voter.id)?;
        self.room_player(&room, target)?;

        let mut votes = self.deps.store.votes(game.id)?;
        if votes.iter().any(|v| v.voter_id == voter.id) {
            return Err(RoomError::AlreadyVoted(voter.id));
        }
        let vote = VoteRecord {
            game_id: game.id,
            voter_id: voter.id,
            target_id: target,
            created_at: self.now(),
        };

        let mut changes = Changeset::from(Write::InsertVote(vote.clone()));
        let finished: HashSet<PlayerId> = votes
            .iter()
            .map(|v| v.voter_id)
            .chain([voter.id])
            .collect();
        let followup = self.settle(&mut room, &mut game, &participants, &finished, &mut changes);

        self.deps.store.commit(changes).map_err(|e| match e {
            StoreError::Conflict(Constraint::Vote) => RoomError::AlreadyVoted(voter.id),
            other => other.into(),
        })?;

        votes.push(vote);
        let tally = round::tally(&votes);
        debug!(room = %self.code, game_id = %game.id, votes = votes.len(), "vote cast");
        self.events.vote_update(game.id, tally.clone());
        self.announce(followup, &room);
        Ok(tally)
    }

    fn tally(&self) -> Result<Tally, RoomError> {
        let room = self.room()?;
        let game = self.current_game(&room)?;
        Ok(round::tally(&self.deps.store.votes(game.id)?))
    }

    fn result(&self) -> Result<RoundResult, RoomError> {
        let room = self.room()?;
        let game = self.current_game(&room)?;
        let votes = self.deps.store.votes(game.id)?;
        Ok(round::verdict(game.imposter_id, &votes))
    }

    fn finish(&mut self) -> Result<(), RoomError> {
        let mut room = self.room()?;
        let mut game = self.current_game(&room)?;
        Self::expect_phase(&room, RoomStatus::Voting)?;

        move_to(&mut room, RoomStatus::Results);
        game.status = GameStatus::Results;
        self.deps.store.commit(
            Changeset::new()
                .with(Write::UpdateGame(game.clone()))
                .with(Write::UpdateRoom(room)),
        )?;

        info!(room = %self.code, game_id = %game.id, "voting finished manually");
        self.events.show_results(game.id);
        Ok(())
    }

    fn expire(&mut self, game_id: GameId, cutoff_ms: u64) -> Result<bool, RoomError> {
        let Some(mut game) = self.deps.store.game(game_id)? else {
            return Ok(false);
        };
        if game.status.is_terminal() || game.created_at >= cutoff_ms {
            return Ok(false);
        }

        let mut room = self.room()?;
        let live = room.current_game_id == Some(game.id) && room.status.is_active();
        game.status = GameStatus::Completed;
        let mut changes = Changeset::from(Write::UpdateGame(game));
        if live {
            move_to(&mut room, RoomStatus::Lobby);
            changes.push(Write::UpdateRoom(room));
        }
        self.deps.store.commit(changes)?;

        if live {
            info!(room = %self.code, %game_id, "round expired");
            self.events.game_ended(EndReason::TimerExpired);
        } else {
            debug!(room = %self.code, %game_id, "closed superseded round");
        }
        Ok(live)
    }
}

/// Sets the room's phase. Every caller has already checked the phase it
/// moves from.
fn move_to(room: &mut RoomRecord, next: RoomStatus) {
    debug_assert!(
        room.status.can_transition_to(next),
        "illegal room transition {} -> {}",
        room.status,
        next
    );
    room.status = next;
}

/// Spawns the actor for `room` and returns a handle to it.
pub(crate) fn spawn_room(
    room: &RoomRecord,
    deps: RoomDeps,
    config: Arc<RoomConfig>,
    rng: StdRng,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);
    let events = EventBroadcaster::new(deps.publisher.clone(), room.code.clone());

    let actor = RoomActor {
        room_id: room.id,
        code: room.code.clone(),
        deps,
        config,
        events,
        rng,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        room_id: room.id,
        code: room.code.clone(),
        sender: tx,
    }
}
