//! Integration tests for room actors, the manager and the sweeper, run
//! against the in-memory store, blob store and a recording publisher.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use inkling_protocol::{
    EndReason, GameId, GameStatus, JoinReceipt, PlayerId, RoomCode, RoomEvent, RoomId,
    RoomStatus, Winner,
};
use inkling_room::{
    ErrorKind, RecordingPublisher, RoomConfig, RoomDeps, RoomError, RoomHandle, RoomManager,
    SweepReport, Sweeper, SweeperConfig,
};
use inkling_session::SessionError;
use inkling_store::{
    default_prompts, Changeset, DrawingRecord, EntityStore, GameRecord, MemoryBlobStore,
    MemoryStore, ParticipantRecord, PlayerRecord, PromptPair, RoomRecord, StoreError,
    VoteRecord,
};
use inkling_tick::ManualClock;
use tokio::sync::Mutex;

// =========================================================================
// Harness
// =========================================================================

const START_MS: u64 = 1_000_000;

struct Harness {
    manager: Arc<Mutex<RoomManager>>,
    store: Arc<MemoryStore>,
    blobs: Arc<MemoryBlobStore>,
    events: Arc<RecordingPublisher>,
    clock: Arc<ManualClock>,
}

fn harness_with_prompts(prompts: Vec<PromptPair>) -> Harness {
    let store = Arc::new(MemoryStore::with_prompts(prompts));
    let blobs = Arc::new(MemoryBlobStore::new());
    let events = Arc::new(RecordingPublisher::new());
    let clock = Arc::new(ManualClock::new(START_MS));
    let deps = RoomDeps::new(store.clone(), blobs.clone(), events.clone(), clock.clone());
    let manager = RoomManager::with_seed(deps, RoomConfig::default(), 42);
    Harness {
        manager: Arc::new(Mutex::new(manager)),
        store,
        blobs,
        events,
        clock,
    }
}

fn harness() -> Harness {
    harness_with_prompts(default_prompts())
}

impl Harness {
    async fn room(&self) -> RoomHandle {
        let (_, handle) = self.manager.lock().await.create_room().unwrap();
        handle
    }

    /// A fresh room with `n` joined players; the first is admin.
    async fn lobby(&self, n: usize) -> (RoomHandle, Vec<JoinReceipt>) {
        let room = self.room().await;
        let mut players = Vec::with_capacity(n);
        for i in 0..n {
            players.push(room.join(Some(format!("player{i}"))).await.unwrap());
        }
        (room, players)
    }

    fn game(&self, room: &RoomHandle) -> GameRecord {
        let record = self.store.room(room.room_id()).unwrap().unwrap();
        let game_id = record.current_game_id.expect("no round started");
        self.store.game(game_id).unwrap().unwrap()
    }

    async fn status(&self, room: &RoomHandle) -> RoomStatus {
        room.snapshot().await.unwrap().status
    }
}

async fn submit_all(room: &RoomHandle, players: &[JoinReceipt]) {
    for p in players {
        room.submit_drawing(&p.session_token, Some("art.png".into()), vec![1, 2, 3])
            .await
            .unwrap();
    }
}

// =========================================================================
// Room creation and roster
// =========================================================================

#[tokio::test]
async fn test_create_room_starts_in_lobby_with_defaults() {
    let h = harness();
    let (summary, room) = h.manager.lock().await.create_room().unwrap();

    assert_eq!(summary.status, RoomStatus::Lobby);
    assert_eq!(&summary.code, room.code());

    let snap = room.snapshot().await.unwrap();
    assert_eq!(snap.draw_seconds, 120);
    assert_eq!(snap.vote_seconds, 60);
    assert_eq!(snap.max_players, 8);
    assert!(snap.players.is_empty());
    assert!(snap.active_game_participants.is_empty());
}

#[tokio::test]
async fn test_create_room_codes_are_unique() {
    let h = harness();
    let mut manager = h.manager.lock().await;
    let a = manager.create_room().unwrap().0;
    let b = manager.create_room().unwrap().0;
    assert_ne!(a.code, b.code);
    assert_eq!(manager.room_count(), 2);
}

#[tokio::test]
async fn test_inverted_config_bounds_do_not_break_settings() {
    let store = Arc::new(MemoryStore::with_prompts(default_prompts()));
    let deps = RoomDeps::new(
        store,
        Arc::new(MemoryBlobStore::new()),
        Arc::new(RecordingPublisher::new()),
        Arc::new(ManualClock::new(START_MS)),
    );
    let config = RoomConfig {
        min_draw_seconds: 300,
        max_draw_seconds: 15,
        ..RoomConfig::default()
    };
    let mut manager = RoomManager::with_seed(deps, config, 1);
    let (_, room) = manager.create_room().unwrap();
    let admin = room.join(Some("host".into())).await.unwrap();

    let snap = room
        .update_settings(&admin.session_token, Some(5), None)
        .await
        .unwrap();
    assert_eq!(snap.draw_seconds, 15);
    assert_eq!(manager.config().max_draw_seconds, 300);
}

#[tokio::test]
async fn test_room_lookup_unknown_code_not_found() {
    let h = harness();
    let code = RoomCode::parse("ZZZZZZ").unwrap();
    let err = h.manager.lock().await.room(&code).unwrap_err();
    assert!(matches!(err, RoomError::RoomNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_room_lookup_by_code_returns_same_room() {
    let h = harness();
    let room = h.room().await;
    let found = h.manager.lock().await.room(room.code()).unwrap();
    assert_eq!(found.room_id(), room.room_id());
}

#[tokio::test]
async fn test_join_first_player_is_admin() {
    let h = harness();
    let (room, players) = h.lobby(3).await;

    assert!(players[0].is_admin);
    assert!(!players[1].is_admin);
    assert!(!players[2].is_admin);
    assert_eq!(h.events.count("PLAYER_JOINED"), 3);

    let snap = room.snapshot().await.unwrap();
    assert_eq!(snap.players.len(), 3);
    assert_eq!(snap.players[0].name, "player0");
}

#[tokio::test]
async fn test_join_blank_name_gets_generated_name() {
    let h = harness();
    let room = h.room().await;
    room.join(Some("   ".into())).await.unwrap();
    room.join(None).await.unwrap();

    let snap = room.snapshot().await.unwrap();
    assert!(snap.players.iter().all(|p| p.name.starts_with("Player")));
}

#[tokio::test]
async fn test_join_long_name_is_truncated() {
    let h = harness();
    let room = h.room().await;
    room.join(Some("x".repeat(80))).await.unwrap();
    let snap = room.snapshot().await.unwrap();
    assert_eq!(snap.players[0].name.chars().count(), 50);
}

#[tokio::test]
async fn test_join_full_room_capacity_exceeded() {
    let h = harness();
    let (room, _) = h.lobby(8).await;
    let err = room.join(Some("late".into())).await.unwrap_err();
    assert!(matches!(err, RoomError::CapacityExceeded { max: 8, .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_join_event_never_carries_token() {
    let h = harness();
    let (_, players) = h.lobby(1).await;
    let json = serde_json::to_string(&h.events.events()).unwrap();
    assert!(!json.contains(&players[0].session_token));
}

#[tokio::test]
async fn test_admin_leave_hands_off_to_lowest_id() {
    let h = harness();
    let (room, players) = h.lobby(3).await;

    room.leave(&players[0].session_token).await.unwrap();

    let snap = room.snapshot().await.unwrap();
    assert_eq!(snap.players.len(), 2);
    assert_eq!(snap.players[0].id, players[1].player_id);
    assert!(snap.players[0].is_admin);
    assert!(!snap.players[1].is_admin);
    assert_eq!(h.events.count("PLAYER_LEFT"), 1);
}

#[tokio::test]
async fn test_departed_token_is_forbidden() {
    let h = harness();
    let (room, players) = h.lobby(2).await;
    room.leave(&players[1].session_token).await.unwrap();

    let err = room.leave(&players[1].session_token).await.unwrap_err();
    assert!(matches!(err, RoomError::Session(SessionError::Departed(_))));
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let h = harness();
    let (room, _) = h.lobby(1).await;
    let err = room.leave("not-a-token").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn test_token_from_other_room_is_forbidden() {
    let h = harness();
    let (room_a, _) = h.lobby(1).await;
    let (_, players_b) = h.lobby(1).await;
    let err = room_a
        .update_settings(&players_b[0].session_token, Some(60), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::Session(SessionError::WrongRoom { .. })));
}

#[tokio::test]
async fn test_kick_by_non_admin_forbidden() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    let err = room
        .kick(&players[1].session_token, players[2].player_id)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::Session(SessionError::NotAdmin(_))));
    assert_eq!(room.snapshot().await.unwrap().players.len(), 3);
}

#[tokio::test]
async fn test_kick_removes_player() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.kick(&players[0].session_token, players[2].player_id)
        .await
        .unwrap();

    let snap = room.snapshot().await.unwrap();
    assert_eq!(snap.players.len(), 2);
    assert!(snap.players.iter().all(|p| p.id != players[2].player_id));
}

#[tokio::test]
async fn test_kick_unknown_player_not_found() {
    let h = harness();
    let (room, players) = h.lobby(2).await;
    let err = room
        .kick(&players[0].session_token, PlayerId(9_999))
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::PlayerNotFound(_)));
}

#[tokio::test]
async fn test_kick_last_drawer_advances_to_voting() {
    let h = harness();
    let (room, players) = h.lobby(4).await;
    room.start().await.unwrap();
    submit_all(&room, &players[..3]).await;
    h.events.clear();

    room.kick(&players[0].session_token, players[3].player_id)
        .await
        .unwrap();

    assert_eq!(h.status(&room).await, RoomStatus::Voting);
    assert_eq!(h.events.count("DISCUSS_STARTED"), 1);
    let kinds = h.events.kinds();
    let left = kinds.iter().position(|k| *k == "PLAYER_LEFT").unwrap();
    let discuss = kinds.iter().position(|k| *k == "DISCUSS_STARTED").unwrap();
    assert!(left < discuss, "unexpected order: {kinds:?}");
}

#[tokio::test]
async fn test_kick_player_from_other_room_not_found() {
    let h = harness();
    let (room_a, players_a) = h.lobby(2).await;
    let (room_b, players_b) = h.lobby(2).await;

    let err = room_a
        .kick(&players_a[0].session_token, players_b[1].player_id)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::TargetNotInRoom(id) if id == players_b[1].player_id));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(room_b.snapshot().await.unwrap().players.len(), 2);
}

#[tokio::test]
async fn test_update_avatar_broadcasts() {
    let h = harness();
    let (room, players) = h.lobby(1).await;
    let view = room
        .update_avatar(&players[0].session_token, "cat".into())
        .await
        .unwrap();
    assert_eq!(view.avatar.as_deref(), Some("cat"));
    assert_eq!(h.events.count("AVATAR_UPDATED"), 1);
}

// =========================================================================
// Settings and reset
// =========================================================================

#[tokio::test]
async fn test_settings_clamped_and_broadcast() {
    let h = harness();
    let (room, players) = h.lobby(1).await;

    let snap = room
        .update_settings(&players[0].session_token, Some(5), Some(1_000))
        .await
        .unwrap();

    assert_eq!(snap.draw_seconds, 15);
    assert_eq!(snap.vote_seconds, 180);
    assert_eq!(h.events.count("SETTINGS_UPDATED"), 1);
}

#[tokio::test]
async fn test_settings_missing_value_kept() {
    let h = harness();
    let (room, players) = h.lobby(1).await;
    let snap = room
        .update_settings(&players[0].session_token, None, Some(90))
        .await
        .unwrap();
    assert_eq!(snap.draw_seconds, 120);
    assert_eq!(snap.vote_seconds, 90);
}

#[tokio::test]
async fn test_settings_by_non_admin_forbidden() {
    let h = harness();
    let (room, players) = h.lobby(2).await;
    let err = room
        .update_settings(&players[1].session_token, Some(60), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(h.events.count("SETTINGS_UPDATED"), 0);
}

#[tokio::test]
async fn test_reset_abandons_round() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();

    room.reset(&players[0].session_token).await.unwrap();

    assert_eq!(h.status(&room).await, RoomStatus::Lobby);
    assert_eq!(h.game(&room).status, GameStatus::Completed);
    assert_eq!(h.events.count("ROOM_RESET"), 1);
    // A new round can start right away.
    room.start().await.unwrap();
}

// =========================================================================
// Starting a round
// =========================================================================

#[tokio::test]
async fn test_start_with_two_players_insufficient() {
    let h = harness();
    let (room, _) = h.lobby(2).await;
    let err = room.start().await.unwrap_err();
    assert!(matches!(
        err,
        RoomError::InsufficientPlayers {
            required: 3,
            active: 2
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[tokio::test]
async fn test_start_without_prompts_fails() {
    let h = harness_with_prompts(Vec::new());
    let (room, _) = h.lobby(3).await;
    let err = room.start().await.unwrap_err();
    assert!(matches!(err, RoomError::NoPromptsAvailable));
    assert_eq!(h.status(&room).await, RoomStatus::Lobby);
}

#[tokio::test]
async fn test_start_twice_wrong_phase() {
    let h = harness();
    let (room, _) = h.lobby(3).await;
    room.start().await.unwrap();
    let err = room.start().await.unwrap_err();
    assert!(matches!(
        err,
        RoomError::WrongPhase {
            expected: RoomStatus::Lobby,
            actual: RoomStatus::Drawing
        }
    ));
}

#[tokio::test]
async fn test_start_publishes_countdown_then_started() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    h.events.clear();

    let start = room.start().await.unwrap();

    assert_eq!(h.events.kinds(), vec!["GAME_COUNTDOWN", "GAME_STARTED"]);
    let events = h.events.events();
    match &events[0] {
        RoomEvent::GameCountdown {
            start_at, seconds, ..
        } => {
            assert_eq!(*start_at, START_MS + 800);
            assert_eq!(*seconds, 3);
        }
        other => panic!("expected countdown, got {other:?}"),
    }
    match &events[1] {
        RoomEvent::GameStarted {
            game_id,
            server_time,
            vote_start_time,
            active_game_participants,
            prompt_common,
            ..
        } => {
            assert_eq!(*game_id, start.game_id);
            assert_eq!(*server_time, START_MS + 3_800);
            assert_eq!(*vote_start_time, START_MS + 3_800 + 120_000);
            assert_eq!(active_game_participants.len(), players.len());
            assert_eq!(prompt_common, &start.prompt_common);
        }
        other => panic!("expected started, got {other:?}"),
    }
}

#[tokio::test]
async fn test_start_snapshot_lists_participants() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();

    let snap = room.snapshot().await.unwrap();
    assert_eq!(snap.status, RoomStatus::Drawing);
    let ids: Vec<PlayerId> = players.iter().map(|p| p.player_id).collect();
    assert_eq!(snap.active_game_participants, ids);
}

#[tokio::test]
async fn test_prompt_imposter_sees_imposter_prompt() {
    let h = harness();
    let (room, players) = h.lobby(4).await;
    room.start().await.unwrap();
    let game = h.game(&room);

    for p in &players {
        let view = room.prompt(&p.session_token).await.unwrap();
        if p.player_id == game.imposter_id {
            assert_eq!(view.prompt, game.prompt_imposter);
        } else {
            assert_eq!(view.prompt, game.prompt_common);
        }
    }
}

#[tokio::test]
async fn test_round_numbers_increase() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    assert_eq!(h.game(&room).round_number, 1);
    room.reset(&players[0].session_token).await.unwrap();
    room.start().await.unwrap();
    assert_eq!(h.game(&room).round_number, 2);
}

#[tokio::test]
async fn test_imposter_selection_roughly_uniform() {
    let h = harness();
    let (room, players) = h.lobby(4).await;
    let admin = &players[0].session_token;

    let mut counts: HashMap<PlayerId, u32> = HashMap::new();
    for _ in 0..400 {
        room.start().await.unwrap();
        *counts.entry(h.game(&room).imposter_id).or_default() += 1;
        room.reset(admin).await.unwrap();
    }

    assert_eq!(counts.len(), 4);
    for (id, count) in counts {
        assert!((60..=140).contains(&count), "{id} was imposter {count} times");
    }
}

// =========================================================================
// Drawing phase
// =========================================================================

#[tokio::test]
async fn test_submit_before_start_round_not_started() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    let err = room
        .submit_drawing(&players[0].session_token, None, vec![1])
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::RoundNotStarted));
}

#[tokio::test]
async fn test_submit_stores_blob_and_broadcasts() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();

    let view = room
        .submit_drawing(&players[1].session_token, Some("../../etc/cat.png".into()), vec![9; 16])
        .await
        .unwrap();

    assert_eq!(view.player_id, players[1].player_id);
    assert!(view.url.starts_with("/uploads/"));
    assert!(view.url.ends_with("cat.png"));
    assert_eq!(h.blobs.len(), 1);
    assert_eq!(h.events.count("DRAWING_UPLOADED"), 1);
    assert_eq!(h.status(&room).await, RoomStatus::Drawing);

    let status = room
        .submission_status(&players[1].session_token)
        .await
        .unwrap();
    assert!(status.has_submitted);
    assert_eq!(status.submitted_at, Some(START_MS));

    let gallery = room.drawings().await.unwrap();
    assert_eq!(gallery, vec![view]);
}

#[tokio::test]
async fn test_submit_twice_conflict() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    let token = &players[0].session_token;

    room.submit_drawing(token, None, vec![1]).await.unwrap();
    let err = room.submit_drawing(token, None, vec![2]).await.unwrap_err();

    assert!(matches!(err, RoomError::AlreadySubmitted(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.events.count("DRAWING_UPLOADED"), 1);
}

#[tokio::test]
async fn test_unsubmit_allows_resubmit() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    let token = &players[0].session_token;

    room.submit_drawing(token, None, vec![1]).await.unwrap();
    room.unsubmit_drawing(token).await.unwrap();
    assert!(!room.submission_status(token).await.unwrap().has_submitted);

    room.submit_drawing(token, None, vec![2]).await.unwrap();
    assert!(room.submission_status(token).await.unwrap().has_submitted);
}

#[tokio::test]
async fn test_unsubmit_during_voting_is_final() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    submit_all(&room, &players).await;
    let token = &players[0].session_token;

    room.unsubmit_drawing(token).await.unwrap();
    assert!(!room.submission_status(token).await.unwrap().has_submitted);
    assert_eq!(room.drawings().await.unwrap().len(), 2);

    let err = room.submit_drawing(token, None, vec![9]).await.unwrap_err();
    assert!(matches!(
        err,
        RoomError::WrongPhase {
            actual: RoomStatus::Voting,
            ..
        }
    ));
    assert_eq!(h.status(&room).await, RoomStatus::Voting);
}

#[tokio::test]
async fn test_submit_by_late_joiner_not_participant() {
    let h = harness();
    let (room, _) = h.lobby(3).await;
    room.start().await.unwrap();
    let late = room.join(Some("late".into())).await.unwrap();

    let err = room
        .submit_drawing(&late.session_token, None, vec![1])
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::NotParticipant(_)));
}

#[tokio::test]
async fn test_all_drawings_start_discussion_once() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();

    submit_all(&room, &players).await;

    assert_eq!(h.status(&room).await, RoomStatus::Voting);
    assert_eq!(h.game(&room).status, GameStatus::Voting);
    assert_eq!(h.events.count("DISCUSS_STARTED"), 1);
    // The advance is announced after the last upload.
    let kinds = h.events.kinds();
    assert_eq!(kinds[kinds.len() - 2..], ["DRAWING_UPLOADED", "DISCUSS_STARTED"]);
}

#[tokio::test]
async fn test_concurrent_submissions_advance_exactly_once() {
    let h = harness();
    let (room, players) = h.lobby(6).await;
    room.start().await.unwrap();

    let tasks: Vec<_> = players
        .iter()
        .map(|p| {
            let room = room.clone();
            let token = p.session_token.clone();
            tokio::spawn(async move { room.submit_drawing(&token, None, vec![0; 64]).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.events.count("DISCUSS_STARTED"), 1);
    assert_eq!(h.events.count("DRAWING_UPLOADED"), 6);
    assert_eq!(h.status(&room).await, RoomStatus::Voting);
}

// =========================================================================
// Voting phase
// =========================================================================

#[tokio::test]
async fn test_vote_during_drawing_wrong_phase() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    let err = room
        .vote(&players[0].session_token, players[1].player_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RoomError::WrongPhase {
            expected: RoomStatus::Voting,
            ..
        }
    ));
}

#[tokio::test]
async fn test_vote_twice_conflict() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    submit_all(&room, &players).await;
    let token = &players[0].session_token;

    room.vote(token, players[1].player_id).await.unwrap();
    let err = room.vote(token, players[2].player_id).await.unwrap_err();

    assert!(matches!(err, RoomError::AlreadyVoted(_)));
    assert_eq!(room.tally().await.unwrap().get(&players[1].player_id), Some(&1));
}

#[tokio::test]
async fn test_vote_unknown_target_not_found() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    submit_all(&room, &players).await;
    let err = room
        .vote(&players[0].session_token, PlayerId(777))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_full_round_artists_catch_imposter() {
    let h = harness();
    let (room, players) = h.lobby(4).await;
    room.start().await.unwrap();
    submit_all(&room, &players).await;
    let imposter = h.game(&room).imposter_id;

    for p in &players {
        let tally = room.vote(&p.session_token, imposter).await.unwrap();
        assert!(tally.values().sum::<u32>() >= 1);
    }

    assert_eq!(h.status(&room).await, RoomStatus::Results);
    assert_eq!(h.events.count("VOTE_UPDATE"), 4);
    assert_eq!(h.events.count("SHOW_RESULTS"), 1);

    let result = room.result().await.unwrap();
    assert_eq!(result.imposter_id, imposter);
    assert_eq!(result.voted_out_id, Some(imposter));
    assert_eq!(result.winner, Winner::Artists);
    assert_eq!(result.tally.get(&imposter), Some(&4));

    // Reading the result has no side effects.
    assert_eq!(room.result().await.unwrap(), result);
    assert_eq!(h.events.count("SHOW_RESULTS"), 1);
}

#[tokio::test]
async fn test_result_without_votes_imposter_wins() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    submit_all(&room, &players).await;
    room.finish().await.unwrap();

    let result = room.result().await.unwrap();
    assert_eq!(result.voted_out_id, None);
    assert_eq!(result.winner, Winner::Imposter);
    assert!(result.tally.is_empty());
}

#[tokio::test]
async fn test_finish_forces_results_once() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    submit_all(&room, &players).await;

    room.finish().await.unwrap();
    let err = room.finish().await.unwrap_err();

    assert!(matches!(err, RoomError::WrongPhase { .. }));
    assert_eq!(h.events.count("SHOW_RESULTS"), 1);
    assert_eq!(h.game(&room).status, GameStatus::Results);
}

#[tokio::test]
async fn test_react_publishes_reaction_only() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    let before = h.store.votes(h.game(&room).id).unwrap().len();

    room.react(&players[0].session_token, players[1].player_id, "🔥".into())
        .await
        .unwrap();

    assert_eq!(h.events.count("REACTION"), 1);
    assert_eq!(h.store.votes(h.game(&room).id).unwrap().len(), before);
}

// =========================================================================
// Leaving mid-round
// =========================================================================

#[tokio::test]
async fn test_leave_game_by_last_drawer_advances() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    submit_all(&room, &players[..2]).await;
    assert_eq!(h.status(&room).await, RoomStatus::Drawing);

    room.leave_game(&players[2].session_token).await.unwrap();

    assert_eq!(h.status(&room).await, RoomStatus::Voting);
    assert_eq!(h.events.count("DISCUSS_STARTED"), 1);
    assert_eq!(h.events.count("PLAYER_LEFT_GAME"), 1);
    let snap = room.snapshot().await.unwrap();
    assert_eq!(snap.players.len(), 3);
    assert_eq!(snap.active_game_participants.len(), 2);
}

#[tokio::test]
async fn test_everyone_leaves_game_ends_round() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();

    for p in &players {
        room.leave_game(&p.session_token).await.unwrap();
    }

    assert_eq!(h.status(&room).await, RoomStatus::Lobby);
    assert_eq!(h.game(&room).status, GameStatus::Completed);
    assert_eq!(h.events.count("GAME_ENDED"), 1);
    assert_eq!(h.events.count("PLAYER_LEFT_GAME"), 3);
    let ended = h
        .events
        .events()
        .into_iter()
        .find(|e| e.kind() == "GAME_ENDED");
    assert!(matches!(
        ended,
        Some(RoomEvent::GameEnded {
            reason: EndReason::AllPlayersLeft,
            ..
        })
    ));
}

#[tokio::test]
async fn test_leave_game_in_lobby_still_announces() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.leave_game(&players[0].session_token).await.unwrap();
    assert_eq!(h.events.count("PLAYER_LEFT_GAME"), 1);
    assert_eq!(h.events.count("GAME_ENDED"), 0);
}

#[tokio::test]
async fn test_room_leave_during_voting_counts_as_done() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    submit_all(&room, &players).await;
    room.vote(&players[0].session_token, players[1].player_id)
        .await
        .unwrap();
    room.vote(&players[1].session_token, players[0].player_id)
        .await
        .unwrap();

    room.leave(&players[2].session_token).await.unwrap();

    assert_eq!(h.status(&room).await, RoomStatus::Results);
    assert_eq!(h.events.count("SHOW_RESULTS"), 1);
    assert_eq!(h.events.count("PLAYER_LEFT"), 1);
}

// =========================================================================
// Sweeper
// =========================================================================

fn sweeper(h: &Harness) -> Sweeper {
    Sweeper::new(h.manager.clone(), SweeperConfig::default())
}

#[tokio::test]
async fn test_sweeper_expires_stale_round() {
    let h = harness();
    let (room, _) = h.lobby(3).await;
    room.start().await.unwrap();
    h.clock.advance(Duration::from_secs(601));

    let report = sweeper(&h).sweep_once().await.unwrap();

    assert_eq!(report.examined, 1);
    assert_eq!(report.expired, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(h.status(&room).await, RoomStatus::Lobby);
    assert_eq!(h.game(&room).status, GameStatus::Completed);
    assert!(h.events.events().iter().any(|e| matches!(
        e,
        RoomEvent::GameEnded {
            reason: EndReason::TimerExpired,
            ..
        }
    )));

    // Already completed; nothing left to sweep.
    let again = sweeper(&h).sweep_once().await.unwrap();
    assert_eq!(again.examined, 0);
    assert_eq!(h.events.count("GAME_ENDED"), 1);
}

#[tokio::test]
async fn test_sweeper_leaves_fresh_round() {
    let h = harness();
    let (room, _) = h.lobby(3).await;
    room.start().await.unwrap();
    h.clock.advance(Duration::from_secs(60));

    let report = sweeper(&h).sweep_once().await.unwrap();

    assert_eq!(report.examined, 0);
    assert_eq!(h.status(&room).await, RoomStatus::Drawing);
}

#[tokio::test]
async fn test_sweeper_expires_round_in_results() {
    let h = harness();
    let (room, players) = h.lobby(3).await;
    room.start().await.unwrap();
    submit_all(&room, &players).await;
    room.finish().await.unwrap();
    h.clock.advance(Duration::from_secs(900));

    let report = sweeper(&h).sweep_once().await.unwrap();

    assert_eq!(report.expired, 1);
    assert_eq!(h.status(&room).await, RoomStatus::Lobby);
}

/// Delegates to a [`MemoryStore`], except that reading the room row named
/// by `broken` fails once armed.
struct BrokenRoomStore {
    inner: MemoryStore,
    broken: parking_lot::Mutex<Option<RoomId>>,
}

impl EntityStore for BrokenRoomStore {
    fn next_id(&self) -> u64 {
        self.inner.next_id()
    }
    fn room(&self, id: RoomId) -> Result<Option<RoomRecord>, StoreError> {
        if *self.broken.lock() == Some(id) {
            return Err(StoreError::Backend("room row unreadable".into()));
        }
        self.inner.room(id)
    }
    fn room_by_code(&self, code: &RoomCode) -> Result<Option<RoomRecord>, StoreError> {
        self.inner.room_by_code(code)
    }
    fn player(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        self.inner.player(id)
    }
    fn player_by_token(&self, token: &str) -> Result<Option<PlayerRecord>, StoreError> {
        self.inner.player_by_token(token)
    }
    fn players_in_room(&self, room_id: RoomId) -> Result<Vec<PlayerRecord>, StoreError> {
        self.inner.players_in_room(room_id)
    }
    fn game(&self, id: GameId) -> Result<Option<GameRecord>, StoreError> {
        self.inner.game(id)
    }
    fn stale_games(&self, created_before: u64) -> Result<Vec<GameRecord>, StoreError> {
        self.inner.stale_games(created_before)
    }
    fn participants(&self, game_id: GameId) -> Result<Vec<ParticipantRecord>, StoreError> {
        self.inner.participants(game_id)
    }
    fn drawings(&self, game_id: GameId) -> Result<Vec<DrawingRecord>, StoreError> {
        self.inner.drawings(game_id)
    }
    fn drawing(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> Result<Option<DrawingRecord>, StoreError> {
        self.inner.drawing(game_id, player_id)
    }
    fn votes(&self, game_id: GameId) -> Result<Vec<VoteRecord>, StoreError> {
        self.inner.votes(game_id)
    }
    fn vote(&self, game_id: GameId, voter_id: PlayerId) -> Result<Option<VoteRecord>, StoreError> {
        self.inner.vote(game_id, voter_id)
    }
    fn prompts(&self) -> Result<Vec<PromptPair>, StoreError> {
        self.inner.prompts()
    }
    fn commit(&self, changes: Changeset) -> Result<(), StoreError> {
        self.inner.commit(changes)
    }
}

#[tokio::test]
async fn test_sweeper_failure_in_one_room_does_not_stop_others() {
    let store = Arc::new(BrokenRoomStore {
        inner: MemoryStore::with_prompts(default_prompts()),
        broken: parking_lot::Mutex::new(None),
    });
    let events = Arc::new(RecordingPublisher::new());
    let clock = Arc::new(ManualClock::new(START_MS));
    let deps = RoomDeps::new(
        store.clone(),
        Arc::new(MemoryBlobStore::new()),
        events.clone(),
        clock.clone(),
    );
    let manager = Arc::new(Mutex::new(RoomManager::with_seed(deps, RoomConfig::default(), 42)));

    let mut rooms = Vec::new();
    for _ in 0..2 {
        let (_, room) = manager.lock().await.create_room().unwrap();
        for i in 0..3 {
            room.join(Some(format!("player{i}"))).await.unwrap();
        }
        room.start().await.unwrap();
        rooms.push(room);
    }
    clock.advance(Duration::from_secs(700));
    *store.broken.lock() = Some(rooms[0].room_id());

    let report = Sweeper::new(manager.clone(), SweeperConfig::default())
        .sweep_once()
        .await
        .unwrap();

    assert_eq!(
        report,
        SweepReport {
            examined: 2,
            expired: 1,
            failed: 1
        }
    );
    assert_eq!(rooms[1].snapshot().await.unwrap().status, RoomStatus::Lobby);
    assert_eq!(events.count("GAME_ENDED"), 1);

    // Once the room reads again, the next pass picks it up.
    *store.broken.lock() = None;
    let retry = Sweeper::new(manager, SweeperConfig::default())
        .sweep_once()
        .await
        .unwrap();
    assert_eq!(retry.expired, 1);
    assert_eq!(rooms[0].snapshot().await.unwrap().status, RoomStatus::Lobby);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_run_stops_on_shutdown() {
    let h = harness();
    let (tx, rx) = tokio::sync::watch::channel(false);
    let task = tokio::spawn(sweeper(&h).run(rx));

    tokio::time::sleep(Duration::from_secs(95)).await;
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("sweeper did not stop")
        .unwrap();
}
