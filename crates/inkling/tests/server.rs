//! End-to-end tests: a built server, the action API and a real WebSocket
//! subscriber watching the room topic.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use inkling::prelude::*;
use inkling_protocol::JoinReceipt;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Running {
    api: GameApi,
    addr: std::net::SocketAddr,
    uploads: tempfile::TempDir,
    stop: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<Result<(), InklingError>>,
}

async fn start_server() -> Running {
    let uploads = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        uploads_dir: uploads.path().to_path_buf(),
        ..ServerConfig::default()
    };
    let server = InklingServer::builder()
        .config(config)
        .bind("127.0.0.1:0")
        .seed(7)
        .build()
        .await
        .expect("server should build");
    let api = server.api();
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(server.run(async {
        stopped.await.ok();
    }));
    Running {
        api,
        addr,
        uploads,
        stop,
        task,
    }
}

async fn subscribe(addr: std::net::SocketAddr, code: &RoomCode) -> Client {
    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    let frame = json!({"type": "Subscribe", "topic": format!("rooms/{code}")});
    client.send(Message::text(frame.to_string())).await.unwrap();
    assert_eq!(next_frame(&mut client).await["type"], "Subscribed");
    client
}

async fn next_frame(client: &mut Client) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for a frame")
        .unwrap()
        .unwrap();
    serde_json::from_slice(&msg.into_data()).unwrap()
}

/// Reads event frames until one of type `kind`, returning every event
/// type seen along the way.
async fn events_until(client: &mut Client, kind: &str) -> Vec<String> {
    let mut seen = Vec::new();
    loop {
        let frame = next_frame(client).await;
        let event_kind = frame["event"]["type"].as_str().unwrap_or_default().to_string();
        seen.push(event_kind.clone());
        if event_kind == kind {
            return seen;
        }
    }
}

async fn join_three(api: &GameApi, code: &str) -> Vec<JoinReceipt> {
    let mut players = Vec::new();
    for name in ["P1", "P2", "P3"] {
        players.push(api.join_room(code, Some(name.into())).await.unwrap());
    }
    players
}

#[tokio::test]
async fn test_full_round_streams_events_to_subscriber() {
    let server = start_server().await;
    let api = &server.api;
    let room = api.create_room().await.unwrap();
    let code = room.code.as_str();
    let mut client = subscribe(server.addr, &room.code).await;

    let players = join_three(api, code).await;
    assert!(players[0].is_admin);

    api.start_round(code).await.unwrap();
    for p in &players {
        api.submit_drawing(code, &p.session_token, Some("art.png".into()), vec![1, 2, 3])
            .await
            .unwrap();
    }
    assert_eq!(api.room_state(code).await.unwrap().status, RoomStatus::Voting);

    // Two votes for P2, one for P3.
    let (p1, p2, p3) = (&players[0], &players[1], &players[2]);
    api.cast_vote(code, &p1.session_token, p2.player_id).await.unwrap();
    api.cast_vote(code, &p2.session_token, p3.player_id).await.unwrap();
    api.cast_vote(code, &p3.session_token, p2.player_id).await.unwrap();
    assert_eq!(api.room_state(code).await.unwrap().status, RoomStatus::Results);

    let result = api.result(code).await.unwrap();
    assert_eq!(result.voted_out_id, Some(p2.player_id));
    let expected = if result.imposter_id == p2.player_id {
        Winner::Artists
    } else {
        Winner::Imposter
    };
    assert_eq!(result.winner, expected);

    let seen = events_until(&mut client, "SHOW_RESULTS").await;
    let count = |kind: &str| seen.iter().filter(|k| *k == kind).count();
    assert_eq!(count("PLAYER_JOINED"), 3);
    assert_eq!(count("GAME_COUNTDOWN"), 1);
    assert_eq!(count("GAME_STARTED"), 1);
    assert_eq!(count("DRAWING_UPLOADED"), 3);
    assert_eq!(count("DISCUSS_STARTED"), 1);
    assert_eq!(count("VOTE_UPDATE"), 3);

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_drawings_written_under_uploads_dir() {
    let server = start_server().await;
    let api = &server.api;
    let room = api.create_room().await.unwrap();
    let code = room.code.as_str();
    let players = join_three(api, code).await;
    let start = api.start_round(code).await.unwrap();

    let view = api
        .submit_drawing(code, &players[0].session_token, Some("sketch.png".into()), b"png".to_vec())
        .await
        .unwrap();

    let relative = format!("{code}/{}/{}_sketch.png", start.game_id.0, players[0].player_id.0);
    assert_eq!(view.url, format!("/uploads/{relative}"));
    let on_disk = std::fs::read(server.uploads.path().join(relative)).unwrap();
    assert_eq!(on_disk, b"png");
    assert_eq!(api.list_drawings(code).await.unwrap(), vec![view]);
}

#[tokio::test]
async fn test_invalid_room_code_is_not_found() {
    let server = start_server().await;
    let err = server.api.join_room("nope!", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = server.api.room_state("ZZZZZZ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_update_avatar_finds_room_from_token() {
    let server = start_server().await;
    let api = &server.api;
    let room = api.create_room().await.unwrap();
    let receipt = api.join_room(room.code.as_str(), Some("Ada".into())).await.unwrap();

    let view = api
        .update_avatar(&receipt.session_token, "fox".into())
        .await
        .unwrap();
    assert_eq!(view.avatar.as_deref(), Some("fox"));

    let err = api.update_avatar("bogus", "fox".into()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn test_host_actions_require_admin_token() {
    let server = start_server().await;
    let api = &server.api;
    let room = api.create_room().await.unwrap();
    let code = room.code.as_str();
    let players = join_three(api, code).await;

    let err = api.reset_room(code, &players[1].session_token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = api
        .kick_player(code, &players[2].session_token, players[0].player_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    api.kick_player(code, &players[0].session_token, players[2].player_id)
        .await
        .unwrap();
    assert_eq!(api.room_state(code).await.unwrap().players.len(), 2);
}

#[tokio::test]
async fn test_round_actions_before_start_fail_precondition() {
    let server = start_server().await;
    let api = &server.api;
    let room = api.create_room().await.unwrap();
    let code = room.code.as_str();
    let players = join_three(api, code).await;

    for err in [
        api.my_prompt(code, &players[0].session_token).await.unwrap_err(),
        api.tally(code).await.unwrap_err(),
        api.finish(code).await.unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }
}
