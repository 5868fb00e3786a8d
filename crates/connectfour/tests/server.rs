//! Integration tests for the server: REST routes, the WebSocket handler,
//! and full games over real sockets.

use std::time::{Duration, Instant};

use connectfour::prelude::*;
use connectfour_engine::{Board, Seat};
use connectfour_protocol::{ErrorPayload, Player, PlayerId};
use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Scripted bot and server setup
// =========================================================================

/// Always plays the leftmost column with room.
struct LeftmostBot;

impl BotStrategy for LeftmostBot {
    fn choose_column(
        &self,
        board: &Board,
        _bot: Seat,
        _opponent: Seat,
        _deadline: Instant,
    ) -> Option<usize> {
        board.legal_columns().first().copied()
    }
}

struct TestServer {
    http: String,
}

fn match_config(fallback: Duration) -> MatchConfig {
    MatchConfig::default()
        .fallback_delay(fallback)
        .bot_move_delay(Duration::from_millis(5))
        .bot_deadline(Duration::from_millis(50))
}

async fn spawn(server: ConnectFourServer<connectfour_protocol::JsonCodec>) {
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    // Give the accept loops a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Starts a server on a random port with millisecond timers. WebSockets
/// go through `/ws` on the same port.
async fn start_server_with(fallback: Duration) -> TestServer {
    let server = ConnectFourServer::builder()
        .http_addr("127.0.0.1:0")
        .match_config(match_config(fallback))
        .bot(LeftmostBot)
        .build()
        .await
        .expect("server should build");
    assert!(server.ws_addr().is_none());

    let addrs = TestServer {
        http: server.http_addr().expect("http addr").to_string(),
    };
    spawn(server).await;
    addrs
}

/// A server whose fallback never fires during a test.
async fn start_server() -> TestServer {
    start_server_with(Duration::from_secs(3600)).await
}

// =========================================================================
// HTTP helpers
// =========================================================================

async fn get(addr: &str, path: &str) -> reqwest::Response {
    reqwest::get(format!("http://{addr}{path}"))
        .await
        .expect("request should complete")
}

async fn post(addr: &str, path: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}{path}"))
        .json(&body)
        .send()
        .await
        .expect("request should complete")
}

async fn create_game(addr: &str, username: &str) -> SessionSnapshot {
    let resp = post(
        addr,
        "/game/create",
        serde_json::json!({ "username": username }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK, "create failed");
    resp.json().await.expect("snapshot body")
}

async fn fetch_game(addr: &str, game: &SessionId) -> SessionSnapshot {
    let resp = get(addr, &format!("/game/{game}")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.expect("snapshot body")
}

async fn fetch_leaderboard(addr: &str) -> Vec<LeaderboardEntry> {
    let resp = get(addr, "/leaderboard").await;
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.expect("leaderboard body")
}

// =========================================================================
// WebSocket helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(addr: &str, query: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws?{query}"))
        .await
        .expect("should connect");
    ws
}

async fn attach(addr: &str, game: &SessionId, username: &str) -> ClientWs {
    connect(addr, &format!("gameId={game}&username={username}")).await
}

async fn send_json(ws: &mut ClientWs, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

async fn send_move(
    ws: &mut ClientWs,
    game: &SessionId,
    player: &PlayerId,
    column: i64,
) {
    send_json(
        ws,
        serde_json::json!({
            "type": "make_move",
            "content": { "gameId": game, "playerId": player, "column": column }
        }),
    )
    .await;
}

/// Next server message, skipping control frames.
async fn next_message(ws: &mut ClientWs) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("message should arrive in time")
            .expect("stream should be open")
            .expect("frame should be valid");
        match frame {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("server message");
            }
            Message::Binary(data) => {
                return serde_json::from_slice(&data).expect("server message");
            }
            Message::Close(_) => panic!("connection closed unexpectedly"),
            _ => continue,
        }
    }
}

async fn next_update(ws: &mut ClientWs) -> SessionSnapshot {
    match next_message(ws).await {
        ServerMessage::GameUpdate(snapshot) => snapshot,
        other => panic!("expected game_update, got {other:?}"),
    }
}

async fn next_error(ws: &mut ClientWs) -> ErrorPayload {
    match next_message(ws).await {
        ServerMessage::Error(payload) => payload,
        other => panic!("expected error, got {other:?}"),
    }
}

async fn next_joined(ws: &mut ClientWs) -> Player {
    match next_message(ws).await {
        ServerMessage::Joined(player) => player,
        other => panic!("expected joined, got {other:?}"),
    }
}

/// Skips updates (and the private `joined` notice) until `pred` holds.
async fn wait_for(
    ws: &mut ClientWs,
    pred: impl Fn(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    loop {
        match next_message(ws).await {
            ServerMessage::GameUpdate(snapshot) if pred(&snapshot) => {
                return snapshot;
            }
            ServerMessage::GameUpdate(_) | ServerMessage::Joined(_) => {}
            other => panic!("expected game_update, got {other:?}"),
        }
    }
}

/// Waits for the server to close the socket.
async fn expect_closed(ws: &mut ClientWs) {
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(result.is_ok(), "server should close the connection");
}

fn discs(snapshot: &SessionSnapshot) -> usize {
    snapshot.board.iter().flatten().filter(|c| **c != 0).count()
}

// =========================================================================
// REST
// =========================================================================

#[tokio::test]
async fn test_health_returns_healthy() {
    let server = start_server().await;

    let resp = get(&server.http, "/health").await;

    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_create_then_get_game() {
    let server = start_server().await;
    let created = create_game(&server.http, "alice").await;

    let fetched = fetch_game(&server.http, &created.id).await;

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.status, GameStatus::Waiting);
    assert_eq!(fetched.board, [[0u8; 7]; 6]);
}

#[tokio::test]
async fn test_create_blank_username_returns_400() {
    let server = start_server().await;

    let resp = post(
        &server.http,
        "/game/create",
        serde_json::json!({ "username": "" }),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorPayload = resp.json().await.unwrap();
    assert_eq!(err.kind, "BadRequest");
}

#[tokio::test]
async fn test_join_over_http_then_again_returns_409() {
    let server = start_server().await;
    let created = create_game(&server.http, "alice").await;
    let join = |name: &str| {
        serde_json::json!({ "gameId": created.id, "username": name })
    };

    let resp = post(&server.http, "/game/join", join("bob")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let joined: SessionSnapshot = resp.json().await.unwrap();
    assert_eq!(joined.status, GameStatus::Playing);

    let resp = post(&server.http, "/game/join", join("carol")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let err: ErrorPayload = resp.json().await.unwrap();
    assert_eq!(err.kind, "SessionFull");
}

#[tokio::test]
async fn test_unknown_game_returns_404() {
    let server = start_server().await;

    let resp = get(&server.http, "/game/game_missing").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = post(
        &server.http,
        "/game/join",
        serde_json::json!({ "gameId": "game_missing", "username": "bob" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_leaderboard_empty_returns_empty_array() {
    let server = start_server().await;

    let resp = get(&server.http, "/leaderboard").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "[]");
}

// =========================================================================
// WebSocket
// =========================================================================

#[tokio::test]
async fn test_ws_route_on_rest_port_receives_current_snapshot() {
    let server = start_server().await;
    let created = create_game(&server.http, "alice").await;

    let mut ws = tokio_tungstenite::connect_async(format!(
        "ws://{}/ws?gameId={}&username=alice",
        server.http, created.id
    ))
    .await
    .expect("/ws should upgrade on the REST port")
    .0;

    let first = next_update(&mut ws).await;
    assert_eq!(first.id, created.id);
    assert_eq!(first.status, GameStatus::Waiting, "creator does not join");
    assert_eq!(first.players.len(), 1);
}

#[tokio::test]
async fn test_dedicated_ws_listener_serves_same_sessions() {
    let server = ConnectFourServer::builder()
        .http_addr("127.0.0.1:0")
        .ws_addr("127.0.0.1:0")
        .match_config(match_config(Duration::from_secs(3600)))
        .bot(LeftmostBot)
        .build()
        .await
        .expect("server should build");
    let http = server.http_addr().unwrap().to_string();
    let ws_addr = server
        .ws_addr()
        .expect("listener configured")
        .unwrap()
        .to_string();
    spawn(server).await;

    let created = create_game(&http, "alice").await;
    let mut alice = attach(&http, &created.id, "alice").await;
    next_update(&mut alice).await;

    let mut bob = attach(&ws_addr, &created.id, "bob").await;
    wait_for(&mut bob, |s| s.status == GameStatus::Playing).await;

    let seen_by_alice = next_update(&mut alice).await;
    assert_eq!(seen_by_alice.players[1].username, "bob");
}

#[tokio::test]
async fn test_ws_new_username_joins_waiting_session() {
    let server = start_server().await;
    let created = create_game(&server.http, "alice").await;
    let mut alice = attach(&server.http, &created.id, "alice").await;
    next_update(&mut alice).await;

    let mut bob = attach(&server.http, &created.id, "bob").await;

    assert_eq!(next_update(&mut bob).await.status, GameStatus::Waiting);
    let me = next_joined(&mut bob).await;
    assert_eq!(me.username, "bob");
    assert!(!me.is_bot);
    let seen_by_bob = next_update(&mut bob).await;
    assert_eq!(seen_by_bob.status, GameStatus::Playing);
    assert_eq!(seen_by_bob.players[1].id, me.id);

    // The joined notice is private; Alice only sees the broadcast.
    let seen_by_alice = next_update(&mut alice).await;
    assert_eq!(seen_by_alice.status, GameStatus::Playing);
    assert_eq!(seen_by_alice.current_player, 0);
}

#[tokio::test]
async fn test_ws_player_id_reconnect_does_not_join() {
    let server = start_server().await;
    let created = create_game(&server.http, "alice").await;
    let alice_id = created.players[0].id.clone();

    // A different display name, but the player id marks a reconnect.
    let mut ws = connect(
        &server.http,
        &format!("gameId={}&username=ally&playerId={alice_id}", created.id),
    )
    .await;
    assert_eq!(next_update(&mut ws).await.status, GameStatus::Waiting);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = fetch_game(&server.http, &created.id).await;
    assert_eq!(snapshot.status, GameStatus::Waiting);
    assert_eq!(snapshot.players.len(), 1);
}

#[tokio::test]
async fn test_ws_join_game_message_seats_player() {
    let server = start_server().await;
    let created = create_game(&server.http, "alice").await;
    let mut ws = connect(&server.http, &format!("gameId={}", created.id)).await;
    next_update(&mut ws).await;

    send_json(
        &mut ws,
        serde_json::json!({
            "type": "join_game",
            "content": { "gameId": created.id, "username": "dave" }
        }),
    )
    .await;

    let me = next_joined(&mut ws).await;
    assert_eq!(me.username, "dave");
    let update = next_update(&mut ws).await;
    assert_eq!(update.status, GameStatus::Playing);
    assert_eq!(update.players[1].id, me.id);
}

#[tokio::test]
async fn test_ws_message_for_other_game_is_rejected() {
    let server = start_server().await;
    let attached = create_game(&server.http, "alice").await;
    let other = create_game(&server.http, "carol").await;
    let mut ws = connect(&server.http, &format!("gameId={}", attached.id)).await;
    next_update(&mut ws).await;

    send_json(
        &mut ws,
        serde_json::json!({
            "type": "join_game",
            "content": { "gameId": other.id, "username": "dave" }
        }),
    )
    .await;
    assert_eq!(next_error(&mut ws).await.kind, "BadRequest");

    send_move(&mut ws, &other.id, &other.players[0].id, 3).await;
    assert_eq!(next_error(&mut ws).await.kind, "BadRequest");

    let untouched = fetch_game(&server.http, &other.id).await;
    assert_eq!(untouched.status, GameStatus::Waiting);
    assert_eq!(untouched.players.len(), 1);
}

#[tokio::test]
async fn test_ws_unknown_game_sends_error_and_closes() {
    let server = start_server().await;

    let mut ws = connect(&server.http, "gameId=game_missing&username=bob").await;

    let err = next_error(&mut ws).await;
    assert_eq!(err.kind, "SessionNotFound");
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_ws_missing_game_id_sends_bad_request() {
    let server = start_server().await;

    let mut ws = connect(&server.http, "username=bob").await;

    let err = next_error(&mut ws).await;
    assert_eq!(err.kind, "BadRequest");
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_ws_malformed_message_returns_bad_request_and_keeps_connection() {
    let server = start_server().await;
    let created = create_game(&server.http, "alice").await;
    let alice_id = created.players[0].id.clone();
    let mut alice = attach(&server.http, &created.id, "alice").await;
    next_update(&mut alice).await;
    let mut bob = attach(&server.http, &created.id, "bob").await;
    wait_for(&mut alice, |s| s.status == GameStatus::Playing).await;

    alice
        .send(Message::Text("not json".into()))
        .await
        .expect("send");
    assert_eq!(next_error(&mut alice).await.kind, "BadRequest");

    send_json(
        &mut alice,
        serde_json::json!({
            "type": "make_move",
            "content": { "gameId": created.id, "playerId": alice_id, "column": "three" }
        }),
    )
    .await;
    assert_eq!(next_error(&mut alice).await.kind, "BadRequest");

    // Still attached: a valid move goes through.
    send_move(&mut alice, &created.id, &alice_id, 3).await;
    let update = next_update(&mut alice).await;
    assert_eq!(update.board[5][3], 1);

    let seen_by_bob = wait_for(&mut bob, |s| discs(s) == 1).await;
    assert_eq!(seen_by_bob.current_player, 1);
}

#[tokio::test]
async fn test_ws_rejected_move_errors_only_to_sender() {
    let server = start_server().await;
    let created = create_game(&server.http, "alice").await;
    let alice_id = created.players[0].id.clone();
    let mut alice = attach(&server.http, &created.id, "alice").await;
    next_update(&mut alice).await;
    let mut bob = attach(&server.http, &created.id, "bob").await;
    let playing = wait_for(&mut bob, |s| s.status == GameStatus::Playing).await;
    let bob_id = playing.players[1].id.clone();
    wait_for(&mut alice, |s| s.status == GameStatus::Playing).await;

    // Bob moves out of turn, then a column that doesn't exist.
    send_move(&mut bob, &created.id, &bob_id, 3).await;
    assert_eq!(next_error(&mut bob).await.kind, "NotYourTurn");

    send_move(&mut alice, &created.id, &alice_id, 7).await;
    assert_eq!(next_error(&mut alice).await.kind, "InvalidColumn");

    // Alice's next message is her accepted move, not Bob's error.
    send_move(&mut alice, &created.id, &alice_id, 0).await;
    let update = next_update(&mut alice).await;
    assert_eq!(discs(&update), 1);
    assert_eq!(update.board[5][0], 1);

    // Bob never saw Alice's InvalidColumn.
    let update = next_update(&mut bob).await;
    assert_eq!(discs(&update), 1);
}

#[tokio::test]
async fn test_ws_disconnect_leaves_session_intact() {
    let server = start_server().await;
    let created = create_game(&server.http, "alice").await;
    let mut bob = attach(&server.http, &created.id, "bob").await;
    let playing = wait_for(&mut bob, |s| s.status == GameStatus::Playing).await;
    let bob_id = playing.players[1].id.clone();

    bob.close(None).await.expect("close");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = fetch_game(&server.http, &created.id).await;
    assert_eq!(snapshot.status, GameStatus::Playing);

    // Reconnecting shows the same game.
    let mut bob = connect(
        &server.http,
        &format!("gameId={}&username=bob&playerId={bob_id}", created.id),
    )
    .await;
    let again = next_update(&mut bob).await;
    assert_eq!(again.players[1].id, bob_id);
}

// =========================================================================
// Full games
// =========================================================================

#[tokio::test]
async fn test_bot_fallback_game_end_to_end() {
    let server = start_server_with(Duration::from_millis(50)).await;
    let created = create_game(&server.http, "alice").await;
    let alice_id = created.players[0].id.clone();
    let mut alice = attach(&server.http, &created.id, "alice").await;

    let seated = wait_for(&mut alice, |s| s.status == GameStatus::Playing).await;
    assert!(seated.players[1].is_bot);
    assert_eq!(seated.players[1].username, "CompetitiveBot");

    let mut finished = None;
    for turn in 1..=4 {
        send_move(&mut alice, &created.id, &alice_id, 3).await;
        let after = wait_for(&mut alice, |s| discs(s) == 2 * turn - 1).await;
        if after.status == GameStatus::Finished {
            finished = Some(after);
            break;
        }
        wait_for(&mut alice, |s| discs(s) == 2 * turn && s.current_player == 0)
            .await;
    }

    let finished = finished.expect("alice should win on her fourth drop");
    assert_eq!(finished.winner, Some(0));
    for row in 2..6 {
        assert_eq!(finished.board[row][3], 1);
    }

    // A move after the end is rejected.
    send_move(&mut alice, &created.id, &alice_id, 4).await;
    assert_eq!(next_error(&mut alice).await.kind, "GameNotInProgress");

    let board = fetch_leaderboard(&server.http).await;
    assert_eq!(board.len(), 1, "the bot is never recorded");
    assert_eq!(board[0].username, "alice");
    assert_eq!((board[0].wins, board[0].losses, board[0].draws), (1, 0, 0));
}

#[tokio::test]
async fn test_two_human_game_updates_leaderboard() {
    let server = start_server().await;
    let created = create_game(&server.http, "alice").await;
    let alice_id = created.players[0].id.clone();
    let mut alice = attach(&server.http, &created.id, "alice").await;
    next_update(&mut alice).await;
    let mut bob = attach(&server.http, &created.id, "bob").await;
    next_update(&mut bob).await;
    let bob_id = next_joined(&mut bob).await.id;

    // Alice builds a row along the bottom; Bob stacks column 6.
    for column in 0..3 {
        send_move(&mut alice, &created.id, &alice_id, column).await;
        wait_for(&mut bob, |s| s.current_player == 1).await;
        send_move(&mut bob, &created.id, &bob_id, 6).await;
        wait_for(&mut bob, |s| s.current_player == 0).await;
    }
    send_move(&mut alice, &created.id, &alice_id, 3).await;

    let done = wait_for(&mut bob, |s| s.status == GameStatus::Finished).await;
    assert_eq!(done.winner, Some(0));

    let board = fetch_leaderboard(&server.http).await;
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].username, "alice");
    assert_eq!(board[0].wins, 1);
    assert_eq!(board[1].username, "bob");
    assert_eq!(board[1].losses, 1);
}
