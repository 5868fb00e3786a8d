//! Per-connection handler: subscription, auto-join, and message routing.
//!
//! Each WebSocket, whether upgraded on the REST port or accepted by the
//! dedicated listener, gets its own Tokio task running this handler.
//! The flow is:
//!   1. Read `gameId` (and optionally `username`/`playerId`) from the URL
//!   2. Subscribe to the session → the current snapshot goes out first
//!   3. Seat `username` as the second player if the session is waiting
//!   4. Loop: forward session updates out, route client messages in

use std::sync::Arc;

use axum::extract::Query;
use axum::http::Uri;
use connectfour_match::{MatchError, MatchRegistry, SubscriberId};
use connectfour_protocol::{
    ClientMessage, Codec, GameStatus, PlayerId, ProtocolError, ServerMessage,
    SessionId,
};
use connectfour_transport::{Connection, TransportError};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::ConnectFourError;

/// Query string of `ws://host/ws?gameId=<id>&username=<name>`.
///
/// `playerId` marks a reconnect by an already seated player and
/// suppresses the auto-join.
#[derive(Debug, Deserialize)]
struct ConnectParams {
    #[serde(rename = "gameId")]
    game_id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "playerId")]
    player_id: Option<String>,
}

fn parse_params(target: &str) -> Result<ConnectParams, ProtocolError> {
    let uri: Uri = target
        .parse()
        .map_err(|e| ProtocolError::InvalidMessage(format!("bad URL: {e}")))?;
    let Query(params) = Query::<ConnectParams>::try_from_uri(&uri)
        .map_err(|e| ProtocolError::InvalidMessage(e.body_text()))?;
    if params.game_id.trim().is_empty() {
        return Err(ProtocolError::InvalidMessage("gameId is empty".into()));
    }
    Ok(params)
}

/// Drop guard that detaches the connection from its session when the
/// handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async call.
struct SubscriptionGuard {
    session_id: SessionId,
    subscriber: SubscriberId,
    registry: Arc<MatchRegistry>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let session_id = self.session_id.clone();
        let subscriber = self.subscriber;
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            registry.unsubscribe(&session_id, subscriber).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<Conn, C>(
    conn: Conn,
    state: Arc<ServerState<C>>,
) -> Result<(), ConnectFourError>
where
    Conn: Connection<Error = TransportError>,
    C: Codec,
{
    let conn_id = conn.id();

    let params = match parse_params(conn.request_target()) {
        Ok(params) => params,
        Err(e) => {
            send_error(&conn, &state.codec, "BadRequest", &e.to_string())
                .await?;
            let _ = conn.close().await;
            return Err(e.into());
        }
    };
    let session_id = SessionId(params.game_id);
    let subscriber = SubscriberId::new(conn_id.into_inner());

    // Subscribe and guard together: if subscribing fails there is nothing
    // to clean up.
    let (tx, mut updates) = mpsc::unbounded_channel();
    if let Err(e) = state.registry.subscribe(&session_id, subscriber, tx).await
    {
        send_error(&conn, &state.codec, e.kind(), &e.to_string()).await?;
        let _ = conn.close().await;
        return Err(e.into());
    }
    let _guard = SubscriptionGuard {
        session_id: session_id.clone(),
        subscriber,
        registry: Arc::clone(&state.registry),
    };
    tracing::info!(%conn_id, %session_id, "connection attached to session");

    // The actor queues the current snapshot on subscribe; it goes out
    // before a `joined` notice can.
    match updates.recv().await {
        Some(snapshot) => send_message(&conn, &state.codec, &snapshot).await?,
        None => {
            let _ = conn.close().await;
            return Ok(());
        }
    }

    if params.player_id.is_none() {
        if let Some(username) = params.username {
            let joined = auto_join(&conn, &state, &session_id, &username).await;
            report_rejection(&conn, &state.codec, joined).await?;
        }
    }

    loop {
        tokio::select! {
            incoming = conn.recv() => match incoming {
                Ok(Some(data)) => {
                    handle_client_message(&conn, &state, &session_id, &data)
                        .await?;
                }
                Ok(None) => {
                    tracing::info!(%conn_id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
            },
            outgoing = updates.recv() => match outgoing {
                Some(msg) => send_message(&conn, &state.codec, &msg).await?,
                None => {
                    // The session was swept; its actor is gone.
                    tracing::info!(%conn_id, %session_id, "session closed");
                    let _ = conn.close().await;
                    break;
                }
            },
        }
    }

    // _guard drops here → unsubscribe fires.
    Ok(())
}

/// Seats `username` in a waiting session unless it's the creator
/// reconnecting under the same name.
async fn auto_join<Conn, C>(
    conn: &Conn,
    state: &ServerState<C>,
    session_id: &SessionId,
    username: &str,
) -> Result<(), ConnectFourError>
where
    Conn: Connection<Error = TransportError>,
    C: Codec,
{
    if username.trim().is_empty() {
        return Ok(());
    }
    let snapshot = state.registry.snapshot(session_id).await?;
    let is_creator = snapshot
        .players
        .first()
        .is_some_and(|creator| creator.username == username);
    if snapshot.status != GameStatus::Waiting || is_creator {
        return Ok(());
    }
    join(conn, state, session_id, username).await
}

/// Seats `username` and tells this connection which player it is.
async fn join<Conn, C>(
    conn: &Conn,
    state: &ServerState<C>,
    session_id: &SessionId,
    username: &str,
) -> Result<(), ConnectFourError>
where
    Conn: Connection<Error = TransportError>,
    C: Codec,
{
    let snapshot = state.registry.join(session_id, username).await?;
    tracing::info!(%session_id, username, "joined via WebSocket");
    if let Some(joiner) = snapshot.players.get(1) {
        send_message(conn, &state.codec, &ServerMessage::Joined(joiner.clone()))
            .await?;
    }
    Ok(())
}

/// Decodes one client message and routes it to the registry. Rejections
/// go back to this connection only; accepted changes reach everyone via
/// the session broadcast.
async fn handle_client_message<Conn, C>(
    conn: &Conn,
    state: &ServerState<C>,
    session_id: &SessionId,
    data: &[u8],
) -> Result<(), ConnectFourError>
where
    Conn: Connection<Error = TransportError>,
    C: Codec,
{
    let msg: ClientMessage = match state.codec.decode(data) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(conn_id = %conn.id(), error = %e, "bad client message");
            return send_error(conn, &state.codec, "BadRequest", &e.to_string())
                .await;
        }
    };

    let target = match &msg {
        ClientMessage::MakeMove(req) => &req.game_id,
        ClientMessage::JoinGame(req) => &req.game_id,
    };
    if target != session_id {
        let message =
            format!("this connection is attached to {session_id}, not {target}");
        return send_error(conn, &state.codec, "BadRequest", &message).await;
    }

    let result = match msg {
        ClientMessage::MakeMove(req) => {
            make_move(&state.registry, session_id, req.player_id, req.column)
                .await
        }
        ClientMessage::JoinGame(req) => {
            join(conn, state, session_id, &req.username).await
        }
    };

    report_rejection(conn, &state.codec, result).await
}

/// Turns a registry rejection into an `error` message for this connection.
/// Anything else (a dead socket, an encode failure) is passed up.
async fn report_rejection<Conn: Connection<Error = TransportError>>(
    conn: &Conn,
    codec: &impl Codec,
    result: Result<(), ConnectFourError>,
) -> Result<(), ConnectFourError> {
    match result {
        Err(ConnectFourError::Match(e)) => {
            send_error(conn, codec, e.kind(), &e.to_string()).await
        }
        other => other,
    }
}

async fn make_move(
    registry: &MatchRegistry,
    session_id: &SessionId,
    player_id: PlayerId,
    column: i64,
) -> Result<(), ConnectFourError> {
    registry
        .make_move(session_id, player_id, column)
        .await
        .map_err(|e: MatchError| e.into())
        .map(|_| ())
}

async fn send_message<Conn: Connection<Error = TransportError>>(
    conn: &Conn,
    codec: &impl Codec,
    msg: &ServerMessage,
) -> Result<(), ConnectFourError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends an `error` message to this connection.
async fn send_error<Conn: Connection<Error = TransportError>>(
    conn: &Conn,
    codec: &impl Codec,
    kind: &str,
    message: &str,
) -> Result<(), ConnectFourError> {
    send_message(conn, codec, &ServerMessage::error(kind, message)).await
}
