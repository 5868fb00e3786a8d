//! REST routes: create, join, inspect, leaderboard, health, and the
//! `/ws` upgrade the browser client attaches through.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use connectfour_match::MatchError;
use connectfour_protocol::{
    Codec, CreateGameRequest, ErrorPayload, JoinRequest, LeaderboardEntry,
    SessionId, SessionSnapshot,
};
use connectfour_session::GameError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler::handle_connection;
use crate::server::ServerState;
use crate::upgrade::UpgradedConnection;

/// Most rows `GET /leaderboard` returns.
pub const LEADERBOARD_LIMIT: usize = 100;

/// Builds the router over the shared server state.
pub(crate) fn router<C: Codec>(state: Arc<ServerState<C>>) -> Router {
    Router::new()
        .route("/game/create", post(create_game::<C>))
        .route("/game/join", post(join_game::<C>))
        .route("/game/{id}", get(get_game::<C>))
        .route("/leaderboard", get(leaderboard::<C>))
        .route("/health", get(health))
        .route("/ws", get(ws_upgrade::<C>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A failed request: status code plus the same `{kind, message}` body the
/// WebSocket channel uses.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    payload: ErrorPayload,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            payload: ErrorPayload {
                kind: "BadRequest".into(),
                message: message.into(),
            },
        }
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        let status = match &err {
            MatchError::Game(GameError::SessionNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            MatchError::Game(
                GameError::SessionFull(_)
                | GameError::GameNotInProgress { .. }
                | GameError::NotYourTurn(_),
            ) => StatusCode::CONFLICT,
            MatchError::Game(
                GameError::InvalidColumn(_) | GameError::ColumnFull(_),
            ) => StatusCode::BAD_REQUEST,
            MatchError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            payload: ErrorPayload {
                kind: err.kind().into(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(
            status = %self.status,
            kind = %self.payload.kind,
            message = %self.payload.message,
            "request failed"
        );
        (self.status, Json(self.payload)).into_response()
    }
}

async fn create_game<C: Codec>(
    State(state): State<Arc<ServerState<C>>>,
    Json(req): Json<CreateGameRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }
    Ok(Json(state.registry.create(username).await))
}

async fn join_game<C: Codec>(
    State(state): State<Arc<ServerState<C>>>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }
    Ok(Json(state.registry.join(&req.game_id, username).await?))
}

async fn get_game<C: Codec>(
    State(state): State<Arc<ServerState<C>>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.registry.snapshot(&SessionId(id)).await?))
}

async fn leaderboard<C: Codec>(
    State(state): State<Arc<ServerState<C>>>,
) -> Json<Vec<LeaderboardEntry>> {
    Json(rank(state.registry.leaderboard()))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// `GET /ws?gameId=..`: upgrades and hands the socket to the connection
/// handler. Query errors are reported over the socket, not as HTTP status.
async fn ws_upgrade<C: Codec>(
    ws: WebSocketUpgrade,
    uri: Uri,
    State(state): State<Arc<ServerState<C>>>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let conn = UpgradedConnection::new(socket, uri.to_string());
        if let Err(e) = handle_connection(conn, state).await {
            tracing::debug!(error = %e, "connection ended with error");
        }
    })
}

/// Orders entries for display: most wins first, then most draws, then
/// fewest losses. Ties fall back to the username so the order is stable.
fn rank(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then(b.draws.cmp(&a.draws))
            .then(a.losses.cmp(&b.losses))
            .then_with(|| a.username.cmp(&b.username))
    });
    entries.truncate(LEADERBOARD_LIMIT);
    entries
}
