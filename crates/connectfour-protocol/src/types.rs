//! Core protocol types for the wire format.
//!
//! Everything in this module is serialized with camelCase field names
//! because that is what the browser client reads (`gameId`, `isBot`,
//! `currentPlayer`, ...).

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a player.
///
/// Serialized as a plain string (`#[serde(transparent)]`), so
/// `PlayerId("a1b2".into())` is just `"a1b2"` in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Opaque identifier for a session (one Connect Four match).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Session snapshot
// ---------------------------------------------------------------------------

/// Number of rows in the wire board.
pub const WIRE_ROWS: usize = 6;
/// Number of columns in the wire board.
pub const WIRE_COLUMNS: usize = 7;

/// The board as the client sees it: `board[row][column]`, row 0 on top.
/// `0` = empty, `1` = player 0's disc, `2` = player 1's disc.
pub type WireBoard = [[u8; WIRE_COLUMNS]; WIRE_ROWS];

/// A participant as the client sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub is_bot: bool,
}

/// Lifecycle status of a session, `"waiting" | "playing" | "finished"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Playing => f.write_str("playing"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

/// Full state of one session. Sent as the REST response on create/join and
/// as the `content` of every `game_update`.
///
/// `winner` is `0`/`1` for a decisive result and `-1` for a draw. It is
/// omitted entirely while the game is not finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub board: WireBoard,
    /// One entry while waiting, two once the game is playing.
    pub players: Vec<Player>,
    pub current_player: u8,
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<i8>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move_at: Option<u64>,
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// Cumulative results for one username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `POST /game/create` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameRequest {
    pub username: String,
}

/// Body of a `make_move` message.
///
/// `column` is signed on purpose: a negative column is a well-formed
/// message that the game rejects as `InvalidColumn`, not a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub game_id: SessionId,
    pub player_id: PlayerId,
    pub column: i64,
}

/// Body of a `join_game` message and of `POST /game/join`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub game_id: SessionId,
    pub username: String,
}

// ---------------------------------------------------------------------------
// WebSocket messages
// ---------------------------------------------------------------------------

/// Client → server messages on the real-time channel.
///
/// Adjacently tagged: `{ "type": "make_move", "content": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ClientMessage {
    MakeMove(MoveRequest),
    JoinGame(JoinRequest),
}

/// Details of a rejected request, sent only to the connection that made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Stable machine-readable kind, e.g. `"NotYourTurn"`.
    pub kind: String,
    pub message: String,
}

/// Server → client messages on the real-time channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full session state after an accepted change (or on subscribe).
    GameUpdate(SessionSnapshot),
    /// This connection's user was just seated; carries the player id it
    /// must send with its moves. Sent only to the joining connection.
    Joined(Player),
    /// A request from this connection was rejected.
    Error(ErrorPayload),
}

impl ServerMessage {
    /// Shorthand for building an [`ServerMessage::Error`].
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            kind: kind.into(),
            message: message.into(),
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
