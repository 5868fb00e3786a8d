//! Error types for the session layer.

use connectfour_engine::BoardError;
use connectfour_protocol::{GameStatus, PlayerId, SessionId};

/// Why a game request was rejected.
///
/// Every variant is safe to show to the client that made the request:
/// rejection never changes session state. [`GameError::kind`] is the
/// stable name sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The column is outside `0..7`.
    #[error("column {0} is out of range")]
    InvalidColumn(i64),

    /// The column has no room left.
    #[error("column {0} is full")]
    ColumnFull(usize),

    /// The mover is not the player whose turn it is (or not in the game).
    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    /// The session already has two players.
    #[error("session {0} is full")]
    SessionFull(SessionId),

    /// No session with this id exists.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// Moves are only accepted while the session is playing.
    #[error("session {id} is {status}, not playing")]
    GameNotInProgress { id: SessionId, status: GameStatus },
}

impl GameError {
    /// Stable machine-readable name, e.g. `"NotYourTurn"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidColumn(_) => "InvalidColumn",
            Self::ColumnFull(_) => "ColumnFull",
            Self::NotYourTurn(_) => "NotYourTurn",
            Self::SessionFull(_) => "SessionFull",
            Self::SessionNotFound(_) => "SessionNotFound",
            Self::GameNotInProgress { .. } => "GameNotInProgress",
        }
    }
}

impl From<BoardError> for GameError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::InvalidColumn(column) => Self::InvalidColumn(column),
            BoardError::ColumnFull(column) => Self::ColumnFull(column),
        }
    }
}
