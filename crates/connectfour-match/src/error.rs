//! Error types for the match layer.

use connectfour_protocol::SessionId;
use connectfour_session::GameError;

/// Errors returned by [`MatchRegistry`](crate::MatchRegistry) operations.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// The game rejected the request.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The session's actor has stopped (swept or shut down) between the
    /// lookup and the request.
    #[error("session {0} is unavailable")]
    Unavailable(SessionId),
}

impl MatchError {
    /// Stable machine-readable name for the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Game(err) => err.kind(),
            Self::Unavailable(_) => "Unavailable",
        }
    }
}
