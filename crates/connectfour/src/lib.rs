//! # Connect Four
//!
//! Real-time Connect Four match server.
//!
//! Players create a session over REST, attach to it over WebSocket at
//! `/ws` on the same port, and receive the full game state after every
//! accepted change. If nobody joins within the matchmaking window, a bot
//! takes the second seat.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use connectfour::prelude::*;
//!
//! # async fn run() -> Result<(), ConnectFourError> {
//! let server = ConnectFourServer::builder()
//!     .config(ServerConfig::from_env())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod http;
mod server;
mod upgrade;

pub use config::ServerConfig;
pub use error::ConnectFourError;
pub use server::{ConnectFourServer, ConnectFourServerBuilder};

/// Re-exports for the common case.
pub mod prelude {
    pub use crate::{
        ConnectFourError, ConnectFourServer, ConnectFourServerBuilder,
        ServerConfig,
    };
    pub use connectfour_engine::{BotStrategy, HeuristicBot};
    pub use connectfour_match::{MatchConfig, MatchRegistry};
    pub use connectfour_protocol::{
        ClientMessage, GameStatus, LeaderboardEntry, ServerMessage,
        SessionId, SessionSnapshot,
    };
    pub use connectfour_session::{InMemoryLeaderboard, LeaderboardStore};
}
