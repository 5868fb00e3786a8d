//! Session lifecycle and results for the Connect Four server.
//!
//! This crate owns the rules of a single match and the scores that outlive
//! it:
//!
//! 1. **Session** — one game's state machine ([`Session`]):
//!    `waiting → playing → finished`, move validation, turn order.
//! 2. **Leaderboard** — cumulative per-username results
//!    ([`LeaderboardStore`] trait, [`InMemoryLeaderboard`]).
//! 3. **Identity** — random session and player ids.
//!
//! # How it fits in the stack
//!
//! ```text
//! Match Registry (above)  ← owns many sessions, one actor each
//!     ↕
//! Session Layer (this crate)  ← rules of one match, result recording
//!     ↕
//! Engine (below)  ← board, drops, terminal detection
//! ```
//!
//! Nothing here is async. A [`Session`] is mutated by exactly one owner at
//! a time; the registry guarantees that by putting each one in its own
//! task.

mod error;
mod id;
mod leaderboard;
mod session;

pub use error::GameError;
pub use id::{generate_player_id, generate_session_id};
pub use leaderboard::{InMemoryLeaderboard, LeaderboardStore, Outcome};
pub use session::{now_millis, MoveApplied, Session, BOT_USERNAME};
