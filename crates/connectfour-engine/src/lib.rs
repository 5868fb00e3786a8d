//! Game rules for Connect Four.
//!
//! This crate is pure logic: no async, no I/O, no shared state. Everything
//! above it (sessions, the match registry, the network adapter) calls into
//! these functions and decides what to do with the result.
//!
//! - [`Board`] — the 6×7 grid, gravity drops, and terminal detection.
//! - [`BotStrategy`] / [`HeuristicBot`] — how the fallback bot picks a
//!   column under a deadline.

mod board;
mod bot;

pub use board::{
    Board, BoardError, Cell, Direction, Seat, Terminal, COLUMNS, CONNECT,
    ROWS,
};
pub use bot::{BotStrategy, HeuristicBot, DEFAULT_MAX_DEPTH};
