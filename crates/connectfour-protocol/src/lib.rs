//! Wire protocol for the Connect Four server.
//!
//! This crate defines the "language" the browser client and the server
//! speak:
//!
//! - **Types** ([`SessionSnapshot`], [`ClientMessage`], [`ServerMessage`],
//!   etc.) — the structures that travel on the wire, both over the
//!   WebSocket channel and in REST bodies.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the game
//! layers. It knows nothing about rules or sessions; it only knows the
//! shape of the data.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Match registry
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, CreateGameRequest, ErrorPayload, GameStatus,
    JoinRequest, LeaderboardEntry, MoveRequest, Player, PlayerId,
    ServerMessage, SessionId, SessionSnapshot, WireBoard, WIRE_COLUMNS,
    WIRE_ROWS,
};
