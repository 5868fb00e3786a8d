//! Match registry for the Connect Four server.
//!
//! Each session runs as an isolated Tokio task (actor model) that owns its
//! [`Session`](connectfour_session::Session) and the set of live
//! connections watching it.
//!
//! # Key types
//!
//! - [`MatchRegistry`] — creates sessions, routes requests, arms the
//!   fallback timer, sweeps stale sessions
//! - [`SessionHandle`] — send commands to a running session actor
//! - [`MatchConfig`] — timers and channel sizes
//! - [`SubscriberSender`] — where a connection receives its updates

mod actor;
mod config;
mod error;
mod registry;

pub use actor::{SessionHandle, SubscriberId, SubscriberSender};
pub use config::MatchConfig;
pub use error::MatchError;
pub use registry::MatchRegistry;
