//! Unified error type for the Connect Four server.

use connectfour_match::MatchError;
use connectfour_protocol::ProtocolError;
use connectfour_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ConnectFourError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad query string).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The match registry could not serve the request.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// Binding or serving the HTTP listener failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
