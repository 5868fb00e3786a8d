use connectfour_protocol::{PlayerId, SessionId};
use rand::Rng;

/// A fresh session id: `game_` followed by 16 hex characters.
///
/// 64 random bits; the registry still checks for collisions before use.
pub fn generate_session_id() -> SessionId {
    SessionId(format!("game_{}", random_hex()))
}

/// A fresh opaque id for a human player.
pub fn generate_player_id() -> PlayerId {
    PlayerId(random_hex())
}

fn random_hex() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
