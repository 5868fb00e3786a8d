//! Server configuration: listen addresses plus the match timers.

use std::time::Duration;

use connectfour_match::MatchConfig;

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Everything the binary needs to start a server.
///
/// [`ServerConfig::from_env`] reads:
///
/// | Variable | Default |
/// |---|---|
/// | `CONNECTFOUR_HTTP_ADDR` | `0.0.0.0:$PORT`, else `0.0.0.0:8080` |
/// | `CONNECTFOUR_WS_ADDR` | unset: WebSocket only on `/ws` of the REST port |
/// | `CONNECTFOUR_FALLBACK_SECS` | `10` |
/// | `CONNECTFOUR_BOT_DEADLINE_MS` | `200` |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: String,
    /// Optional extra WebSocket listener. `/ws` on `http_addr` is always
    /// served.
    pub ws_addr: Option<String>,
    pub matches: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            ws_addr: None,
            matches: MatchConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Builds a config from the process environment. Unset or unparsable
    /// values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("CONNECTFOUR_HTTP_ADDR") {
            config.http_addr = addr;
        } else if let Some(port) =
            lookup("PORT").and_then(|p| p.parse::<u16>().ok())
        {
            config.http_addr = format!("0.0.0.0:{port}");
        }

        config.ws_addr = lookup("CONNECTFOUR_WS_ADDR");

        if let Some(secs) = lookup("CONNECTFOUR_FALLBACK_SECS")
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.matches =
                config.matches.fallback_delay(Duration::from_secs(secs));
        }

        if let Some(ms) = lookup("CONNECTFOUR_BOT_DEADLINE_MS")
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.matches =
                config.matches.bot_deadline(Duration::from_millis(ms));
        }

        config
    }
}
