//! Registry timing and sizing.

use std::time::Duration;

/// Settings shared by every session the registry runs.
///
/// Start from `MatchConfig::default()` and override what you need:
///
/// ```rust
/// use std::time::Duration;
/// use connectfour_match::MatchConfig;
///
/// let config = MatchConfig::default()
///     .fallback_delay(Duration::from_secs(5))
///     .bot_move_delay(Duration::ZERO);
/// assert_eq!(config.fallback_delay, Duration::from_secs(5));
/// assert_eq!(config.bot_deadline, Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// How long a session waits for a human opponent before the bot is
    /// seated.
    pub fallback_delay: Duration,

    /// Pause before the bot starts thinking, so its move doesn't land in
    /// the same frame as the human's.
    pub bot_move_delay: Duration,

    /// Time budget for one bot search.
    pub bot_deadline: Duration,

    /// How many times a rejected bot move is re-planned before giving up.
    pub bot_retry_limit: u32,

    /// Capacity of each session actor's command channel.
    pub channel_size: usize,

    /// Sessions created longer ago than this are removed by the sweeper.
    pub session_ttl: Duration,

    /// How often the sweeper runs.
    pub sweep_interval: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fallback_delay: Duration::from_secs(10),
            bot_move_delay: Duration::from_secs(1),
            bot_deadline: Duration::from_millis(200),
            bot_retry_limit: 3,
            channel_size: 64,
            session_ttl: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl MatchConfig {
    /// Sets the matchmaking window.
    pub fn fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    pub fn bot_move_delay(mut self, delay: Duration) -> Self {
        self.bot_move_delay = delay;
        self
    }

    pub fn bot_deadline(mut self, deadline: Duration) -> Self {
        self.bot_deadline = deadline;
        self
    }

    pub fn bot_retry_limit(mut self, limit: u32) -> Self {
        self.bot_retry_limit = limit;
        self
    }

    /// Sets the command channel capacity. Zero is bumped to one, which is
    /// the smallest size `tokio::sync::mpsc` accepts.
    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size.max(1);
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
