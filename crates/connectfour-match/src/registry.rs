//! Match registry: creates sessions, routes requests to them, and runs
//! the timers around them.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use connectfour_engine::BotStrategy;
use connectfour_protocol::{
    LeaderboardEntry, Player, PlayerId, SessionId, SessionSnapshot,
};
use connectfour_session::{
    generate_player_id, generate_session_id, GameError, LeaderboardStore,
    Session,
};
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;

use crate::actor::spawn_session;
use crate::{
    MatchConfig, MatchError, SessionHandle, SubscriberId, SubscriberSender,
};

struct SessionEntry {
    handle: SessionHandle,
    /// Armed on create, aborted by a successful join.
    fallback: Option<AbortHandle>,
    created: Instant,
}

/// Owns every live session.
///
/// The map lock is held only long enough to look up (and clone) a
/// [`SessionHandle`]; all game work happens inside the session's own actor.
/// All methods take `&self`, so the registry is shared as an
/// `Arc<MatchRegistry>`.
pub struct MatchRegistry {
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
    config: MatchConfig,
    bot: Arc<dyn BotStrategy>,
    leaderboard: Arc<dyn LeaderboardStore>,
}

impl MatchRegistry {
    pub fn new(
        config: MatchConfig,
        bot: Arc<dyn BotStrategy>,
        leaderboard: Arc<dyn LeaderboardStore>,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
            bot,
            leaderboard,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Creates a waiting session with `username` in seat 0 and arms its
    /// fallback timer.
    ///
    /// The returned snapshot carries the creator's player id, which the
    /// client needs for its moves.
    pub async fn create(&self, username: &str) -> SessionSnapshot {
        let creator = Player {
            id: generate_player_id(),
            username: username.to_owned(),
            is_bot: false,
        };

        let mut sessions = self.sessions.lock().await;
        let mut id = generate_session_id();
        while sessions.contains_key(&id) {
            id = generate_session_id();
        }

        let session =
            Session::new(id.clone(), creator, Arc::clone(&self.leaderboard));
        let snapshot = session.snapshot();
        let handle = spawn_session(
            session,
            Arc::clone(&self.bot),
            self.config.clone(),
        );
        let fallback = self.arm_fallback(handle.clone());

        sessions.insert(
            id,
            SessionEntry {
                handle,
                fallback: Some(fallback),
                created: Instant::now(),
            },
        );
        snapshot
    }

    fn arm_fallback(&self, handle: SessionHandle) -> AbortHandle {
        let delay = self.config.fallback_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!(
                session_id = %handle.id(),
                "no opponent within the matchmaking window"
            );
            let _ = handle.fallback_timeout().await;
        })
        .abort_handle()
    }

    /// Looks up the handle for `id`.
    ///
    /// # Errors
    /// [`GameError::SessionNotFound`] if there is no such session.
    pub async fn handle(
        &self,
        id: &SessionId,
    ) -> Result<SessionHandle, MatchError> {
        self.sessions
            .lock()
            .await
            .get(id)
            .map(|entry| entry.handle.clone())
            .ok_or_else(|| GameError::SessionNotFound(id.clone()).into())
    }

    /// Seats `username` as the second player and cancels the fallback
    /// timer.
    pub async fn join(
        &self,
        id: &SessionId,
        username: &str,
    ) -> Result<SessionSnapshot, MatchError> {
        let handle = self.handle(id).await?;
        let joiner = Player {
            id: generate_player_id(),
            username: username.to_owned(),
            is_bot: false,
        };

        let snapshot = handle.join(joiner).await?;

        if let Some(entry) = self.sessions.lock().await.get_mut(id) {
            if let Some(timer) = entry.fallback.take() {
                timer.abort();
            }
        }
        Ok(snapshot)
    }

    /// Routes a move to the session.
    pub async fn make_move(
        &self,
        id: &SessionId,
        player_id: PlayerId,
        column: i64,
    ) -> Result<SessionSnapshot, MatchError> {
        self.handle(id).await?.make_move(player_id, column).await
    }

    /// Attaches a live connection to a session's broadcasts. The current
    /// snapshot is delivered first.
    pub async fn subscribe(
        &self,
        id: &SessionId,
        subscriber: SubscriberId,
        sender: SubscriberSender,
    ) -> Result<(), MatchError> {
        self.handle(id).await?.subscribe(subscriber, sender).await
    }

    /// Detaches a connection. Unknown sessions are ignored: a swept
    /// session has no subscribers left to remove.
    pub async fn unsubscribe(&self, id: &SessionId, subscriber: SubscriberId) {
        if let Ok(handle) = self.handle(id).await {
            let _ = handle.unsubscribe(subscriber).await;
        }
    }

    /// Current state of a session.
    pub async fn snapshot(
        &self,
        id: &SessionId,
    ) -> Result<SessionSnapshot, MatchError> {
        self.handle(id).await?.snapshot().await
    }

    /// Stops and forgets a session. Returns `false` if it wasn't there.
    pub async fn remove(&self, id: &SessionId) -> bool {
        let entry = self.sessions.lock().await.remove(id);
        match entry {
            Some(entry) => {
                shutdown(entry).await;
                tracing::info!(session_id = %id, "session removed");
                true
            }
            None => false,
        }
    }

    /// Removes every session created longer ago than the configured
    /// time-to-live, however recently it was played. Returns the ids that
    /// were removed.
    pub async fn sweep_stale(&self) -> Vec<SessionId> {
        let ttl = self.config.session_ttl;
        let stale: Vec<(SessionId, SessionEntry)> = {
            let mut sessions = self.sessions.lock().await;
            let ids: Vec<SessionId> = sessions
                .iter()
                .filter(|(_, entry)| entry.created.elapsed() > ttl)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|e| (id, e)))
                .collect()
        };

        let mut removed = Vec::with_capacity(stale.len());
        for (id, entry) in stale {
            shutdown(entry).await;
            tracing::info!(session_id = %id, "stale session swept");
            removed.push(id);
        }
        removed
    }

    /// Starts the background sweeper.
    ///
    /// The task holds only a weak reference and exits once the registry
    /// is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = weak.upgrade() else {
                    break;
                };
                let removed = registry.sweep_stale().await;
                if !removed.is_empty() {
                    tracing::info!(count = removed.len(), "sweep finished");
                }
            }
        })
    }

    /// Every leaderboard entry, unordered.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.leaderboard.query()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// `true` if there are no live sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

async fn shutdown(entry: SessionEntry) {
    if let Some(timer) = entry.fallback {
        timer.abort();
    }
    let _ = entry.handle.shutdown().await;
}
