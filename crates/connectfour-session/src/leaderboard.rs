//! Cumulative win/loss/draw counts per username.
//!
//! The store is process-wide and shared by every session, so it sits
//! behind a trait: the in-memory version here is what the server runs
//! with, and a durable backend only has to implement [`LeaderboardStore`].

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use connectfour_protocol::LeaderboardEntry;

/// The result of one finished game from one player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

/// Where finished games are tallied.
///
/// Only humans are ever recorded; filtering bots out is the session's job.
pub trait LeaderboardStore: Send + Sync + 'static {
    /// Adds one result for `username`, creating the entry on first use.
    fn record(&self, username: &str, outcome: Outcome);

    /// Every entry, in no particular order.
    fn query(&self) -> Vec<LeaderboardEntry>;

    /// The entry for one username, if it has finished a game.
    fn entry(&self, username: &str) -> Option<LeaderboardEntry>;
}

/// A [`LeaderboardStore`] that lives in process memory.
///
/// A `std::sync::Mutex` is enough: every operation is a short map update
/// with no `.await` inside.
#[derive(Debug, Default)]
pub struct InMemoryLeaderboard {
    entries: Mutex<HashMap<String, LeaderboardEntry>>,
}

impl InMemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeaderboardStore for InMemoryLeaderboard {
    fn record(&self, username: &str, outcome: Outcome) {
        let mut entries =
            self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(username.to_owned()).or_insert_with(|| {
            LeaderboardEntry {
                username: username.to_owned(),
                wins: 0,
                losses: 0,
                draws: 0,
            }
        });
        match outcome {
            Outcome::Win => entry.wins += 1,
            Outcome::Loss => entry.losses += 1,
            Outcome::Draw => entry.draws += 1,
        }
        tracing::debug!(username, ?outcome, "leaderboard updated");
    }

    fn query(&self) -> Vec<LeaderboardEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    fn entry(&self, username: &str) -> Option<LeaderboardEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
            .cloned()
    }
}
