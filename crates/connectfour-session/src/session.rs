//! One Connect Four match: who is playing, whose turn it is, and how it
//! ended.
//!
//! A session is a small state machine:
//!
//! ```text
//!   Waiting ──(join / seat_bot)──→ Playing ──(win or full board)──→ Finished
//! ```
//!
//! There is no way back and no way to skip a state. `Finished` is frozen:
//! every later move is rejected with [`GameError::GameNotInProgress`].
//!
//! Every mutating method validates first and mutates second, so a rejected
//! request leaves the session exactly as it was.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use connectfour_engine::{Board, Seat, Terminal};
use connectfour_protocol::{
    GameStatus, Player, PlayerId, SessionId, SessionSnapshot,
};

use crate::{GameError, LeaderboardStore, Outcome};

/// Display name of the fallback bot.
pub const BOT_USERNAME: &str = "CompetitiveBot";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// What an accepted move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveApplied {
    /// Who moved.
    pub seat: Seat,
    pub row: usize,
    pub column: usize,
    /// Whether this move ended the game.
    pub terminal: Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameResult {
    Winner(Seat),
    Draw,
}

/// The authoritative state of one match.
pub struct Session {
    id: SessionId,
    board: Board,
    /// Index 0 is the creator; index 1 appears on join or bot seating.
    players: Vec<Player>,
    current: Seat,
    status: GameStatus,
    result: Option<GameResult>,
    created_at: u64,
    last_move_at: Option<u64>,
    leaderboard: Arc<dyn LeaderboardStore>,
}

impl Session {
    /// Opens a session in `Waiting` with `creator` in seat 0.
    ///
    /// The fallback timer is not armed here; that's the registry's job.
    pub fn new(
        id: SessionId,
        creator: Player,
        leaderboard: Arc<dyn LeaderboardStore>,
    ) -> Self {
        tracing::info!(
            session_id = %id,
            username = %creator.username,
            "session created"
        );
        Self {
            id,
            board: Board::new(),
            players: vec![creator],
            current: Seat::First,
            status: GameStatus::Waiting,
            result: None,
            created_at: now_millis(),
            last_move_at: None,
            leaderboard,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// One player while waiting, two afterwards.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Whose turn it is. Only meaningful while playing.
    pub fn current_seat(&self) -> Seat {
        self.current
    }

    /// The player whose turn it is, if that seat is filled.
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current.index())
    }

    /// `true` while playing and the bot is the one to move.
    pub fn is_bot_turn(&self) -> bool {
        self.status == GameStatus::Playing
            && self.current_player().is_some_and(|p| p.is_bot)
    }

    /// Seats `joiner` at index 1 and starts the game.
    ///
    /// # Errors
    /// [`GameError::SessionFull`] unless the session is still waiting.
    pub fn join(&mut self, joiner: Player) -> Result<(), GameError> {
        if self.status != GameStatus::Waiting {
            return Err(GameError::SessionFull(self.id.clone()));
        }

        tracing::info!(
            session_id = %self.id,
            username = %joiner.username,
            "player joined"
        );
        self.start(joiner);
        Ok(())
    }

    /// Seats the fallback bot at index 1 and starts the game.
    ///
    /// Returns `false` without touching anything if a human got there
    /// first: the fallback timer and a join race, and whichever arrives
    /// second sees a session that is no longer waiting.
    pub fn seat_bot(&mut self) -> bool {
        if self.status != GameStatus::Waiting {
            return false;
        }

        let bot = Player {
            id: PlayerId(format!("bot_{}", self.id)),
            username: BOT_USERNAME.to_owned(),
            is_bot: true,
        };
        tracing::info!(session_id = %self.id, "fallback bot seated");
        self.start(bot);
        true
    }

    fn start(&mut self, second: Player) {
        self.players.push(second);
        self.status = GameStatus::Playing;
        self.current = Seat::First;
    }

    /// Drops a disc for `player_id` into `column`.
    ///
    /// On success the board is updated and either the turn passes to the
    /// other seat or the session finishes. On error nothing changes.
    ///
    /// # Errors
    /// - [`GameError::GameNotInProgress`] unless playing
    /// - [`GameError::NotYourTurn`] if `player_id` isn't the current player
    /// - [`GameError::InvalidColumn`] if `column` is outside `0..7`
    /// - [`GameError::ColumnFull`] if the column has no room
    pub fn apply_move(
        &mut self,
        player_id: &PlayerId,
        column: i64,
    ) -> Result<MoveApplied, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::GameNotInProgress {
                id: self.id.clone(),
                status: self.status,
            });
        }
        if self.current_player().map(|p| &p.id) != Some(player_id) {
            return Err(GameError::NotYourTurn(player_id.clone()));
        }
        let column = usize::try_from(column)
            .map_err(|_| GameError::InvalidColumn(column))?;

        let seat = self.current;
        let (board, row) = self.board.drop(column, seat)?;

        // Validation is over; from here on the move is committed.
        self.board = board;
        self.last_move_at = Some(now_millis());

        let terminal = board.check_terminal(row, column);
        tracing::debug!(
            session_id = %self.id,
            %seat,
            column,
            row,
            "move applied"
        );
        match terminal {
            Terminal::Ongoing => self.current = seat.other(),
            Terminal::Win { seat, direction } => {
                tracing::info!(
                    session_id = %self.id,
                    %seat,
                    ?direction,
                    "session finished with a winner"
                );
                self.finish(GameResult::Winner(seat));
            }
            Terminal::Draw => {
                tracing::info!(session_id = %self.id, "session finished in a draw");
                self.finish(GameResult::Draw);
            }
        }

        Ok(MoveApplied {
            seat,
            row,
            column,
            terminal,
        })
    }

    /// Freezes the session and records the result. Only reachable from
    /// `Playing`, so it runs at most once per session.
    fn finish(&mut self, result: GameResult) {
        self.status = GameStatus::Finished;
        self.result = Some(result);

        match result {
            GameResult::Winner(winner) => {
                self.record(winner, Outcome::Win);
                self.record(winner.other(), Outcome::Loss);
            }
            GameResult::Draw => {
                self.record(Seat::First, Outcome::Draw);
                self.record(Seat::Second, Outcome::Draw);
            }
        }
    }

    fn record(&self, seat: Seat, outcome: Outcome) {
        match self.players.get(seat.index()) {
            Some(player) if !player.is_bot => {
                self.leaderboard.record(&player.username, outcome);
            }
            _ => {}
        }
    }

    /// `0`/`1` for a decisive result, `-1` for a draw, `None` while the
    /// game is still open.
    pub fn winner(&self) -> Option<i8> {
        self.result.map(|r| match r {
            GameResult::Winner(seat) => seat.index() as i8,
            GameResult::Draw => -1,
        })
    }

    /// The full state as clients see it.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            board: self.board.to_wire(),
            players: self.players.clone(),
            current_player: self.current.index() as u8,
            status: self.status,
            winner: self.winner(),
            created_at: self.created_at,
            last_move_at: self.last_move_at,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("current", &self.current)
            .field("players", &self.players)
            .field("board", &self.board)
            .finish_non_exhaustive()
    }
}

// =========================================================================
// Tests
// =========================================================================
