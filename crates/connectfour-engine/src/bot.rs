//! The fallback bot: picks a column for the seat it plays.
//!
//! The search order is:
//!
//! 1. a column that wins right now,
//! 2. a column that stops the opponent winning on their next drop,
//! 3. iterative-deepening negamax with alpha-beta pruning, scoring leaf
//!    positions by counting open 4-cell windows.
//!
//! Step 3 runs until the deadline, then answers with the best column from
//! the deepest search that finished. A search that runs out of time is
//! thrown away, never half-used.

use std::ops::Range;
use std::time::Instant;

use rand::seq::IndexedRandom;

use crate::board::{Board, Cell, Seat, Terminal, COLUMNS, ROWS};

/// Depth cap for [`HeuristicBot::default`].
pub const DEFAULT_MAX_DEPTH: u32 = 8;

/// Center-first ordering. Better moves first means more alpha-beta cutoffs.
const MOVE_ORDER: [usize; COLUMNS] = [3, 2, 4, 1, 5, 0, 6];

const WIN_SCORE: i32 = 1_000_000;
const INFINITY: i32 = i32::MAX / 2;

/// Picks a column for the bot.
///
/// `Send + Sync + 'static` because one strategy is shared by every session
/// in the registry and runs on Tokio's blocking pool.
pub trait BotStrategy: Send + Sync + 'static {
    /// Chooses a column for `bot` to drop into.
    ///
    /// Must return a column that is not full, and must return by
    /// `deadline`. Returns `None` only when the board has no legal column.
    fn choose_column(
        &self,
        board: &Board,
        bot: Seat,
        opponent: Seat,
        deadline: Instant,
    ) -> Option<usize>;
}

/// The production bot.
#[derive(Debug, Clone)]
pub struct HeuristicBot {
    max_depth: u32,
}

impl HeuristicBot {
    /// Creates a bot that searches at most `max_depth` plies ahead.
    /// A depth of 0 is treated as 1.
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }
}

impl Default for HeuristicBot {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

/// The search hit the deadline. Never leaves this module.
#[derive(Debug)]
struct BotTimeExceeded;

impl BotStrategy for HeuristicBot {
    fn choose_column(
        &self,
        board: &Board,
        bot: Seat,
        opponent: Seat,
        deadline: Instant,
    ) -> Option<usize> {
        let legal = ordered_legal(board);
        let first = *legal.first()?;
        if legal.len() == 1 {
            return Some(first);
        }

        if let Some(column) = winning_column(board, bot, &legal) {
            tracing::debug!(column, "bot takes immediate win");
            return Some(column);
        }
        if let Some(column) = winning_column(board, opponent, &legal) {
            tracing::debug!(column, "bot blocks opponent");
            return Some(column);
        }

        let mut best = first;
        let mut completed = 0;
        for depth in 1..=self.max_depth {
            match search_root(board, bot, depth, deadline) {
                Ok((column, score)) => {
                    best = column;
                    completed = depth;
                    // A proven result won't change with more depth.
                    if score.abs() >= WIN_SCORE - (ROWS * COLUMNS) as i32 {
                        break;
                    }
                }
                Err(BotTimeExceeded) => break,
            }
        }

        tracing::debug!(column = best, depth = completed, "bot search finished");
        Some(best)
    }
}

/// Legal columns in [`MOVE_ORDER`].
fn ordered_legal(board: &Board) -> Vec<usize> {
    MOVE_ORDER
        .iter()
        .copied()
        .filter(|&c| !board.is_column_full(c))
        .collect()
}

/// First column in `legal` where a drop by `seat` wins on the spot.
fn winning_column(board: &Board, seat: Seat, legal: &[usize]) -> Option<usize> {
    legal.iter().copied().find(|&column| {
        board.drop(column, seat).is_ok_and(|(next, row)| {
            matches!(next.check_terminal(row, column), Terminal::Win { .. })
        })
    })
}

/// Scores every root move at `depth` and picks randomly among the best.
fn search_root(
    board: &Board,
    seat: Seat,
    depth: u32,
    deadline: Instant,
) -> Result<(usize, i32), BotTimeExceeded> {
    let mut best_score = -INFINITY;
    let mut best_columns = Vec::new();

    for column in MOVE_ORDER {
        let Ok((next, row)) = board.drop(column, seat) else {
            continue;
        };
        let score = score_child(
            &next, row, column, seat, depth, -INFINITY, INFINITY, 1, deadline,
        )?;
        if score > best_score {
            best_score = score;
            best_columns.clear();
            best_columns.push(column);
        } else if score == best_score {
            best_columns.push(column);
        }
    }

    let column = best_columns
        .choose(&mut rand::rng())
        .copied()
        .ok_or(BotTimeExceeded)?;
    Ok((column, best_score))
}

/// Score, from `seat`'s point of view, of the position after `seat` dropped
/// at `(row, column)` and produced `next`.
#[allow(clippy::too_many_arguments)]
fn score_child(
    next: &Board,
    row: usize,
    column: usize,
    seat: Seat,
    depth: u32,
    alpha: i32,
    beta: i32,
    ply: i32,
    deadline: Instant,
) -> Result<i32, BotTimeExceeded> {
    Ok(match next.check_terminal(row, column) {
        // Sooner wins score higher.
        Terminal::Win { .. } => WIN_SCORE - ply,
        Terminal::Draw => 0,
        Terminal::Ongoing if depth <= 1 => evaluate(next, seat),
        Terminal::Ongoing => -negamax(
            next,
            seat.other(),
            depth - 1,
            -beta,
            -alpha,
            ply + 1,
            deadline,
        )?,
    })
}

/// Best score for `seat` (to move) searching `depth` plies.
fn negamax(
    board: &Board,
    seat: Seat,
    depth: u32,
    mut alpha: i32,
    beta: i32,
    ply: i32,
    deadline: Instant,
) -> Result<i32, BotTimeExceeded> {
    if Instant::now() >= deadline {
        return Err(BotTimeExceeded);
    }

    let mut best = -INFINITY;
    for column in MOVE_ORDER {
        let Ok((next, row)) = board.drop(column, seat) else {
            continue;
        };
        let score = score_child(
            &next, row, column, seat, depth, alpha, beta, ply, deadline,
        )?;
        best = best.max(score);
        alpha = alpha.max(score);
        if alpha >= beta {
            break;
        }
    }

    // No legal column means the board was full, which the caller already
    // scored as a draw; keep the value neutral anyway.
    Ok(if best == -INFINITY { 0 } else { best })
}

// ---------------------------------------------------------------------------
// Static evaluation
// ---------------------------------------------------------------------------

/// Positional score for `seat`: center-column discs plus every 4-cell
/// window that one side could still complete.
fn evaluate(board: &Board, seat: Seat) -> i32 {
    let own = Cell::Occupied(seat);
    let opp = Cell::Occupied(seat.other());
    let mut score = 0;

    let center = COLUMNS / 2;
    for row in 0..ROWS {
        match board.cell(row, center) {
            Some(c) if c == own => score += 3,
            Some(c) if c == opp => score -= 3,
            _ => {}
        }
    }

    // (row step, column step, row range, column range) for each direction.
    let windows: [(isize, isize, Range<usize>, Range<usize>); 4] = [
        (0, 1, 0..ROWS, 0..COLUMNS - 3),
        (1, 0, 0..ROWS - 3, 0..COLUMNS),
        (1, 1, 0..ROWS - 3, 0..COLUMNS - 3),
        (1, -1, 0..ROWS - 3, 3..COLUMNS),
    ];

    for (dr, dc, rows, columns) in windows {
        for row in rows {
            for column in columns.clone() {
                let (mut mine, mut theirs, mut empty) = (0, 0, 0);
                for i in 0..4 {
                    let r = (row as isize + dr * i) as usize;
                    let c = (column as isize + dc * i) as usize;
                    match board.cell(r, c) {
                        Some(cell) if cell == own => mine += 1,
                        Some(cell) if cell == opp => theirs += 1,
                        _ => empty += 1,
                    }
                }
                score += score_window(mine, theirs, empty);
            }
        }
    }

    score
}

fn score_window(mine: u32, theirs: u32, empty: u32) -> i32 {
    match (mine, theirs, empty) {
        (3, 0, 1) => 50,
        (2, 0, 2) => 10,
        (0, 3, 1) => -80,
        (0, 2, 2) => -10,
        _ => 0,
    }
}

// =========================================================================
// Tests
// =========================================================================
