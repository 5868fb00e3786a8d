//! The board: a 6×7 grid where discs fall to the lowest open row.
//!
//! Row 0 is the TOP of the board, matching what the client renders, so a
//! column is full exactly when its row-0 cell is occupied.
//!
//! [`Board`] is `Copy` (42 small cells) and every operation that changes it
//! returns a new board instead of mutating in place. That keeps validation
//! trivially side-effect free: if `drop` fails, nothing changed.

use std::fmt;

/// Number of rows.
pub const ROWS: usize = 6;
/// Number of columns.
pub const COLUMNS: usize = 7;
/// Discs in a line needed to win.
pub const CONNECT: usize = 4;

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// Which of the two players a disc (or a turn) belongs to.
///
/// `First` is index 0 (the session creator), `Second` is index 1 (the
/// joiner or the fallback bot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    /// Returns 0 for `First`, 1 for `Second`.
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// Inverse of [`Seat::index`]. Anything other than 0 or 1 is `None`.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::First),
            1 => Some(Self::Second),
            _ => None,
        }
    }

    /// The opponent.
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat-{}", self.index())
    }
}

// ---------------------------------------------------------------------------
// Cell / Direction / Terminal
// ---------------------------------------------------------------------------

/// Contents of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(Seat),
}

impl Cell {
    /// Wire encoding: 0 empty, 1 for seat 0, 2 for seat 1.
    pub fn to_wire(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Occupied(seat) => seat.index() as u8 + 1,
        }
    }
}

/// A line direction, in the order lines are checked after a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Horizontal,
    Vertical,
    DiagonalDownRight,
    DiagonalDownLeft,
}

impl Direction {
    /// When two lines complete on the same drop, the earlier entry here is
    /// the one reported.
    pub const SCAN_ORDER: [Direction; 4] = [
        Direction::Horizontal,
        Direction::Vertical,
        Direction::DiagonalDownRight,
        Direction::DiagonalDownLeft,
    ];

    /// `(row step, column step)` for walking forward along the line.
    fn step(self) -> (isize, isize) {
        match self {
            Self::Horizontal => (0, 1),
            Self::Vertical => (1, 0),
            Self::DiagonalDownRight => (1, 1),
            Self::DiagonalDownLeft => (1, -1),
        }
    }
}

/// Result of [`Board::check_terminal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Ongoing,
    Win { seat: Seat, direction: Direction },
    Draw,
}

// ---------------------------------------------------------------------------
// BoardError
// ---------------------------------------------------------------------------

/// Why a drop was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The column is outside `0..7`.
    #[error("column {0} is out of range")]
    InvalidColumn(i64),

    /// The column's top cell is already occupied.
    #[error("column {0} is full")]
    ColumnFull(usize),
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// The 6×7 grid. `cells[row][column]`, row 0 on top.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Board {
    cells: [[Cell; COLUMNS]; ROWS],
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of `(row, column)`, or `None` if either is out of range.
    pub fn cell(&self, row: usize, column: usize) -> Option<Cell> {
        self.cells.get(row)?.get(column).copied()
    }

    /// A column is full iff its top cell is occupied.
    ///
    /// Out-of-range columns count as full so callers scanning for legal
    /// moves never pick them.
    pub fn is_column_full(&self, column: usize) -> bool {
        column >= COLUMNS || self.cells[0][column] != Cell::Empty
    }

    /// Columns that can still accept a disc, in ascending order.
    pub fn legal_columns(&self) -> Vec<usize> {
        (0..COLUMNS).filter(|&c| !self.is_column_full(c)).collect()
    }

    /// `true` when every column is full.
    pub fn is_full(&self) -> bool {
        (0..COLUMNS).all(|c| self.is_column_full(c))
    }

    /// Number of occupied cells.
    pub fn discs(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| **c != Cell::Empty)
            .count()
    }

    /// Drops a disc for `seat` into `column`.
    ///
    /// Returns the updated board and the row the disc landed on. `self` is
    /// untouched either way.
    ///
    /// # Errors
    /// - [`BoardError::InvalidColumn`] if `column >= 7`
    /// - [`BoardError::ColumnFull`] if row 0 of `column` is occupied
    pub fn drop(
        &self,
        column: usize,
        seat: Seat,
    ) -> Result<(Board, usize), BoardError> {
        if column >= COLUMNS {
            return Err(BoardError::InvalidColumn(
                i64::try_from(column).unwrap_or(i64::MAX),
            ));
        }

        // Lowest empty row. The gravity invariant means everything above
        // it in this column is empty too.
        let row = (0..ROWS)
            .rev()
            .find(|&r| self.cells[r][column] == Cell::Empty)
            .ok_or(BoardError::ColumnFull(column))?;

        let mut next = *self;
        next.cells[row][column] = Cell::Occupied(seat);
        Ok((next, row))
    }

    /// Decides whether the disc just placed at `(row, column)` ended the
    /// game.
    ///
    /// Only lines through that cell are examined, which is enough because
    /// the game stops at the first line made. Directions are checked in
    /// [`Direction::SCAN_ORDER`]; the first that yields four in a row is
    /// reported. Draw means the board is now full and no line was made.
    pub fn check_terminal(&self, row: usize, column: usize) -> Terminal {
        let Some(Cell::Occupied(seat)) = self.cell(row, column) else {
            return if self.is_full() {
                Terminal::Draw
            } else {
                Terminal::Ongoing
            };
        };

        for direction in Direction::SCAN_ORDER {
            let (dr, dc) = direction.step();
            let run = 1
                + self.run_length(row, column, dr, dc, seat)
                + self.run_length(row, column, -dr, -dc, seat);
            if run >= CONNECT {
                return Terminal::Win { seat, direction };
            }
        }

        if self.is_full() {
            Terminal::Draw
        } else {
            Terminal::Ongoing
        }
    }

    /// The board as the client expects it: 0 empty, 1/2 for seats 0/1.
    pub fn to_wire(&self) -> [[u8; COLUMNS]; ROWS] {
        let mut wire = [[0u8; COLUMNS]; ROWS];
        for (row, cells) in self.cells.iter().enumerate() {
            for (column, cell) in cells.iter().enumerate() {
                wire[row][column] = cell.to_wire();
            }
        }
        wire
    }

    /// Consecutive `seat` discs starting one step away from `(row, column)`.
    fn run_length(
        &self,
        row: usize,
        column: usize,
        dr: isize,
        dc: isize,
        seat: Seat,
    ) -> usize {
        let mut count = 0;
        let (mut r, mut c) = (row as isize + dr, column as isize + dc);
        while r >= 0
            && c >= 0
            && (r as usize) < ROWS
            && (c as usize) < COLUMNS
            && self.cells[r as usize][c as usize] == Cell::Occupied(seat)
        {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        for row in &self.cells {
            for cell in row {
                let ch = match cell {
                    Cell::Empty => '.',
                    Cell::Occupied(Seat::First) => 'X',
                    Cell::Occupied(Seat::Second) => 'O',
                };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const X: Seat = Seat::First;
    const O: Seat = Seat::Second;

    /// Plays `(column, seat)` pairs in order and returns the board plus the
    /// landing cell of the last drop.
    fn play(moves: &[(usize, Seat)]) -> (Board, usize, usize) {
        let mut board = Board::new();
        let mut last = (0, 0);
        for &(column, seat) in moves {
            let (next, row) = board.drop(column, seat).expect("legal drop");
            board = next;
            last = (row, column);
        }
        (board, last.0, last.1)
    }

    /// Fills every cell except the top of column 6 without making a line.
    fn nearly_full_board() -> Board {
        // Indexed by height from the bottom.
        let pattern: [[Seat; COLUMNS]; ROWS] = [
            [X, X, O, O, X, X, O],
            [O, O, X, X, O, O, X],
            [X, X, O, O, X, X, O],
            [O, O, X, X, O, O, X],
            [X, X, O, O, X, X, O],
            [O, O, X, X, O, O, X],
        ];
        let mut board = Board::new();
        for column in 0..COLUMNS {
            for (height, row) in pattern.iter().enumerate() {
                if column == 6 && height == ROWS - 1 {
                    break;
                }
                board = board.drop(column, row[column]).unwrap().0;
            }
        }
        board
    }

    // =====================================================================
    // drop()
    // =====================================================================

    #[test]
    fn test_drop_empty_column_lands_on_bottom_row() {
        let (board, row) = Board::new().drop(3, X).unwrap();

        assert_eq!(row, ROWS - 1);
        assert_eq!(board.cell(5, 3), Some(Cell::Occupied(X)));
        assert_eq!(board.discs(), 1);
    }

    #[test]
    fn test_drop_stacks_on_previous_disc() {
        let (board, _, _) = play(&[(2, X), (2, O)]);

        assert_eq!(board.cell(5, 2), Some(Cell::Occupied(X)));
        assert_eq!(board.cell(4, 2), Some(Cell::Occupied(O)));
    }

    #[test]
    fn test_drop_does_not_modify_input_board() {
        let board = Board::new();
        let _ = board.drop(0, X).unwrap();
        assert_eq!(board, Board::new());
    }

    #[test]
    fn test_drop_column_out_of_range_returns_invalid_column() {
        let result = Board::new().drop(7, X);
        assert_eq!(result.unwrap_err(), BoardError::InvalidColumn(7));
    }

    #[test]
    fn test_drop_full_column_returns_column_full() {
        let moves: Vec<_> = (0..ROWS)
            .map(|i| (4, if i % 2 == 0 { X } else { O }))
            .collect();
        let (board, row, _) = play(&moves);
        assert_eq!(row, 0, "sixth disc lands on the top row");
        assert!(board.is_column_full(4));

        assert_eq!(board.drop(4, X).unwrap_err(), BoardError::ColumnFull(4));
    }

    #[test]
    fn test_legal_columns_skips_full_columns() {
        let moves: Vec<_> = (0..ROWS)
            .map(|i| (0, if i % 2 == 0 { X } else { O }))
            .collect();
        let (board, _, _) = play(&moves);

        assert_eq!(board.legal_columns(), vec![1, 2, 3, 4, 5, 6]);
    }

    // =====================================================================
    // check_terminal()
    // =====================================================================

    #[test]
    fn test_check_terminal_single_disc_is_ongoing() {
        let (board, row, col) = play(&[(3, X)]);
        assert_eq!(board.check_terminal(row, col), Terminal::Ongoing);
    }

    #[test]
    fn test_check_terminal_horizontal_four_wins() {
        let (board, row, col) = play(&[
            (0, X),
            (0, O),
            (1, X),
            (1, O),
            (2, X),
            (2, O),
            (3, X),
        ]);
        assert_eq!(
            board.check_terminal(row, col),
            Terminal::Win {
                seat: X,
                direction: Direction::Horizontal
            }
        );
    }

    #[test]
    fn test_check_terminal_vertical_four_wins() {
        let (board, row, col) =
            play(&[(3, X), (4, O), (3, X), (4, O), (3, X), (4, O), (3, X)]);
        assert_eq!(
            board.check_terminal(row, col),
            Terminal::Win {
                seat: X,
                direction: Direction::Vertical
            }
        );
    }

    #[test]
    fn test_check_terminal_diagonal_down_right_wins() {
        // O lands on (2,0), (3,1), (4,2), (5,3): moving down and right.
        let (board, row, col) = play(&[
            (3, O),
            (2, X),
            (2, O),
            (1, X),
            (1, X),
            (1, O),
            (0, X),
            (0, X),
            (0, X),
            (0, O),
        ]);
        assert_eq!((row, col), (2, 0));
        assert_eq!(
            board.check_terminal(row, col),
            Terminal::Win {
                seat: O,
                direction: Direction::DiagonalDownRight
            }
        );
    }

    #[test]
    fn test_check_terminal_diagonal_down_left_wins() {
        // X lands on (5,0), (4,1), (3,2), (2,3): moving down and left.
        let (board, row, col) = play(&[
            (0, X),
            (1, O),
            (1, X),
            (2, O),
            (2, O),
            (2, X),
            (3, O),
            (3, O),
            (3, O),
            (3, X),
        ]);
        assert_eq!((row, col), (2, 3));
        assert_eq!(
            board.check_terminal(row, col),
            Terminal::Win {
                seat: X,
                direction: Direction::DiagonalDownLeft
            }
        );
    }

    #[test]
    fn test_check_terminal_completed_from_middle_of_line_wins() {
        // Last disc fills the gap in X X _ X.
        let (board, row, col) =
            play(&[(0, X), (0, O), (1, X), (1, O), (3, X), (3, O), (2, X)]);
        assert!(matches!(
            board.check_terminal(row, col),
            Terminal::Win { seat: X, .. }
        ));
    }

    #[test]
    fn test_check_terminal_reports_horizontal_before_vertical() {
        // The last X completes both row 2 (columns 0..=3) and column 3.
        let (board, row, col) = play(&[
            (0, O),
            (0, X),
            (0, O),
            (0, X),
            (1, X),
            (1, O),
            (1, O),
            (1, X),
            (2, O),
            (2, X),
            (2, O),
            (2, X),
            (3, X),
            (3, X),
            (3, X),
            (3, X),
        ]);
        assert_eq!((row, col), (2, 3));
        assert_eq!(
            board.check_terminal(row, col),
            Terminal::Win {
                seat: X,
                direction: Direction::Horizontal
            }
        );
    }

    #[test]
    fn test_check_terminal_full_board_without_line_is_draw() {
        let board = nearly_full_board();
        assert_eq!(board.discs(), 41);

        let (board, row) = board.drop(6, X).unwrap();
        assert!(board.is_full());
        assert_eq!(board.check_terminal(row, 6), Terminal::Draw);
    }

    // =====================================================================
    // to_wire()
    // =====================================================================

    #[test]
    fn test_to_wire_encodes_seats_as_one_and_two() {
        let (board, _, _) = play(&[(0, X), (6, O)]);
        let wire = board.to_wire();

        assert_eq!(wire[5][0], 1);
        assert_eq!(wire[5][6], 2);
        assert_eq!(wire[0], [0; COLUMNS]);
    }

    #[test]
    fn test_seat_from_index_rejects_out_of_range() {
        assert_eq!(Seat::from_index(0), Some(X));
        assert_eq!(Seat::from_index(1), Some(O));
        assert_eq!(Seat::from_index(2), None);
        assert_eq!(X.other(), O);
    }
}
