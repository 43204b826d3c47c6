//! Square grid of cells, sized by the number of players.

use crate::Mark;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest supported board side (two players).
pub const MIN_SIDE: usize = 3;

/// A square on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<Mark>", into = "Option<Mark>")]
pub enum Square {
    /// Empty square.
    Empty,
    /// Square occupied by a participant's mark.
    Occupied(Mark),
}

impl Square {
    /// Returns the occupying mark, if any.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Square::Empty => None,
            Square::Occupied(mark) => Some(mark),
        }
    }
}

impl From<Option<Mark>> for Square {
    fn from(mark: Option<Mark>) -> Self {
        mark.map_or(Square::Empty, Square::Occupied)
    }
}

impl From<Square> for Option<Mark> {
    fn from(square: Square) -> Self {
        square.mark()
    }
}

/// `side × side` board stored in row-major order.
///
/// Index `i` maps to row `i / side`, column `i % side`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    side: usize,
    squares: Vec<Square>,
}

impl Board {
    /// Creates an empty board with the given side length.
    pub fn new(side: usize) -> Self {
        debug_assert!(side >= MIN_SIDE, "board side must be at least {MIN_SIDE}");
        Self {
            side,
            squares: vec![Square::Empty; side * side],
        }
    }

    /// Creates an empty board for `players` participants (side `players + 1`).
    pub fn for_players(players: usize) -> Self {
        Self::new(players + 1)
    }

    /// Side length of the grid.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Total number of cells (`side²`).
    pub fn len(&self) -> usize {
        self.squares.len()
    }

    /// Always false: a board has at least nine cells.
    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }

    /// Returns the square at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`. Callers validate bounds first.
    pub fn cell(&self, index: usize) -> Square {
        self.squares[index]
    }

    /// Returns the square at `index`, or `None` if out of range.
    pub fn get(&self, index: usize) -> Option<Square> {
        self.squares.get(index).copied()
    }

    /// Returns the square at `(row, col)`, or `None` if off the board.
    pub fn at(&self, row: usize, col: usize) -> Option<Square> {
        if row < self.side && col < self.side {
            self.get(row * self.side + col)
        } else {
            None
        }
    }

    /// Splits an index into `(row, col)`.
    pub fn row_col(&self, index: usize) -> (usize, usize) {
        (index / self.side, index % self.side)
    }

    /// Checks whether `index` is on the board and empty.
    pub fn is_vacant(&self, index: usize) -> bool {
        matches!(self.get(index), Some(Square::Empty))
    }

    /// Writes `mark` into `index`.
    ///
    /// The caller guarantees the index is in range and empty.
    pub fn place(&mut self, index: usize, mark: Mark) {
        debug_assert!(self.is_vacant(index), "place on non-vacant square {index}");
        self.squares[index] = Square::Occupied(mark);
    }

    /// Checks if no square is empty.
    pub fn is_full(&self) -> bool {
        self.squares.iter().all(|s| *s != Square::Empty)
    }

    /// Number of occupied squares.
    pub fn occupied(&self) -> usize {
        self.squares.iter().filter(|s| **s != Square::Empty).count()
    }

    /// Returns all squares in row-major order.
    pub fn squares(&self) -> &[Square] {
        &self.squares
    }
}

/// Renders the grid with row/column labels followed by a guide that lists
/// the index of every cell.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = self.side;
        let rule = format!("   +{}", "---+".repeat(side));

        let headers: Vec<String> = (0..side).map(|c| c.to_string()).collect();
        writeln!(f, "     {}", headers.join("   "))?;
        writeln!(f, "{rule}")?;
        for row in 0..side {
            let cells: Vec<String> = (0..side)
                .map(|col| match self.squares[row * side + col] {
                    Square::Empty => "   ".to_string(),
                    Square::Occupied(mark) => format!(" {mark} "),
                })
                .collect();
            writeln!(f, " {row} |{}|", cells.join("|"))?;
            writeln!(f, "{rule}")?;
        }

        writeln!(f)?;
        write!(f, "Positions:")?;
        for row in 0..side {
            let positions: Vec<String> = (0..side)
                .map(|col| format!("{:2}", row * side + col))
                .collect();
            write!(f, "\n  {}", positions.join("  "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_follows_player_count() {
        for players in 2..=8 {
            let board = Board::for_players(players);
            assert_eq!(board.side(), players + 1);
            assert_eq!(board.len(), (players + 1) * (players + 1));
        }
    }

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new(4);
        assert!(board.squares().iter().all(|s| *s == Square::Empty));
        assert_eq!(board.occupied(), 0);
        assert!(!board.is_full());
    }

    #[test]
    fn test_place_and_read_back() {
        let mut board = Board::new(4);
        board.place(6, Mark::Delta);
        assert_eq!(board.cell(6), Square::Occupied(Mark::Delta));
        assert_eq!(board.at(1, 2), Some(Square::Occupied(Mark::Delta)));
        assert_eq!(board.row_col(6), (1, 2));
        assert!(!board.is_vacant(6));
    }

    #[test]
    fn test_get_out_of_range() {
        let board = Board::new(3);
        assert_eq!(board.get(9), None);
        assert_eq!(board.at(3, 0), None);
        assert!(!board.is_vacant(9));
    }

    #[test]
    #[should_panic]
    fn test_cell_out_of_range_panics() {
        let board = Board::new(3);
        let _ = board.cell(9);
    }

    #[test]
    fn test_full_board() {
        let mut board = Board::new(3);
        for index in 0..9 {
            board.place(index, if index % 2 == 0 { Mark::X } else { Mark::O });
        }
        assert!(board.is_full());
        assert_eq!(board.occupied(), 9);
    }

    #[test]
    fn test_display_shows_marks_and_guide() {
        let mut board = Board::new(3);
        board.place(0, Mark::X);
        board.place(4, Mark::O);
        let text = board.to_string();
        assert!(text.contains(" 0 | X |   |   |"));
        assert!(text.contains(" 1 |   | O |   |"));
        assert!(text.contains("Positions:"));
        assert!(text.contains(" 6   7   8"));
    }

    #[test]
    fn test_squares_serialize_as_optional_marks() {
        let mut board = Board::new(3);
        board.place(2, Mark::X);
        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(json["side"], 3);
        assert_eq!(json["squares"][0], serde_json::Value::Null);
        assert_eq!(json["squares"][2], "X");
    }
}
