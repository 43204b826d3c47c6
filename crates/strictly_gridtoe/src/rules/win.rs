//! Win detection logic for grid tic-tac-toe.
//!
//! A mark wins with exactly three consecutive squares along a row, a column
//! or either diagonal. The run length does not grow with the board, so a
//! 9×9 board for eight players is won the same way as the classic 3×3.

use crate::{Board, Mark, Square};
use strum::{EnumIter, IntoEnumIterator};
use tracing::instrument;

/// Number of consecutive marks needed to win.
pub const RUN_LENGTH: usize = 3;

/// Line directions scanned by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Direction {
    /// Left to right along a row.
    Horizontal,
    /// Top to bottom along a column.
    Vertical,
    /// Top-left to bottom-right (↘).
    Diagonal,
    /// Top-right to bottom-left (↙).
    AntiDiagonal,
}

impl Direction {
    /// Row and column step for one square along this direction.
    pub fn step(self) -> (isize, isize) {
        match self {
            Direction::Horizontal => (0, 1),
            Direction::Vertical => (1, 0),
            Direction::Diagonal => (1, 1),
            Direction::AntiDiagonal => (1, -1),
        }
    }

    /// Indices of the run starting at `(row, col)`, or `None` if it leaves a
    /// board of the given side.
    fn run(self, side: usize, row: usize, col: usize) -> Option<[usize; RUN_LENGTH]> {
        let (dr, dc) = self.step();
        let mut run = [0; RUN_LENGTH];
        for (k, slot) in run.iter_mut().enumerate() {
            let r = row.checked_add_signed(dr * k as isize)?;
            let c = col.checked_add_signed(dc * k as isize)?;
            if r >= side || c >= side {
                return None;
            }
            *slot = r * side + c;
        }
        Some(run)
    }
}

/// Checks whether `mark` holds three consecutive squares anywhere on `board`.
///
/// Every square is tried as the start of a run in each of the four
/// directions; runs that would leave the board are skipped. Returns on the
/// first complete run.
#[instrument(skip(board), fields(side = board.side()))]
pub fn has_win(board: &Board, mark: Mark) -> bool {
    let side = board.side();
    let target = Square::Occupied(mark);

    for direction in Direction::iter() {
        for row in 0..side {
            for col in 0..side {
                let Some(run) = direction.run(side, row, col) else {
                    continue;
                };
                if run.iter().all(|&index| board.cell(index) == target) {
                    return true;
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(side: usize, mark: Mark, indices: &[usize]) -> Board {
        let mut board = Board::new(side);
        for &index in indices {
            board.place(index, mark);
        }
        board
    }

    #[test]
    fn test_no_winner_empty_board() {
        let board = Board::new(3);
        assert!(!has_win(&board, Mark::X));
    }

    #[test]
    fn test_winner_top_row() {
        let board = board_with(3, Mark::X, &[0, 1, 2]);
        assert!(has_win(&board, Mark::X));
        assert!(!has_win(&board, Mark::O));
    }

    #[test]
    fn test_winner_column() {
        let board = board_with(3, Mark::O, &[1, 4, 7]);
        assert!(has_win(&board, Mark::O));
    }

    #[test]
    fn test_winner_diagonal() {
        let board = board_with(3, Mark::O, &[0, 4, 8]);
        assert!(has_win(&board, Mark::O));
    }

    #[test]
    fn test_winner_anti_diagonal() {
        let board = board_with(3, Mark::X, &[2, 4, 6]);
        assert!(has_win(&board, Mark::X));
    }

    #[test]
    fn test_no_winner_incomplete() {
        let board = board_with(3, Mark::X, &[0, 1]);
        assert!(!has_win(&board, Mark::X));
    }

    #[test]
    fn test_three_wins_on_larger_board() {
        // Middle of the second row of a 5×5 board.
        let board = board_with(5, Mark::Delta, &[6, 7, 8]);
        assert!(has_win(&board, Mark::Delta));
    }

    #[test]
    fn test_short_diagonal_near_edge() {
        // ↙ run starting at the last column of a 4×4: (0,3) (1,2) (2,1).
        let board = board_with(4, Mark::Block, &[3, 6, 9]);
        assert!(has_win(&board, Mark::Block));
    }

    #[test]
    fn test_runs_do_not_wrap_rows() {
        // Indices 3,4,5 on a 4×4 straddle rows 0 and 1.
        let board = board_with(4, Mark::X, &[3, 4, 5]);
        assert!(!has_win(&board, Mark::X));
    }

    #[test]
    fn test_gap_breaks_run() {
        let board = board_with(5, Mark::X, &[0, 1, 3, 4]);
        assert!(!has_win(&board, Mark::X));
    }

    #[test]
    fn test_run_never_leaves_board() {
        for direction in Direction::iter() {
            for side in 3..=9 {
                for row in 0..side {
                    for col in 0..side {
                        if let Some(run) = direction.run(side, row, col) {
                            assert!(run.iter().all(|&i| i < side * side));
                        }
                    }
                }
            }
        }
    }
}
