//! Game rules for grid tic-tac-toe.

pub mod win;

pub use win::{Direction, RUN_LENGTH, has_win};
