use crate::players::Marks;

/// A placement the board refuses to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("square ({row}, {col}) is already taken by {mark}")]
    Occupied { row: usize, col: usize, mark: Marks },

    #[error("cannot place an empty mark on ({row}, {col})")]
    EmptyMark { row: usize, col: usize },

    #[error("position ({row}, {col}) is off the board")]
    OffBoard { row: usize, col: usize },
}
