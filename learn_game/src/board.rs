use crate::error::GameError;
use crate::outcome::OutcomeCache;
use crate::players::Marks;
use itertools::Itertools;
use ndarray::prelude::*;
use std::fmt;

pub type Position = (usize, usize);

const LINES: [[Position; 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// A 3x3 grid that keeps its balanced-ternary encoding up to date.
///
/// `encoding` is the sum of `mark.value() * 3^(3 * row + col)` over all cells,
/// which maps every filling to a distinct integer in `-9841..=9841`.
#[derive(Debug, Clone)]
pub struct Board {
    cells: Array2<Marks>,
    encoding: i32,
    filled: usize,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Board {
            cells: Array::from_elem((3, 3), Marks::Empty),
            encoding: 0,
            filled: 0,
        }
    }

    /// Builds a board by placing each mark in turn, stopping at the first
    /// placement that is refused.
    pub fn from_placements<I>(placements: I) -> Result<Self, GameError>
    where
        I: IntoIterator<Item = (Position, Marks)>,
    {
        let mut board = Board::new();
        for (position, mark) in placements {
            board.place(position, mark)?;
        }
        Ok(board)
    }

    pub fn place(&mut self, (row, col): Position, mark: Marks) -> Result<(), GameError> {
        let cell = self
            .cells
            .get_mut([row, col])
            .ok_or(GameError::OffBoard { row, col })?;
        if mark == Marks::Empty {
            return Err(GameError::EmptyMark { row, col });
        }
        if *cell != Marks::Empty {
            return Err(GameError::Occupied {
                row,
                col,
                mark: *cell,
            });
        }
        *cell = mark;
        self.encoding += i32::from(mark.value()) * 3_i32.pow((3 * row + col) as u32);
        self.filled += 1;
        Ok(())
    }

    pub fn encoding(&self) -> i32 {
        self.encoding
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_full(&self) -> bool {
        self.filled == 9
    }

    pub fn available_moves(&self) -> Vec<Position> {
        self.cells
            .indexed_iter()
            .filter(|(_index, &mark)| mark == Marks::Empty)
            .map(|(index, _)| index)
            .collect()
    }

    /// Scans rows, then columns, then diagonals for three equal marks.
    pub fn line_winner(&self) -> Option<Marks> {
        LINES.iter().find_map(|line| {
            let mark = self.cells[line[0]];
            (mark != Marks::Empty && line.iter().all(|&position| self.cells[position] == mark))
                .then_some(mark)
        })
    }

    pub fn winner(&self, cache: &mut OutcomeCache) -> Option<Marks> {
        // no line can be complete with fewer than three marks down
        if self.filled < 3 {
            return None;
        }
        let sign: i8 = if self.encoding < 0 { -1 } else { 1 };
        let cached = cache.get_or_compute(self.encoding.unsigned_abs(), || {
            sign * self.line_winner().map_or(0, Marks::value)
        });
        Marks::from_value(cached * sign)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rows = self
            .cells
            .iter()
            .tuples::<(_, _, _)>()
            .map(|(a, b, c)| format!("|{a}|{b}|{c}|"))
            .join("\n+-+-+-+\n");
        write!(f, "+-+-+-+\n{rows}\n+-+-+-+")
    }
}
