use crate::board::{Board, Position};
use crate::config::{Exploration, LearningParams};
use crate::q_table::{QTable, StateKey};
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Cell contents. The values are chosen so that swapping every mark on a
/// board negates its encoding; `Board::winner` relies on that.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum Marks {
    Nought = 1,
    Cross = -1,
    Empty = 0,
}

impl Marks {
    pub fn other(self) -> Self {
        match self {
            Self::Cross => Marks::Nought,
            Self::Nought => Marks::Cross,
            Self::Empty => Marks::Empty,
        }
    }
    pub fn value(self) -> i8 {
        self as i8
    }
    pub fn from_value(value: i8) -> Option<Self> {
        match value {
            1 => Some(Marks::Nought),
            -1 => Some(Marks::Cross),
            _ => None,
        }
    }
    pub fn as_char(self) -> char {
        match self {
            Self::Cross => 'X',
            Self::Nought => 'O',
            Self::Empty => ' ',
        }
    }
}

impl fmt::Display for Marks {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

pub trait Player {
    fn mark(&self) -> Marks;
    fn choose_move(&mut self, board: &Board, rng: &mut StdRng) -> Position;
    /// Called after every move of the match, with the board as it now stands.
    fn feedback(&mut self, reward: f32, board: &Board);
    /// Called instead of `feedback` when this player's last move was refused.
    fn fatal(&mut self, penalty: f32);
}

/// A source of players for either mark. Learning stables hand every player
/// the same quality table.
pub trait Stable {
    fn player(&self, mark: Marks) -> Box<dyn Player>;
    fn table_len(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug)]
pub struct RandomPlayer {
    pub mark: Marks,
}

impl RandomPlayer {
    pub fn new(mark: Marks) -> Self {
        RandomPlayer { mark }
    }
    pub fn random_empty(board: &Board, rng: &mut StdRng) -> Position {
        *board
            .available_moves()
            .choose(rng)
            .expect("A move is only requested while the board has an empty square.")
    }
}

impl Player for RandomPlayer {
    fn mark(&self) -> Marks {
        self.mark
    }
    fn choose_move(&mut self, board: &Board, rng: &mut StdRng) -> Position {
        Self::random_empty(board, rng)
    }
    fn feedback(&mut self, _reward: f32, _board: &Board) {}
    fn fatal(&mut self, _penalty: f32) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomStable;

impl Stable for RandomStable {
    fn player(&self, mark: Marks) -> Box<dyn Player> {
        Box::new(RandomPlayer::new(mark))
    }
}

#[derive(Debug)]
pub struct LearningPlayer {
    mark: Marks,
    quality: Rc<RefCell<QTable>>,
    params: LearningParams,
    last: Option<(StateKey, Position)>,
}

impl LearningPlayer {
    pub fn new(mark: Marks, quality: Rc<RefCell<QTable>>, params: LearningParams) -> Self {
        LearningPlayer {
            mark,
            quality,
            params,
            last: None,
        }
    }
    pub fn has_played(&self) -> bool {
        self.last.is_some()
    }
    /// The state and move recorded by the most recent `choose_move`.
    pub fn last_action(&self) -> Option<(StateKey, Position)> {
        self.last
    }
    fn explore(&self, board: &Board, rng: &mut StdRng) -> Position {
        match self.params.exploration {
            Exploration::EmptyCells => RandomPlayer::random_empty(board, rng),
            Exploration::AnyCell => (rng.gen_range(0..3), rng.gen_range(0..3)),
        }
    }
}

impl Player for LearningPlayer {
    fn mark(&self) -> Marks {
        self.mark
    }
    fn choose_move(&mut self, board: &Board, rng: &mut StdRng) -> Position {
        let state = (self.mark, board.encoding());
        let best = self.quality.borrow_mut().entry_or_default(state).select_max_move();
        let mv = if rng.gen::<f32>() <= self.params.threshold {
            best
        } else {
            self.explore(board, rng)
        };
        self.last = Some((state, mv));
        mv
    }
    fn feedback(&mut self, reward: f32, board: &Board) {
        let Some((state, mv)) = self.last else {
            return;
        };
        let LearningParams {
            alpha, discount, ..
        } = self.params;
        let mut quality = self.quality.borrow_mut();
        let max_next = quality.max_value(&(self.mark, board.encoding()));
        let value = &mut quality.entry_or_default(state)[mv];
        *value += alpha * (reward + discount * max_next - *value);
    }
    fn fatal(&mut self, penalty: f32) {
        if let Some((state, mv)) = self.last {
            self.quality.borrow_mut().entry_or_default(state)[mv] += penalty;
        }
    }
}

/// Learning players that share one quality table for the lifetime of the
/// stable.
#[derive(Debug)]
pub struct LearningStable {
    quality: Rc<RefCell<QTable>>,
    params: LearningParams,
}

impl LearningStable {
    pub fn new(params: LearningParams) -> Self {
        Self::with_quality(QTable::new(), params)
    }
    pub fn with_quality(quality: QTable, params: LearningParams) -> Self {
        LearningStable {
            quality: Rc::new(RefCell::new(quality)),
            params,
        }
    }
    pub fn params(&self) -> &LearningParams {
        &self.params
    }
    pub fn set_threshold(&mut self, threshold: f32) {
        self.params.threshold = threshold;
    }
    pub fn quality(&self) -> Rc<RefCell<QTable>> {
        Rc::clone(&self.quality)
    }
    pub fn quality_len(&self) -> usize {
        self.quality.borrow().len()
    }
}

impl Stable for LearningStable {
    fn player(&self, mark: Marks) -> Box<dyn Player> {
        Box::new(LearningPlayer::new(mark, self.quality(), self.params))
    }
    fn table_len(&self) -> Option<usize> {
        Some(self.quality_len())
    }
}
