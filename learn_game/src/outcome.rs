use std::collections::HashMap;

/// Memoised line checks, keyed by the magnitude of a board encoding.
///
/// A board and its mark-swapped mirror have opposite encodings, so one entry
/// serves both. The stored value carries the sign of whichever of the two was
/// evaluated first; `Board::winner` undoes it.
#[derive(Debug, Default)]
pub struct OutcomeCache {
    outcomes: HashMap<u32, i8>,
}

impl OutcomeCache {
    pub fn new() -> Self {
        OutcomeCache {
            outcomes: HashMap::with_capacity(10_000),
        }
    }

    pub fn get_or_compute<F>(&mut self, magnitude: u32, compute: F) -> i8
    where
        F: FnOnce() -> i8,
    {
        *self.outcomes.entry(magnitude).or_insert_with(compute)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
