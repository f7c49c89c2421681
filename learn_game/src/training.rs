use crate::config::RewardScheme;
use crate::outcome::OutcomeCache;
use crate::players::{Marks, Player, Stable};
use crate::{Game, MatchState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;

/// Finished matches, counted per stable rather than per mark.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Tally {
    pub draws: usize,
    pub first: usize,
    pub second: usize,
}

impl Tally {
    /// Records a finished match in which the first stable played `first_mark`.
    pub fn record(&mut self, state: MatchState, first_mark: Marks) {
        match state.winner() {
            None => self.draws += 1,
            Some(mark) if mark == first_mark => self.first += 1,
            Some(_) => self.second += 1,
        }
    }
    pub fn games(&self) -> usize {
        self.draws + self.first + self.second
    }
    /// Draw, first-stable and second-stable rates.
    pub fn rates(&self) -> (f32, f32, f32) {
        let games = self.games().max(1) as f32;
        (
            self.draws as f32 / games,
            self.first as f32 / games,
            self.second as f32 / games,
        )
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (draws, first, second) = self.rates();
        write!(f, "draw {draws:.3}  first {first:.3}  second {second:.3}")
    }
}

/// Everything a training run shares between its matches apart from the
/// stables themselves.
#[derive(Debug)]
pub struct Arena {
    cache: OutcomeCache,
    rewards: RewardScheme,
    rng: StdRng,
}

impl Arena {
    pub fn new(rewards: RewardScheme, seed: u64) -> Self {
        Arena {
            cache: OutcomeCache::new(),
            rewards,
            rng: StdRng::seed_from_u64(seed),
        }
    }
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
    pub fn battle(&mut self, nought: &mut dyn Player, cross: &mut dyn Player) -> MatchState {
        Game::new(&mut self.cache, &self.rewards).play(nought, cross, &mut self.rng)
    }
    /// Plays `games` rounds of two matches each, `a` taking noughts in the
    /// first match and crosses in the second.
    pub fn run_series(
        &mut self,
        a: &dyn Stable,
        b: &dyn Stable,
        games: usize,
        report_every: usize,
    ) -> Tally {
        let mut tally = Tally::default();
        for game in 1..=games {
            for a_mark in [Marks::Nought, Marks::Cross] {
                let mut player_a = a.player(a_mark);
                let mut player_b = b.player(a_mark.other());
                let state = if a_mark == Marks::Nought {
                    self.battle(player_a.as_mut(), player_b.as_mut())
                } else {
                    self.battle(player_b.as_mut(), player_a.as_mut())
                };
                tally.record(state, a_mark);
            }
            if report_every > 0 && game % report_every == 0 {
                log::info!(
                    "{:<8}{:<10}{}  table {:?}/{:?}  cache {}",
                    "games",
                    game,
                    tally,
                    a.table_len(),
                    b.table_len(),
                    self.cache.len()
                );
            }
        }
        tally
    }
}
