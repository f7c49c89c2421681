use crate::board::Board;
use crate::config::{Opponent, RewardScheme, TrainingConfig};
use crate::outcome::OutcomeCache;
use crate::players::{LearningStable, Marks, Player, RandomPlayer, RandomStable};
use crate::q_table::QTable;
use crate::training::{Arena, Tally};
use rand::rngs::StdRng;

pub mod board;
pub mod config;
pub mod error;
pub mod outcome;
pub mod players;
pub mod q_table;
pub mod training;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchState {
    InProgress,
    Won(Marks),
    Drawn,
    /// `offender` tried to play a refused move; its opponent takes the match.
    Aborted { offender: Marks },
}

impl MatchState {
    pub fn winner(self) -> Option<Marks> {
        match self {
            MatchState::Won(mark) => Some(mark),
            MatchState::Aborted { offender } => Some(offender.other()),
            MatchState::InProgress | MatchState::Drawn => None,
        }
    }
    pub fn is_over(self) -> bool {
        self != MatchState::InProgress
    }
}

/// One match on one board. Noughts always move first.
pub struct Game<'a> {
    pub board: Board,
    cache: &'a mut OutcomeCache,
    rewards: &'a RewardScheme,
    state: MatchState,
}

impl<'a> Game<'a> {
    pub fn new(cache: &'a mut OutcomeCache, rewards: &'a RewardScheme) -> Self {
        Self::from_board(Board::new(), cache, rewards)
    }
    pub fn from_board(board: Board, cache: &'a mut OutcomeCache, rewards: &'a RewardScheme) -> Self {
        Game {
            board,
            cache,
            rewards,
            state: MatchState::InProgress,
        }
    }
    pub fn state(&self) -> MatchState {
        self.state
    }
    /// Lets `mover` play one move and hands both players their reward.
    pub fn step(
        &mut self,
        mover: &mut dyn Player,
        waiter: &mut dyn Player,
        rng: &mut StdRng,
    ) -> MatchState {
        if self.state.is_over() {
            return self.state;
        }
        let mark = mover.mark();
        let mv = mover.choose_move(&self.board, rng);
        if let Err(err) = self.board.place(mv, mark) {
            log::warn!("{mark} forfeits: {err}");
            mover.fatal(self.rewards.illegal_penalty);
            self.state = MatchState::Aborted { offender: mark };
            return self.state;
        }
        self.state = match self.board.winner(self.cache) {
            Some(winner) => {
                mover.feedback(self.rewards.outcome(mover.mark(), winner), &self.board);
                waiter.feedback(self.rewards.outcome(waiter.mark(), winner), &self.board);
                MatchState::Won(winner)
            }
            None if self.board.is_full() => {
                // the filling move is still a step before it is a draw
                mover.feedback(self.rewards.step_mover, &self.board);
                waiter.feedback(self.rewards.step_waiter, &self.board);
                mover.feedback(self.rewards.draw, &self.board);
                waiter.feedback(self.rewards.draw, &self.board);
                MatchState::Drawn
            }
            None => {
                mover.feedback(self.rewards.step_mover, &self.board);
                waiter.feedback(self.rewards.step_waiter, &self.board);
                MatchState::InProgress
            }
        };
        self.state
    }
    pub fn play(
        &mut self,
        nought: &mut dyn Player,
        cross: &mut dyn Player,
        rng: &mut StdRng,
    ) -> MatchState {
        assert_eq!(nought.mark(), Marks::Nought, "the first player must play noughts");
        assert_eq!(cross.mark(), Marks::Cross, "the second player must play crosses");
        while !self.state.is_over() {
            if self.board.filled() % 2 == 0 {
                self.step(nought, cross, rng);
            } else {
                self.step(cross, nought, rng);
            }
        }
        log::trace!("{:?}\n{}", self.state, self.board);
        self.state
    }
}

/// Trains a learning stable against the configured opponent, then replays the
/// same pairing with exploration switched off.
pub fn train_rl_agent(config: &TrainingConfig) -> Result<(LearningStable, Tally), anyhow::Error> {
    let mut arena = Arena::new(config.rewards, config.seed);
    let quality = match &config.resume {
        Some(path) => {
            let q = q_table::q_table_from_disk(path)?;
            log::info!("{:<32}{} ({} states)", "resuming from", path.display(), q.len());
            q
        }
        None => QTable::new(),
    };
    let mut team_a = LearningStable::with_quality(quality, config.learning);
    log::info!("{:<32}{:?}", "training against", config.opponent);
    let tally = run_against(&mut arena, &team_a, config.opponent, config.games, config.report_every);
    log::info!(
        "training done: {}  table {}  cache {}",
        tally,
        team_a.quality_len(),
        arena.cache_len()
    );

    team_a.set_threshold(1.0);
    let evaluation = run_against(
        &mut arena,
        &team_a,
        config.opponent,
        config.evaluation_games,
        config.report_every,
    );
    log::info!("evaluation vs {:?}: {}", config.opponent, evaluation);

    if let Some(path) = &config.archive {
        q_table::q_table_to_disk(path, &team_a.quality().borrow())?;
    }
    Ok((team_a, evaluation))
}

fn run_against(
    arena: &mut Arena,
    team: &LearningStable,
    opponent: Opponent,
    games: usize,
    report_every: usize,
) -> Tally {
    match opponent {
        Opponent::SelfPlay => arena.run_series(team, team, games, report_every),
        Opponent::Random => arena.run_series(team, &RandomStable, games, report_every),
    }
}

/// Seeded random-versus-random matches, used to pin down move sequencing.
pub fn play_random_baseline(seed: u64, games: usize) -> Vec<MatchState> {
    let mut arena = Arena::new(RewardScheme::default(), seed);
    (0..games)
        .map(|_| {
            let mut nought = RandomPlayer::new(Marks::Nought);
            let mut cross = RandomPlayer::new(Marks::Cross);
            arena.battle(&mut nought, &mut cross)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::config::LearningParams;
    use crate::players::{LearningPlayer, Stable};
    use rand::SeedableRng;

    #[derive(Debug)]
    struct ScriptedPlayer {
        mark: Marks,
        moves: Vec<Position>,
        rewards: Vec<f32>,
        penalties: Vec<f32>,
    }

    impl ScriptedPlayer {
        fn new(mark: Marks, mut moves: Vec<Position>) -> Self {
            moves.reverse();
            ScriptedPlayer {
                mark,
                moves,
                rewards: vec![],
                penalties: vec![],
            }
        }
    }

    impl Player for ScriptedPlayer {
        fn mark(&self) -> Marks {
            self.mark
        }
        fn choose_move(&mut self, _board: &Board, _rng: &mut StdRng) -> Position {
            self.moves.pop().expect("script ran out of moves")
        }
        fn feedback(&mut self, reward: f32, _board: &Board) {
            self.rewards.push(reward);
        }
        fn fatal(&mut self, penalty: f32) {
            self.penalties.push(penalty);
        }
    }

    #[test]
    fn is_win_rewarded() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut cache = OutcomeCache::new();
        let rewards = RewardScheme::shaped();
        let mut nought = ScriptedPlayer::new(Marks::Nought, vec![(0, 0), (0, 1), (0, 2)]);
        let mut cross = ScriptedPlayer::new(Marks::Cross, vec![(1, 0), (1, 1)]);
        let state = Game::new(&mut cache, &rewards).play(&mut nought, &mut cross, &mut rng);
        assert_eq!(state, MatchState::Won(Marks::Nought));
        assert_eq!(state.winner(), Some(Marks::Nought));
        assert_eq!(nought.rewards, vec![0.1, -0.1, 0.1, -0.1, 1.0]);
        assert_eq!(cross.rewards, vec![-0.1, 0.1, -0.1, 0.1, -1.0]);
        assert!(nought.penalties.is_empty() && cross.penalties.is_empty());
    }

    #[test]
    fn is_draw_rewarded() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut cache = OutcomeCache::new();
        let rewards = RewardScheme {
            draw: -0.5,
            ..RewardScheme::shaped()
        };
        let mut nought = ScriptedPlayer::new(
            Marks::Nought,
            vec![(0, 0), (0, 2), (1, 0), (2, 1), (2, 2)],
        );
        let mut cross = ScriptedPlayer::new(Marks::Cross, vec![(0, 1), (1, 1), (2, 0), (1, 2)]);
        let mut game = Game::new(&mut cache, &rewards);
        let state = game.play(&mut nought, &mut cross, &mut rng);
        assert_eq!(state, MatchState::Drawn);
        assert!(game.board.is_full());
        assert_eq!(state.winner(), None);
        // nine step rewards, then the draw
        assert_eq!(nought.rewards.len(), 10);
        assert_eq!(cross.rewards.len(), 10);
        assert_eq!(nought.rewards[8..], [0.1_f32, -0.5]);
        assert_eq!(cross.rewards[8..], [-0.1_f32, -0.5]);
        assert_eq!(nought.rewards[..2], [0.1_f32, -0.1]);
    }

    #[test]
    fn is_illegal_move_ending_match_in_one_step() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut cache = OutcomeCache::new();
        let rewards = RewardScheme::default();
        let stable = LearningStable::new(LearningParams {
            threshold: 1.0,
            ..LearningParams::default()
        });
        let board = Board::from_placements([((0, 0), Marks::Nought)]).unwrap();
        let mut nought = ScriptedPlayer::new(Marks::Nought, vec![]);
        let mut cross = LearningPlayer::new(Marks::Cross, stable.quality(), *stable.params());
        let mut game = Game::from_board(board, &mut cache, &rewards);

        // an untrained table exploits the first square, which is taken
        let state = game.step(&mut cross, &mut nought, &mut rng);
        assert_eq!(state, MatchState::Aborted { offender: Marks::Cross });
        assert_eq!(state.winner(), Some(Marks::Nought));
        assert_eq!(game.state(), state);
        assert_eq!(game.board.filled(), 1);
        assert_eq!(cross.last_action(), Some(((Marks::Cross, 1), (0, 0))));
        let quality = stable.quality();
        assert_eq!(quality.borrow().get(&(Marks::Cross, 1)).unwrap()[(0, 0)], -100.0);
        assert!(nought.rewards.is_empty());

        // a finished game does not move again
        assert_eq!(game.step(&mut nought, &mut cross, &mut rng), state);
    }

    #[test]
    fn is_scripted_illegal_move_penalised() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut cache = OutcomeCache::new();
        let rewards = RewardScheme::default();
        let mut nought = ScriptedPlayer::new(Marks::Nought, vec![(1, 1), (1, 1)]);
        let mut cross = ScriptedPlayer::new(Marks::Cross, vec![(0, 0)]);
        let state = Game::new(&mut cache, &rewards).play(&mut nought, &mut cross, &mut rng);
        assert_eq!(state, MatchState::Aborted { offender: Marks::Nought });
        assert_eq!(nought.penalties, vec![-100.0]);
        assert!(cross.penalties.is_empty());
    }

    #[test]
    fn is_self_play_sharing_one_table() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut cache = OutcomeCache::new();
        let rewards = RewardScheme::default();
        let stable = LearningStable::new(LearningParams::default());
        let mut nought = stable.player(Marks::Nought);
        let mut cross = stable.player(Marks::Cross);
        let state =
            Game::new(&mut cache, &rewards).play(nought.as_mut(), cross.as_mut(), &mut rng);
        assert!(state.is_over());
        let quality = stable.quality();
        let quality = quality.borrow();
        assert!(quality.contains_key(&(Marks::Nought, 0)));
        assert!(quality.keys().any(|(mark, _)| *mark == Marks::Cross));
    }

    #[test]
    fn is_random_baseline_reproducible() {
        use MatchState::{Drawn, Won};
        let expected = vec![
            Drawn,
            Won(Marks::Nought),
            Drawn,
            Won(Marks::Cross),
            Won(Marks::Nought),
            Won(Marks::Nought),
            Won(Marks::Nought),
            Won(Marks::Nought),
            Won(Marks::Nought),
            Won(Marks::Cross),
        ];
        assert_eq!(play_random_baseline(42, 10), expected);
    }

    #[test]
    fn is_training_working() {
        let config = TrainingConfig {
            games: 200,
            evaluation_games: 50,
            report_every: 100,
            archive: None,
            ..TrainingConfig::default()
        };
        let (team, evaluation) = train_rl_agent(&config).unwrap();
        assert_eq!(evaluation.games(), 100);
        assert_eq!(team.params().threshold, 1.0);
        assert!(team.quality_len() > 0);
    }

    #[test]
    fn is_training_resumed_from_archive() {
        let mut quality = QTable::new();
        quality.entry_or_default((Marks::Nought, 0))[(1, 1)] = 0.5;
        quality.entry_or_default((Marks::Cross, 1))[(0, 0)] = 0.25;
        let path = std::env::temp_dir().join("learn_game_resume_archive");
        let (_, q_pickle) = q_table::q_table_to_disk(&path, &quality).unwrap();
        let config = TrainingConfig {
            games: 0,
            evaluation_games: 0,
            archive: None,
            resume: Some(q_pickle),
            ..TrainingConfig::default()
        };
        let (team, evaluation) = train_rl_agent(&config).unwrap();
        assert_eq!(evaluation.games(), 0);
        assert_eq!(team.quality_len(), 2);
        let resumed = team.quality();
        assert_eq!(resumed.borrow().max_value(&(Marks::Nought, 0)), 0.5);
    }

    #[test]
    fn is_missing_resume_file_reported() {
        let config = TrainingConfig {
            archive: None,
            resume: Some(std::env::temp_dir().join("learn_game_no_such_table.json")),
            ..TrainingConfig::default()
        };
        assert!(train_rl_agent(&config).is_err());
    }
}
