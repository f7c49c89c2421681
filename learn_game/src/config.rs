use crate::players::Marks;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const NUM_EPISODES: usize = 10_000_usize;

/// How a learning player picks its move when it does not exploit.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exploration {
    /// Uniform over the empty squares.
    #[default]
    EmptyCells,
    /// Uniform over all nine squares. Kept for compatibility runs; taken
    /// squares end the match as an illegal move.
    AnyCell,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningParams {
    pub alpha: f32,
    pub discount: f32,
    /// Probability of exploiting the best known move.
    pub threshold: f32,
    pub exploration: Exploration,
}

impl Default for LearningParams {
    fn default() -> Self {
        LearningParams {
            alpha: 0.01,
            discount: 1.0,
            threshold: 0.7,
            exploration: Exploration::EmptyCells,
        }
    }
}

/// Rewards handed out by the match driver after each move.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardScheme {
    pub win: f32,
    pub loss: f32,
    pub draw: f32,
    /// Non-terminal reward for the player who just moved.
    pub step_mover: f32,
    /// Non-terminal reward for the player waiting for its turn.
    pub step_waiter: f32,
    /// Added straight onto the offending entry after a refused move.
    pub illegal_penalty: f32,
}

impl Default for RewardScheme {
    fn default() -> Self {
        RewardScheme {
            win: 1.0,
            loss: -1.0,
            draw: 0.0,
            step_mover: 0.0,
            step_waiter: 0.0,
            illegal_penalty: -100.0,
        }
    }
}

impl RewardScheme {
    pub fn draw_averse() -> Self {
        RewardScheme {
            draw: -0.5,
            ..Self::default()
        }
    }
    pub fn shaped() -> Self {
        RewardScheme {
            step_mover: 0.1,
            step_waiter: -0.1,
            ..Self::default()
        }
    }
    pub fn outcome(&self, mark: Marks, winner: Marks) -> f32 {
        if mark == winner {
            self.win
        } else {
            self.loss
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opponent {
    Random,
    #[default]
    SelfPlay,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub games: usize,
    pub evaluation_games: usize,
    pub report_every: usize,
    pub seed: u64,
    pub opponent: Opponent,
    pub learning: LearningParams,
    pub rewards: RewardScheme,
    /// Directory for the learned table; nothing is written when unset.
    pub archive: Option<PathBuf>,
    /// Archived table (`.json` or `.pickle`) to continue training from.
    pub resume: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            games: NUM_EPISODES,
            evaluation_games: NUM_EPISODES,
            report_every: 1_000,
            seed: 42,
            opponent: Opponent::SelfPlay,
            learning: LearningParams::default(),
            rewards: RewardScheme::default(),
            archive: Some(PathBuf::from("./q_table_archive/")),
            resume: None,
        }
    }
}

impl TrainingConfig {
    /// Reads a JSON file; missing fields fall back to the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, anyhow::Error> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let config: TrainingConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }
}
