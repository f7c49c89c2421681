use learn_game::config::TrainingConfig;
use std::path::Path;

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = match std::env::var_os("LEARN_GAME_CONFIG") {
        Some(path) => TrainingConfig::from_json_file(Path::new(&path))?,
        None => TrainingConfig::default(),
    };
    let (team, evaluation) = learn_game::train_rl_agent(&config)?;
    log::info!(
        "{:<32}{} states, {} games vs random: {}",
        "learned",
        team.quality_len(),
        evaluation.games(),
        evaluation
    );
    Ok(())
}
