//! Headless Big Two simulator.
//!
//! Plays whole games through the engine's state manager with every seat
//! automated and reports who won.

mod sim;

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Error};
use big_two::{
    BotAi, GameConfig, GameStateManager, MemoryStore, StateStore,
    table::{BotDifficulty, EngineSettings, FileStore},
};
use ctrlc::set_handler;
use log::{info, warn};
use pico_args::Arguments;

use sim::Tally;

const HELP: &str = "\
Simulate Big Two games between bots

USAGE:
  bt_sim [OPTIONS]

OPTIONS:
  --games        N        Number of games to play              [default: 1]
  --difficulty   LEVEL    Bot difficulty: easy, medium, hard    [default: env BIG_TWO_BOT_DIFFICULTY or medium]
  --bots         N        Bot seats (1-3); the rest use the autopilot  [default: 3]
  --seed         N        Seed for the first game; later games add their index
  --score-limit  N        Score that ends a game                [default: env BIG_TWO_SCORE_LIMIT or 101]
  --save-dir     DIR      Persist snapshots as JSON files in DIR

FLAGS:
  -h, --help              Print help information

ENVIRONMENT:
  BIG_TWO_AUTO_PASS_MS    Auto-pass countdown length in milliseconds
  BIG_TWO_TICK_MS         Countdown tick period in milliseconds
  BIG_TWO_SCORE_LIMIT     Score that ends a game
  BIG_TWO_STORAGE_KEY     Snapshot key in the state store
  RUST_LOG                Log filter [default: info]
";

struct Args {
    games: u32,
    difficulty: BotDifficulty,
    bots: u8,
    seed: Option<u64>,
    score_limit: Option<u32>,
    save_dir: Option<PathBuf>,
}

fn parse_args(mut pargs: Arguments) -> Result<Args, Error> {
    let difficulty = match pargs.opt_value_from_str::<_, String>("--difficulty")? {
        Some(level) => level,
        None => std::env::var("BIG_TWO_BOT_DIFFICULTY").unwrap_or_else(|_| "medium".to_string()),
    };
    let args = Args {
        games: pargs.opt_value_from_str("--games")?.unwrap_or(1),
        difficulty: difficulty.parse().map_err(Error::msg)?,
        bots: pargs.opt_value_from_str("--bots")?.unwrap_or(3),
        seed: pargs.opt_value_from_str("--seed")?,
        score_limit: pargs.opt_value_from_str("--score-limit")?,
        save_dir: pargs.opt_value_from_str("--save-dir")?,
    };

    let rest = pargs.finish();
    if !rest.is_empty() {
        anyhow::bail!("Unexpected arguments: {rest:?}");
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }
    let args = parse_args(pargs)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    // The first interrupt stops the run after the current action.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }

    let mut settings = EngineSettings::from_env().context("Invalid engine settings")?;
    if let Some(score_limit) = args.score_limit {
        settings.score_limit = score_limit;
        settings.validate().context("Invalid score limit")?;
    }

    let store: Arc<dyn StateStore> = match &args.save_dir {
        Some(dir) => {
            info!("Persisting snapshots under {}", dir.display());
            Arc::new(FileStore::new(dir))
        }
        None => Arc::new(MemoryStore::new()),
    };
    let manager = GameStateManager::new(store, settings);

    info!(
        "Simulating {} game(s) with {} {} bots, score limit {}",
        args.games,
        args.bots,
        args.difficulty,
        manager.settings().score_limit
    );

    let mut tally = Tally::default();
    for game in 0..args.games {
        let seed = args.seed.map(|seed| seed.wrapping_add(u64::from(game)));
        let config = GameConfig {
            player_name: "Autopilot".to_string(),
            bot_count: args.bots,
            bot_difficulty: args.difficulty,
            seed,
        };
        manager.initialize_game(config).await?;
        let mut autopilot = match seed {
            Some(seed) => BotAi::with_seed(args.difficulty, seed),
            None => BotAi::new(args.difficulty),
        };

        match sim::play_game(&manager, &mut autopilot, &stop).await? {
            Some(summary) => {
                info!(
                    "Game {} won by {} after {} matches, scores {:?}",
                    game + 1,
                    summary.winner_id,
                    summary.matches,
                    summary.scores
                );
                tally.record(&summary);
            }
            None => {
                warn!("Interrupted during game {}", game + 1);
                break;
            }
        }
    }
    manager.destroy();

    for (player_id, wins) in &tally.wins {
        info!("{player_id}: {wins}/{} wins", tally.games);
    }
    Ok(())
}
