use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use game_2048::{console, Engine, Store};
use rand::{rngs::StdRng, SeedableRng};

#[derive(Debug, Parser)]
#[command(name = "game-2048", version, about = "Play 2048 in the terminal")]
struct Cli {
    /// Directory holding highscore.bin and game_state.bin
    #[arg(long, env = "GAME2048_DATA_DIR", default_value = ".", value_name = "DIR")]
    data_dir: PathBuf,

    /// Seed for tile spawns (random when omitted)
    #[arg(long, value_name = "N")]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("creating data directory {}", cli.data_dir.display()))?;
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut engine = Engine::with_rng(Store::new(&cli.data_dir), rng);

    let stdin = io::stdin();
    console::run(&mut engine, stdin.lock(), io::stdout().lock())?;
    Ok(())
}
