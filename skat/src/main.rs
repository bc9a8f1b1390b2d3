use clap::Parser;
use skat_core::{Phase, SimpleGame, View};
use skat_dds::{Position, SearchMode, Solver, SolverConfig, SolverError, INF};
use skat_parser::{deserialize_game, DeserializationError};
use skat_player::{Player, PlayerConfig, PlayerError, SearchPlayer};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skat")]
#[command(about = "Replay a serialized Skat game and compute the next move", long_about = None)]
struct Args {
    /// Serialized SimpleGame
    file: PathBuf,

    /// Worlds sampled per card decision
    #[arg(short = 'w', long = "worlds", default_value = "20")]
    worlds: usize,

    /// Random seed for world sampling (defaults to current time)
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Worker threads (0 = number of CPUs)
    #[arg(short = 't', long = "threads", default_value = "0")]
    threads: usize,

    /// Search nodes between interrupt checks
    #[arg(long = "poll-interval", default_value = "4096")]
    poll_interval: u64,

    /// Stop searching after this many milliseconds
    #[arg(short = 'b', long = "budget-ms")]
    budget_ms: Option<u64>,

    /// Print the double-dummy value of a world view game instead
    #[arg(long = "dds")]
    dds: bool,

    /// Debug logging on stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad game file: {0}")]
    Parse(#[from] DeserializationError),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("--dds needs a world view game in card play, got {view:?} in {phase:?}")]
    NotSolvable { view: View, phase: Phase },
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&args.file).map_err(|source| CliError::Io {
        path: args.file.clone(),
        source,
    })?;
    let game = deserialize_game(&text)?;
    info!(moves = game.num_moves(), view = ?game.view(), "loaded game");

    // Use provided seed or default to current time (microsecond resolution)
    let seed = args.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    });
    let solver = SolverConfig {
        poll_interval: args.poll_interval,
        seed,
        num_threads: args.threads,
        ..SolverConfig::default()
    };

    if args.dds {
        return print_dds(&game, solver);
    }

    let mut player = SearchPlayer::new(PlayerConfig {
        worlds: args.worlds,
        seed,
        solver,
    });
    for i in 0..game.num_moves() {
        player.game_change(&game, Some(i))?;
    }
    let budget = args.budget_ms.map(Duration::from_millis);
    let token = player.compute_move(&game, budget)?;
    println!("move = {}", token);
    Ok(())
}

fn print_dds(game: &SimpleGame, config: SolverConfig) -> Result<(), CliError> {
    let state = game.current_state();
    if state.view != View::World || state.phase != Phase::Cardplay {
        return Err(CliError::NotSolvable {
            view: state.view,
            phase: state.phase,
        });
    }
    let position = Position::from_state(state)?;
    let result = Solver::new(config).dds(&position, -INF, INF, true, SearchMode::Normal)?;
    let declarer = result.for_declarer();
    println!(
        "dds = {} ({:?}, {} nodes)",
        declarer.value, declarer.bound, declarer.nodes
    );
    Ok(())
}
