//! Drone Arena CLI
//!
//! Runs the actor group against the wall clock. Keys come from stdin (or a
//! `--keys` script); the world is logged periodically.

use anyhow::Context;
use clap::Parser;
use drone_core::{SimParams, WatchdogConfig};
use drone_env::TokioContext;
use drone_sim::{
    ArenaSystem, CoordinatorConfig, GeneratorConfig, InputSource, LogRenderer, SystemConfig,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Drone arena simulation
#[derive(Parser, Debug)]
#[command(name = "drone-sim")]
#[command(about = "Fly a drone around an arena of obstacles and targets", long_about = None)]
struct Args {
    /// Parameter file (JSON); missing file means built-in defaults
    #[arg(short, long, default_value = "params.json")]
    params: PathBuf,

    /// Master seed for the generators (0 = random from the OS)
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Seconds of silence before a peer is warned
    #[arg(long, default_value = "5")]
    warn_secs: u64,

    /// Seconds of silence before the whole group is shut down
    #[arg(long, default_value = "10")]
    kill_secs: u64,

    /// Fold wall repulsion into the commanded force
    #[arg(long)]
    wall_repulsion: bool,

    /// Disable obstacle repulsion
    #[arg(long)]
    no_obstacle_repulsion: bool,

    /// Play these keys instead of reading stdin
    #[arg(short, long)]
    keys: Option<String>,

    /// Delay between scripted keys
    #[arg(long, default_value = "200")]
    key_interval_ms: u64,

    /// Log a world line every N frames
    #[arg(long, default_value = "20")]
    log_every: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn load_params(path: &Path) -> anyhow::Result<SimParams> {
    let params = match SimParams::load(path) {
        Ok(params) => params,
        Err(e) => {
            error!(path = %path.display(), error = %e, "unusable parameter file; using defaults");
            SimParams::default()
        }
    };
    params.validate().context("invalid simulation parameters")?;
    Ok(params)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays free for --json
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let params = load_params(&args.params)?;
    let watchdog = WatchdogConfig::from_secs(args.warn_secs, args.kill_secs)?;
    let config = SystemConfig {
        params,
        coordinator: CoordinatorConfig {
            wall_repulsion: args.wall_repulsion,
            obstacle_repulsion: !args.no_obstacle_repulsion,
        },
        watchdog,
        generators: GeneratorConfig::default(),
        link_capacity: 0,
    };

    let input = match args.keys {
        Some(keys) => InputSource::Scripted {
            keys,
            interval: Duration::from_millis(args.key_interval_ms),
        },
        None => InputSource::Stdin,
    };

    info!(
        mass = params.mass,
        visc = params.visc,
        dt = params.dt,
        force_step = params.force_step,
        world_half = params.world_half,
        seed = args.seed,
        "drone arena starting"
    );
    info!("keys: w e r / s d f / x c v to steer (d brakes), p pause, R reset, q quit");

    let ctx = TokioContext::shared(args.seed);
    let handle = ArenaSystem::launch(ctx, config, input, LogRenderer::new(args.log_every));
    let summary = handle.join().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    let code = summary.exit_code();
    if code != 0 {
        error!(culprit = ?summary.watchdog.culprit, "watchdog shut the arena down");
    } else {
        info!(score = summary.coordinator.score, "bye");
    }

    // A blocked stdin read would otherwise hold the runtime open
    std::process::exit(code);
}
