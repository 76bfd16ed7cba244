#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Gauntlet sessions headlessly.

mod demo;
mod simulation;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use gauntlet_system_session::SessionConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::simulation::RunOptions;

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless Gauntlet room and wave runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Simulates a run through procedurally chained rooms and prints a summary.
    Run(RunArgs),
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Number of rooms to clear before the run stops.
    #[arg(long, default_value_t = 10)]
    rooms: u64,
    /// Master seed; overrides the seed of the configuration file.
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated milliseconds per step.
    #[arg(long = "dt-ms", default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    dt_ms: u64,
    /// Milliseconds a spawned enemy survives before it is killed.
    #[arg(long = "enemy-lifetime-ms", default_value_t = 1500)]
    enemy_lifetime_ms: u64,
    /// Upper bound on simulated steps.
    #[arg(long = "max-steps", default_value_t = 100_000)]
    max_steps: u64,
    /// TOML file holding the session configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log filter; takes precedence over `RUST_LOG`.
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

/// Entry point for the Gauntlet command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        CliCommand::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    init_tracing(args.log_level.as_deref())?;

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SessionConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    info!(seed = config.seed, rooms = args.rooms, "starting run");

    let options = RunOptions {
        rooms: args.rooms,
        dt: Duration::from_millis(args.dt_ms),
        enemy_lifetime: Duration::from_millis(args.enemy_lifetime_ms),
        max_steps: args.max_steps,
    };
    let summary = simulation::simulate(config, &options)?;
    println!("{summary}");
    Ok(())
}

fn load_config(path: &Path) -> Result<SessionConfig> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&source).with_context(|| format!("failed to parse config {}", path.display()))
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).context("invalid log filter")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!(error))
}
