//! bullysim CLI
//!
//! Run a deterministic Bully leader-election simulation from a JSON config.
//!
//! # Example
//!
//! ```bash
//! # Run with a config file
//! bullysim --config config.json
//!
//! # Quick ad-hoc run: defaults plus overrides
//! bullysim --nodes 5 --ticks 200 --seed 42
//! ```

use bullysim_simulation::{SimulationConfig, SimulationRunner};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Bully algorithm simulator
///
/// Simulates N nodes electing and maintaining a leader over an unreliable
/// transport. Reproducible: the same config and seed produce byte-identical
/// logs.
#[derive(Parser, Debug)]
#[command(name = "bullysim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the number of nodes from the config
    #[arg(long)]
    nodes: Option<u32>,

    /// Override the number of ticks from the config
    #[arg(long)]
    ticks: Option<i64>,

    /// Override the seed from the config
    #[arg(long)]
    seed: Option<u64>,
}

/// Load the configuration, falling back to defaults on any problem.
///
/// Warnings go straight to stderr: this runs before the tracing subscriber
/// is up, because the config itself selects the default verbosity.
fn load_config(path: &Path) -> SimulationConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!(
                "Warning: could not open config file '{}' ({e}), using defaults",
                path.display()
            );
            return SimulationConfig::default();
        }
    };
    match serde_json::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: could not parse config file '{}' ({e}), using defaults",
                path.display()
            );
            SimulationConfig::default()
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = load_config(&args.config);
    if let Some(nodes) = args.nodes {
        config.simulation.num_nodes = nodes;
    }
    if let Some(ticks) = args.ticks {
        config.simulation.num_ticks = ticks;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }

    let default_filter = if config.logging.verbose {
        "info,bullysim_node=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    info!(
        config = %args.config.display(),
        nodes = config.simulation.num_nodes,
        ticks = config.simulation.num_ticks,
        seed = config.simulation.seed,
        "bullysim starting"
    );

    let runner = match SimulationRunner::new(config) {
        Ok(runner) => runner,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runner.run() {
        Ok(stats) => {
            info!(
                ticks_run = stats.ticks_run,
                messages_sent = stats.messages_sent,
                messages_dropped = stats.messages_dropped,
                delivery_rate = stats.delivery_rate(),
                "simulation complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("simulation failed: {e}");
            ExitCode::FAILURE
        }
    }
}
