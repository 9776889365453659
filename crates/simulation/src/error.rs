//! Simulation error type.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a simulation run.
///
/// The algorithm itself never errors; everything here is detected at
/// startup (topology, failure config, log files) or is an observer I/O
/// failure surfaced when the run finishes.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid topology: num_nodes must be at least 1, got {num_nodes}")]
    InvalidTopology { num_nodes: u32 },

    #[error("invalid failure config: {0}")]
    Failure(#[from] bullysim_failure::ConfigError),

    #[error("failed to open log file {path}: {source}")]
    LogOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("log write failed: {0}")]
    LogWrite(#[from] io::Error),
}
