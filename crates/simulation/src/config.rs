//! Simulation configuration.
//!
//! One JSON document with four sections, every field defaulted so partial
//! configs parse:
//!
//! ```json
//! {
//!   "simulation": { "num_nodes": 5, "num_ticks": 50, "seed": 12345 },
//!   "node":       { "hb_period_ticks": 1, "hb_timeout_ticks": 3, ... },
//!   "failure":    { "type": "network", "p_fail": 0.02, ... },
//!   "logging":    { "state_log_file": "state_log.jsonl", ... }
//! }
//! ```

use bullysim_failure::FailureConfig;
use bullysim_node::NodeConfig;
use bullysim_types::Tick;
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration for one simulation run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub simulation: SimulationSettings,
    pub node: NodeConfig,
    pub failure: FailureConfig,
    pub logging: LoggingConfig,
}

/// Run shape: how many nodes, how long, and the master seed every per-node
/// stream derives from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub num_nodes: u32,
    pub num_ticks: Tick,
    pub seed: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            num_nodes: 5,
            num_ticks: 50,
            seed: 12345,
        }
    }
}

/// Observer output destinations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub state_log_file: PathBuf,
    pub message_log_file: PathBuf,
    pub debug_log_file: PathBuf,
    /// Verbose console diagnostics (selects the default trace level when
    /// `RUST_LOG` is unset; the JSONL streams are always written in full).
    pub verbose: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            state_log_file: PathBuf::from("state_log.jsonl"),
            message_log_file: PathBuf::from("message_log.jsonl"),
            debug_log_file: PathBuf::from("debug_log.jsonl"),
            verbose: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bullysim_failure::FailureKind;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: SimulationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.simulation.num_nodes, 5);
        assert_eq!(cfg.simulation.num_ticks, 50);
        assert_eq!(cfg.simulation.seed, 12345);
        assert_eq!(cfg.node.hb_timeout_ticks, 3);
        assert_eq!(cfg.failure.kind, FailureKind::Network);
        assert_eq!(cfg.logging.state_log_file, PathBuf::from("state_log.jsonl"));
        assert!(cfg.logging.verbose);
    }

    #[test]
    fn partial_sections_keep_unlisted_defaults() {
        let doc = r#"{
            "simulation": { "num_ticks": 10, "seed": 7 },
            "node": { "p_drop": 0.25 },
            "failure": { "type": "none" }
        }"#;
        let cfg: SimulationConfig = serde_json::from_str(doc).unwrap();
        assert_eq!(cfg.simulation.num_nodes, 5, "unlisted field keeps default");
        assert_eq!(cfg.simulation.num_ticks, 10);
        assert_eq!(cfg.simulation.seed, 7);
        assert_eq!(cfg.node.p_drop, 0.25);
        assert_eq!(cfg.node.hb_period_ticks, 1);
        assert_eq!(cfg.failure.kind, FailureKind::None);
    }

    #[test]
    fn full_document_round_trips() {
        let doc = r#"{
            "simulation": { "num_nodes": 3, "num_ticks": 100, "seed": 42 },
            "node": {
                "hb_period_ticks": 2,
                "hb_timeout_ticks": 6,
                "election_timeout_ticks": 4,
                "p_send": 0.5,
                "p_drop": 0.1,
                "max_recv_per_tick": 16
            },
            "failure": {
                "type": "crash",
                "p_fail": 0.05,
                "leader_fail_multiplier": 4.0,
                "offline_durations": [2, 4],
                "offline_weights": [3, 1]
            },
            "logging": {
                "state_log_file": "out/state.jsonl",
                "message_log_file": "out/messages.jsonl",
                "debug_log_file": "out/debug.jsonl",
                "verbose": false
            }
        }"#;
        let cfg: SimulationConfig = serde_json::from_str(doc).unwrap();
        assert_eq!(cfg.simulation.num_nodes, 3);
        assert_eq!(cfg.node.hb_period_ticks, 2);
        assert_eq!(cfg.node.max_recv_per_tick, 16);
        assert_eq!(cfg.failure.kind, FailureKind::Crash);
        assert_eq!(cfg.failure.offline_durations, vec![2, 4]);
        assert_eq!(cfg.logging.message_log_file, PathBuf::from("out/messages.jsonl"));
        assert!(!cfg.logging.verbose);
    }
}
