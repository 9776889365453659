//! Failure model configuration.

use bullysim_types::Tick;
use serde::Deserialize;
use thiserror::Error;

/// Which failure variant to instantiate for every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// No failures; every node communicates every tick.
    None,
    /// Transport isolation: the algorithm keeps running, messages do not.
    #[default]
    Network,
    /// Full stop: transport blocked and the algorithm suspended.
    Crash,
}

/// Errors detected when building a [`FailureModel`](crate::FailureModel).
///
/// The model's per-tick operations are total; everything that can go wrong
/// is rejected here, at construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("offline_durations ({durations}) and offline_weights ({weights}) must be the same nonzero length")]
    MismatchedDurations { durations: usize, weights: usize },

    #[error("invalid offline_weights: {0}")]
    InvalidWeights(String),
}

/// Parameters for the Network and Crash variants.
///
/// `p_fail` is the per-tick Bernoulli probability of entering isolation,
/// scaled by `leader_fail_multiplier` while the node believes it is leader.
/// On entry, the isolation length is drawn from the categorical distribution
/// over `offline_durations` weighted by `offline_weights`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    #[serde(rename = "type")]
    pub kind: FailureKind,
    pub p_fail: f64,
    pub leader_fail_multiplier: f64,
    pub offline_durations: Vec<Tick>,
    pub offline_weights: Vec<u32>,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            kind: FailureKind::default(),
            p_fail: 0.02,
            leader_fail_multiplier: 2.0,
            offline_durations: vec![1, 2, 3, 5],
            offline_weights: vec![70, 20, 7, 3],
        }
    }
}

impl FailureConfig {
    /// Probability of entering isolation this tick, out-of-range values
    /// clamped.
    pub(crate) fn isolation_probability(&self, is_leader: bool) -> f64 {
        let p = if is_leader {
            self.p_fail * self.leader_fail_multiplier
        } else {
            self.p_fail
        };
        p.clamp(0.0, 1.0)
    }

    /// Check the duration/weight lists the categorical draw depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kind == FailureKind::None {
            return Ok(());
        }
        if self.offline_durations.is_empty()
            || self.offline_durations.len() != self.offline_weights.len()
        {
            return Err(ConfigError::MismatchedDurations {
                durations: self.offline_durations.len(),
                weights: self.offline_weights.len(),
            });
        }
        Ok(())
    }
}
