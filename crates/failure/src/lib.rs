//! Pluggable per-node failure models.
//!
//! A [`FailureModel`] decides, once per tick, whether its node can currently
//! send or receive messages. Three variants exist:
//!
//! - **None**: the node is always able to communicate
//! - **Network**: the node's transport is silently blocked for a sampled
//!   duration while its algorithm keeps running
//! - **Crash**: like Network, but the node's algorithm is suspended too
//!   (the orchestrator skips its tick phases)
//!
//! The model is a tagged enum rather than a trait hierarchy: the full set of
//! variants is known, and the orchestrator needs to ask crash-specific
//! questions (`is_crashed`) without downcasting.
//!
//! Every model owns its own RNG, seeded from `(global_seed, uid)` through a
//! SplitMix64 avalanche, so a node's failure trace is identical across runs
//! with the same seed regardless of what any other node does.

mod config;
mod model;

pub use config::{ConfigError, FailureConfig, FailureKind};
pub use model::FailureModel;

use bullysim_types::NodeUid;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Mix a global seed with a per-node id into an independent 64-bit seed.
///
/// SplitMix64 finalizer: full avalanche, so adjacent uids produce unrelated
/// streams.
pub fn mix64(base: u64, id: u64) -> u64 {
    let mut x = base ^ id.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 31;
    x
}

/// Deterministic per-node RNG stream for `(global_seed, uid)`.
pub fn node_rng(seed: u64, uid: NodeUid) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(mix64(seed, uid as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn mix64_is_deterministic() {
        assert_eq!(mix64(12345, 1), mix64(12345, 1));
    }

    #[test]
    fn mix64_separates_adjacent_ids() {
        let a = mix64(12345, 1);
        let b = mix64(12345, 2);
        assert_ne!(a, b);
        // A single-bit id change should flip roughly half the output bits.
        assert!((a ^ b).count_ones() > 16);
    }

    #[test]
    fn node_rng_streams_are_independent_and_reproducible() {
        let mut a1 = node_rng(42, 1);
        let mut a2 = node_rng(42, 1);
        let mut b = node_rng(42, 2);

        let draws_a1: Vec<u64> = (0..8).map(|_| a1.gen()).collect();
        let draws_a2: Vec<u64> = (0..8).map(|_| a2.gen()).collect();
        let draws_b: Vec<u64> = (0..8).map(|_| b.gen()).collect();

        assert_eq!(draws_a1, draws_a2);
        assert_ne!(draws_a1, draws_b);
    }
}
