//! The per-node failure model.

use crate::{mix64, ConfigError, FailureConfig, FailureKind};
use bullysim_types::{NodeUid, Tick};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Per-node failure model, advanced once per tick by the orchestrator.
///
/// Network and Crash share the same isolation schedule; they differ only in
/// whether the node's algorithm keeps running while offline, which the
/// orchestrator reads through [`is_crashed`](Self::is_crashed).
#[derive(Debug)]
pub enum FailureModel {
    None,
    Network(IsolationSchedule),
    Crash(IsolationSchedule),
}

impl FailureModel {
    /// Build the model configured for `uid`.
    ///
    /// Seeded from `mix64(seed, uid)` so the failure trace of a node depends
    /// only on the global seed and its own identity.
    pub fn new(cfg: &FailureConfig, uid: NodeUid, seed: u64) -> Result<Self, ConfigError> {
        cfg.validate()?;
        match cfg.kind {
            FailureKind::None => Ok(FailureModel::None),
            FailureKind::Network => Ok(FailureModel::Network(IsolationSchedule::new(
                cfg, uid, seed,
            )?)),
            FailureKind::Crash => Ok(FailureModel::Crash(IsolationSchedule::new(cfg, uid, seed)?)),
        }
    }

    /// Advance internal state by one tick.
    pub fn advance(&mut self, tick: Tick) {
        let _ = tick;
        match self {
            FailureModel::None => {}
            FailureModel::Network(s) | FailureModel::Crash(s) => s.advance(),
        }
    }

    /// Whether the node's transport works this tick.
    pub fn can_communicate(&self) -> bool {
        match self {
            FailureModel::None => true,
            FailureModel::Network(s) | FailureModel::Crash(s) => !s.is_offline(),
        }
    }

    /// Hint that the node currently believes it is leader, which scales its
    /// failure probability. Call before [`advance`](Self::advance).
    pub fn set_is_leader(&mut self, is_leader: bool) {
        match self {
            FailureModel::None => {}
            FailureModel::Network(s) | FailureModel::Crash(s) => s.is_leader = is_leader,
        }
    }

    /// Whether the node's algorithm is suspended this tick. Only the Crash
    /// variant ever answers true; the orchestrator skips the node's phases.
    pub fn is_crashed(&self) -> bool {
        match self {
            FailureModel::Crash(s) => s.is_offline(),
            _ => false,
        }
    }

    /// Remaining isolation length, zero when online.
    pub fn ticks_until_recovery(&self) -> Tick {
        match self {
            FailureModel::None => 0,
            FailureModel::Network(s) | FailureModel::Crash(s) => s.offline_remaining,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            FailureModel::None => FailureKind::None,
            FailureModel::Network(_) => FailureKind::Network,
            FailureModel::Crash(_) => FailureKind::Crash,
        }
    }
}

/// Isolation bookkeeping shared by the Network and Crash variants.
#[derive(Debug)]
pub struct IsolationSchedule {
    cfg: FailureConfig,
    durations: WeightedIndex<u32>,
    rng: ChaCha8Rng,
    offline_remaining: Tick,
    is_leader: bool,
}

impl IsolationSchedule {
    fn new(cfg: &FailureConfig, uid: NodeUid, seed: u64) -> Result<Self, ConfigError> {
        let durations = WeightedIndex::new(cfg.offline_weights.iter().copied())
            .map_err(|e| ConfigError::InvalidWeights(e.to_string()))?;
        Ok(Self {
            cfg: cfg.clone(),
            durations,
            rng: ChaCha8Rng::seed_from_u64(mix64(seed, uid as u64)),
            offline_remaining: 0,
            is_leader: false,
        })
    }

    fn advance(&mut self) {
        if self.offline_remaining > 0 {
            self.offline_remaining -= 1;
            return;
        }
        let p = self.cfg.isolation_probability(self.is_leader);
        if self.rng.gen::<f64>() < p {
            let idx = self.durations.sample(&mut self.rng);
            self.offline_remaining = self.cfg.offline_durations[idx];
        }
    }

    fn is_offline(&self) -> bool {
        self.offline_remaining > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_failing(kind: FailureKind, duration: Tick) -> FailureConfig {
        FailureConfig {
            kind,
            p_fail: 1.0,
            leader_fail_multiplier: 1.0,
            offline_durations: vec![duration],
            offline_weights: vec![1],
        }
    }

    fn never_failing(kind: FailureKind) -> FailureConfig {
        FailureConfig {
            kind,
            p_fail: 0.0,
            ..FailureConfig::default()
        }
    }

    #[test]
    fn none_is_always_online() {
        let cfg = FailureConfig {
            kind: FailureKind::None,
            ..FailureConfig::default()
        };
        let mut model = FailureModel::new(&cfg, 1, 7).unwrap();
        for t in 0..100 {
            model.advance(t);
            assert!(model.can_communicate());
            assert!(!model.is_crashed());
        }
    }

    #[test]
    fn forced_isolation_lasts_the_sampled_duration() {
        let cfg = always_failing(FailureKind::Network, 3);
        let mut model = FailureModel::new(&cfg, 1, 7).unwrap();

        // p_fail = 1.0 triggers on the first advance.
        model.advance(0);
        assert!(!model.can_communicate());
        assert_eq!(model.ticks_until_recovery(), 3);

        // Counts down one tick at a time; back online once it reaches zero.
        model.advance(1);
        model.advance(2);
        assert!(!model.can_communicate());
        model.advance(3);
        assert!(model.can_communicate());
    }

    #[test]
    fn network_isolation_is_not_a_crash() {
        let cfg = always_failing(FailureKind::Network, 2);
        let mut model = FailureModel::new(&cfg, 1, 7).unwrap();
        model.advance(0);
        assert!(!model.can_communicate());
        assert!(!model.is_crashed());
    }

    #[test]
    fn crash_suspends_the_algorithm() {
        let cfg = always_failing(FailureKind::Crash, 2);
        let mut model = FailureModel::new(&cfg, 1, 7).unwrap();
        model.advance(0);
        assert!(model.is_crashed());
        assert!(!model.can_communicate());
        // Recovered: no longer crashed.
        model.advance(1);
        model.advance(2);
        assert!(!model.is_crashed());
        assert!(model.can_communicate());
    }

    #[test]
    fn zero_probability_never_isolates() {
        let cfg = never_failing(FailureKind::Network);
        let mut model = FailureModel::new(&cfg, 1, 7).unwrap();
        for t in 0..1000 {
            model.advance(t);
            assert!(model.can_communicate());
        }
    }

    #[test]
    fn same_seed_same_trace() {
        let cfg = FailureConfig {
            p_fail: 0.3,
            ..FailureConfig::default()
        };
        let mut a = FailureModel::new(&cfg, 4, 99).unwrap();
        let mut b = FailureModel::new(&cfg, 4, 99).unwrap();
        for t in 0..500 {
            a.advance(t);
            b.advance(t);
            assert_eq!(a.can_communicate(), b.can_communicate());
        }
    }

    #[test]
    fn different_uids_diverge() {
        let cfg = FailureConfig {
            p_fail: 0.3,
            ..FailureConfig::default()
        };
        let mut a = FailureModel::new(&cfg, 1, 99).unwrap();
        let mut b = FailureModel::new(&cfg, 2, 99).unwrap();
        let mut any_difference = false;
        for t in 0..500 {
            a.advance(t);
            b.advance(t);
            any_difference |= a.can_communicate() != b.can_communicate();
        }
        assert!(any_difference, "independent streams should not stay in lockstep");
    }

    #[test]
    fn sampled_durations_come_from_the_configured_list() {
        let cfg = FailureConfig {
            kind: FailureKind::Network,
            p_fail: 1.0,
            leader_fail_multiplier: 1.0,
            offline_durations: vec![2, 5],
            offline_weights: vec![1, 1],
        };
        let mut model = FailureModel::new(&cfg, 3, 1).unwrap();
        for t in 0..200 {
            model.advance(t);
            let remaining = model.ticks_until_recovery();
            assert!(
                remaining == 0 || remaining <= 5,
                "recovery countdown out of range: {remaining}"
            );
        }
    }
}
