//! Node algorithm configuration.

use bullysim_types::Tick;
use serde::Deserialize;

/// Timing and traffic parameters for the election state machine.
///
/// All timing is in ticks. `election_timeout_ticks` should be at least 3: a
/// full ELECTION/OK round trip takes three ticks (ELECTION sent at `t`,
/// answered at `t + 1`, the OK observed at `t + 2`), so a smaller timeout
/// lets a lower node claim victory while a higher node's OK is still in
/// flight.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Leader broadcasts a heartbeat every this many ticks.
    pub hb_period_ticks: Tick,

    /// A follower starts an election once this many ticks pass without an
    /// accepted heartbeat.
    pub hb_timeout_ticks: Tick,

    /// Patience for both election outcomes: how long an initiator waits for
    /// an OK before declaring itself leader, and how long an OK recipient
    /// waits for the COORDINATOR before restarting.
    pub election_timeout_ticks: Tick,

    /// Per-tick probability of emitting one background PING to a random
    /// peer.
    pub p_send: f64,

    /// Per-message probability of a transport-level drop.
    pub p_drop: f64,

    /// Upper bound on messages drained from the fabric in one receive
    /// phase; the rest stay queued for the next tick.
    pub max_recv_per_tick: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            hb_period_ticks: 1,
            hb_timeout_ticks: 3,
            election_timeout_ticks: 3,
            p_send: 0.30,
            p_drop: 0.0,
            max_recv_per_tick: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.hb_period_ticks, 1);
        assert_eq!(cfg.hb_timeout_ticks, 3);
        assert_eq!(cfg.election_timeout_ticks, 3);
        assert_eq!(cfg.p_send, 0.30);
        assert_eq!(cfg.p_drop, 0.0);
        assert_eq!(cfg.max_recv_per_tick, 64);
    }
}
