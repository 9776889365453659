//! The tick orchestrator.

use crate::{Observer, SimError, SimulationConfig};
use bullysim_failure::FailureModel;
use bullysim_node::Node;
use bullysim_transport::Fabric;
use bullysim_types::{
    DebugEntry, Direction, Message, MessageEvent, NodeUid, RunMetadata, StateReport, Tick,
};
use crossbeam::channel;
use std::sync::Barrier;
use tracing::{info, warn};

/// Everything one node hands to the observer at the end of a tick.
///
/// Copies only - the observer never holds references into node state.
pub struct TickBundle {
    pub uid: NodeUid,
    pub report: StateReport,
    pub events: Vec<MessageEvent>,
    pub debug: Vec<DebugEntry>,
}

/// Statistics collected by the observer over a run.
#[derive(Debug, Default, Clone)]
pub struct SimulationStats {
    /// Ticks completed.
    pub ticks_run: Tick,
    /// Send events that crossed the transport.
    pub messages_sent: u64,
    /// Send events dropped by isolation or the drop Bernoulli.
    pub messages_dropped: u64,
    /// Receive events drained from the fabric.
    pub receives_logged: u64,
}

impl SimulationStats {
    /// Fraction of send attempts that crossed the transport.
    pub fn delivery_rate(&self) -> f64 {
        let total = self.messages_sent + self.messages_dropped;
        if total == 0 {
            1.0
        } else {
            self.messages_sent as f64 / total as f64
        }
    }
}

/// Drives one worker thread per node, plus the observer on the calling
/// thread, through lockstep ticks.
///
/// Given the same configuration (seed included) the run produces
/// byte-identical output streams: per-node RNG streams are derived from
/// `(seed, uid)`, tick-staged delivery fixes message visibility, and the
/// observer sorts every gather by UID.
pub struct SimulationRunner {
    config: SimulationConfig,
}

impl SimulationRunner {
    /// Validate the configuration and build a runner.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        let num_nodes = config.simulation.num_nodes;
        if num_nodes < 1 {
            return Err(SimError::InvalidTopology { num_nodes });
        }
        config.failure.validate()?;

        if config.node.election_timeout_ticks < 3 {
            // An ELECTION/OK round trip takes three ticks; anything shorter
            // can crown a lower node while a higher node's OK is in flight.
            warn!(
                election_timeout_ticks = config.node.election_timeout_ticks,
                "election timeout below 3 ticks, election results may be incorrect"
            );
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run the full simulation to completion.
    pub fn run(&self) -> Result<SimulationStats, SimError> {
        let num_nodes = self.config.simulation.num_nodes;
        let num_ticks = self.config.simulation.num_ticks.max(0);
        let seed = self.config.simulation.seed;

        let mut observer = Observer::open(&self.config.logging)?;
        observer.log_metadata(&RunMetadata {
            metadata: true,
            num_nodes,
            num_ticks,
            seed,
        })?;

        let mut workers = Vec::with_capacity(num_nodes as usize);
        for endpoint in Fabric::new::<Message>(num_nodes) {
            let node = Node::new(self.config.node.clone(), seed, endpoint);
            let failure = FailureModel::new(&self.config.failure, node.uid(), seed)?;
            workers.push((node, failure));
        }

        // Two barriers bracket the per-tick phases so no node starts tick
        // t + 1 while another is still sending for tick t; the third is the
        // global tick boundary shared with the observer.
        let worker_barrier = Barrier::new(num_nodes as usize);
        let tick_barrier = Barrier::new(num_nodes as usize + 1);
        let (gather_tx, gather_rx) = channel::unbounded::<TickBundle>();

        info!(num_nodes, num_ticks, seed, "starting simulation");

        let mut stats = SimulationStats::default();
        let mut write_error: Option<std::io::Error> = None;

        std::thread::scope(|scope| {
            for (mut node, mut failure) in workers {
                let worker_barrier = &worker_barrier;
                let tick_barrier = &tick_barrier;
                let gather_tx = gather_tx.clone();
                scope.spawn(move || {
                    for tick in 0..num_ticks {
                        worker_barrier.wait();

                        failure.set_is_leader(node.is_leader());
                        failure.advance(tick);
                        node.set_recovery_hint(failure.ticks_until_recovery());
                        node.set_can_communicate(failure.can_communicate());

                        // A crashed node's algorithm is suspended outright;
                        // isolation only blocks its transport.
                        if !failure.is_crashed() {
                            node.tick_begin(tick);
                            node.tick_send(tick);
                            node.tick_recv(tick);
                            node.tick_end(tick);
                        }

                        worker_barrier.wait();

                        gather_tx
                            .send(TickBundle {
                                uid: node.uid(),
                                report: node.state_report(tick),
                                events: node.take_events(),
                                debug: node.take_debug(),
                            })
                            .expect("observer disconnected");

                        // Quiet region: every worker is past its send/recv
                        // phases and none enters the next tick until the
                        // global barrier, so publishing staged traffic here
                        // cannot race a send.
                        node.finish_tick();

                        tick_barrier.wait();
                    }
                });
            }
            drop(gather_tx);

            // The calling thread is the observer.
            for tick in 0..num_ticks {
                let mut bundles: Vec<TickBundle> = (0..num_nodes)
                    .map(|_| gather_rx.recv().expect("worker disconnected"))
                    .collect();
                bundles.sort_by_key(|b| b.uid);

                let reports: Vec<StateReport> = bundles.iter().map(|b| b.report).collect();
                let events: Vec<MessageEvent> = bundles
                    .iter()
                    .flat_map(|b| b.events.iter().copied())
                    .collect();
                let debug_entries: Vec<DebugEntry> = bundles
                    .into_iter()
                    .flat_map(|b| b.debug)
                    .collect();

                for event in &events {
                    match event.direction {
                        Direction::Send if event.dropped => stats.messages_dropped += 1,
                        Direction::Send => stats.messages_sent += 1,
                        Direction::Recv => stats.receives_logged += 1,
                    }
                }

                if write_error.is_none() {
                    if let Err(e) = observer.log_tick(tick, &reports, &events, &debug_entries) {
                        // Keep honoring the barrier protocol; surface the
                        // first failure when the run ends.
                        write_error = Some(e);
                    }
                }
                stats.ticks_run = tick + 1;

                tick_barrier.wait();
            }
        });

        if let Some(e) = write_error {
            return Err(SimError::LogWrite(e));
        }

        info!(
            ticks_run = stats.ticks_run,
            messages_sent = stats.messages_sent,
            messages_dropped = stats.messages_dropped,
            receives = stats.receives_logged,
            delivery_rate = stats.delivery_rate(),
            "simulation complete"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn short_election_timeout_warns_but_runs() {
        let mut config = SimulationConfig::default();
        config.node.election_timeout_ticks = 2;
        assert!(SimulationRunner::new(config).is_ok());
        assert!(logs_contain("election timeout below 3 ticks"));
    }

    #[test]
    fn zero_nodes_is_an_invalid_topology() {
        let mut config = SimulationConfig::default();
        config.simulation.num_nodes = 0;
        match SimulationRunner::new(config) {
            Err(SimError::InvalidTopology { num_nodes }) => assert_eq!(num_nodes, 0),
            _ => panic!("expected InvalidTopology"),
        }
    }

    #[test]
    fn mismatched_failure_lists_fail_fast() {
        let mut config = SimulationConfig::default();
        config.failure.offline_weights = vec![1];
        assert!(matches!(
            SimulationRunner::new(config),
            Err(SimError::Failure(_))
        ));
    }

    #[test]
    fn delivery_rate_handles_the_empty_run() {
        let stats = SimulationStats::default();
        assert_eq!(stats.delivery_rate(), 1.0);

        let stats = SimulationStats {
            messages_sent: 3,
            messages_dropped: 1,
            ..SimulationStats::default()
        };
        assert_eq!(stats.delivery_rate(), 0.75);
    }
}
