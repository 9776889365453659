//! In-memory point-to-point message fabric with tick-staged delivery.
//!
//! [`Fabric::new`] wires up one [`Endpoint`] per node. Each ordered pair of
//! nodes gets its own FIFO channel, so delivery order is guaranteed per pair
//! and unspecified across senders - the same contract a real point-to-point
//! transport gives.
//!
//! Delivery is staged at tick granularity: a sent message sits in the pair
//! channel until the *receiver* calls [`Endpoint::commit_inbound`], which the
//! orchestrator schedules in the quiet region after the end-of-tick barrier.
//! A message sent at tick `t` therefore becomes observable no earlier than
//! tick `t + 1`, and [`Endpoint::try_recv`] drains committed messages in
//! ascending peer order - fully deterministic given the barrier protocol.
//!
//! The fabric moves whatever payload type it is given; drop decisions,
//! logging, and addressing policy belong to the layer above.

use bullysim_types::NodeUid;
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::collections::VecDeque;

/// Builder for the per-node [`Endpoint`]s of a fully connected fabric.
pub struct Fabric;

impl Fabric {
    /// Create endpoints for nodes `1..=num_nodes`.
    ///
    /// The endpoint at index `i` belongs to UID `i + 1` and is meant to move
    /// into that node's worker thread.
    pub fn new<T: Send>(num_nodes: u32) -> Vec<Endpoint<T>> {
        let n = num_nodes as usize;

        // senders[src][dst] / receivers[dst][src], self slots unused.
        let mut senders: Vec<Vec<Option<Sender<T>>>> = (0..n).map(|_| Vec::new()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<T>>>> = (0..n).map(|_| Vec::new()).collect();

        for src in 0..n {
            for dst in 0..n {
                if src == dst {
                    senders[src].push(None);
                    receivers[dst].push(None);
                } else {
                    let (tx, rx) = unbounded();
                    senders[src].push(Some(tx));
                    receivers[dst].push(Some(rx));
                }
            }
        }

        let mut endpoints = Vec::with_capacity(n);
        for (i, (txs, rxs)) in senders.into_iter().zip(receivers).enumerate() {
            endpoints.push(Endpoint {
                uid: (i + 1) as NodeUid,
                num_nodes,
                txs,
                rxs,
                inboxes: (0..n).map(|_| VecDeque::new()).collect(),
            });
        }
        endpoints
    }
}

/// One node's attachment to the fabric.
pub struct Endpoint<T> {
    uid: NodeUid,
    num_nodes: u32,
    /// Senders into each peer's staging channel, indexed by `peer_uid - 1`.
    txs: Vec<Option<Sender<T>>>,
    /// Receivers from each peer's staging channel, indexed by `peer_uid - 1`.
    rxs: Vec<Option<Receiver<T>>>,
    /// Committed inbound messages, FIFO per peer.
    inboxes: Vec<VecDeque<T>>,
}

impl<T: Send> Endpoint<T> {
    pub fn uid(&self) -> NodeUid {
        self.uid
    }

    pub fn num_nodes(&self) -> u32 {
        self.num_nodes
    }

    /// Stage a message for `dst`. It becomes receivable after the peer's
    /// next `commit_inbound`.
    ///
    /// Sends to an unknown UID, to self, or to an endpoint whose owner has
    /// already exited are discarded - the fabric is lossy at the edges by
    /// construction, never panicking mid-simulation.
    pub fn send(&self, dst: NodeUid, payload: T) {
        if dst < 1 || dst > self.num_nodes as NodeUid || dst == self.uid {
            return;
        }
        if let Some(tx) = &self.txs[(dst - 1) as usize] {
            let _ = tx.send(payload);
        }
    }

    /// Publish everything staged by peers into the committed inboxes.
    ///
    /// Must only run while no peer is sending (the orchestrator's
    /// post-barrier quiet region); that is what upholds the "observable no
    /// earlier than t + 1" rule.
    pub fn commit_inbound(&mut self) {
        for (idx, rx) in self.rxs.iter().enumerate() {
            if let Some(rx) = rx {
                while let Ok(payload) = rx.try_recv() {
                    self.inboxes[idx].push_back(payload);
                }
            }
        }
    }

    /// Nonblocking probe: pop the next committed message, scanning peers in
    /// ascending UID order and preserving FIFO within each pair.
    pub fn try_recv(&mut self) -> Option<T> {
        self.inboxes
            .iter_mut()
            .find_map(|inbox| inbox.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_stay_staged_until_commit() {
        let mut eps = Fabric::new::<u32>(2);
        let b = &mut eps[1];
        assert!(b.try_recv().is_none());

        eps[0].send(2, 7);
        assert!(eps[1].try_recv().is_none(), "nothing visible before commit");

        eps[1].commit_inbound();
        assert_eq!(eps[1].try_recv(), Some(7));
        assert!(eps[1].try_recv().is_none());
    }

    #[test]
    fn fifo_within_a_pair() {
        let mut eps = Fabric::new::<u32>(2);
        for v in 0..10 {
            eps[0].send(2, v);
        }
        eps[1].commit_inbound();
        for v in 0..10 {
            assert_eq!(eps[1].try_recv(), Some(v));
        }
    }

    #[test]
    fn drain_order_is_ascending_by_peer() {
        let mut eps = Fabric::new::<(NodeUid, u32)>(3);
        eps[2].send(2, (3, 0));
        eps[0].send(2, (1, 0));
        eps[0].send(2, (1, 1));
        eps[1].commit_inbound();

        // Peer 1's messages drain before peer 3's regardless of send order.
        assert_eq!(eps[1].try_recv(), Some((1, 0)));
        assert_eq!(eps[1].try_recv(), Some((1, 1)));
        assert_eq!(eps[1].try_recv(), Some((3, 0)));
        assert!(eps[1].try_recv().is_none());
    }

    #[test]
    fn uncommitted_messages_survive_to_the_next_commit() {
        let mut eps = Fabric::new::<u32>(2);
        eps[0].send(2, 1);
        eps[1].commit_inbound();
        eps[0].send(2, 2);
        assert_eq!(eps[1].try_recv(), Some(1));
        assert!(eps[1].try_recv().is_none());

        eps[1].commit_inbound();
        assert_eq!(eps[1].try_recv(), Some(2));
    }

    #[test]
    fn invalid_destinations_are_discarded() {
        let eps = Fabric::new::<u32>(2);
        eps[0].send(0, 1);
        eps[0].send(-1, 1);
        eps[0].send(3, 1);
        eps[0].send(1, 1); // self
    }

    #[test]
    fn single_node_fabric_is_silent() {
        let mut eps = Fabric::new::<u32>(1);
        eps[0].send(1, 42);
        eps[0].commit_inbound();
        assert!(eps[0].try_recv().is_none());
    }

    #[test]
    fn endpoints_work_across_threads() {
        let mut eps = Fabric::new::<u32>(2);
        let b = eps.pop().unwrap();
        let a = eps.pop().unwrap();

        let handle = std::thread::spawn(move || {
            for v in 0..100 {
                a.send(2, v);
            }
        });
        handle.join().unwrap();

        let mut b = b;
        b.commit_inbound();
        let mut got = Vec::new();
        while let Some(v) = b.try_recv() {
            got.push(v);
        }
        assert_eq!(got, (0..100).collect::<Vec<_>>());
    }
}
