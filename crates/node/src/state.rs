//! The per-node Bully election state machine.

use crate::{MessageBuffer, NodeConfig};
use bullysim_failure::node_rng;
use bullysim_transport::Endpoint;
use bullysim_types::{
    DebugEntry, Message, MessageEvent, MsgKind, NodeUid, StateReport, Tick, BROADCAST_UID, NEVER,
    NO_LEADER,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// One worker node: election state, traffic RNG, transport endpoint, and
/// per-tick observability buffers.
///
/// The node is the sole mutator of its own state. The orchestrator injects
/// the tick's communication status before the phases run and collects the
/// buffers after the end phase; everything else happens through messages.
pub struct Node {
    uid: NodeUid,
    num_nodes: u32,
    cfg: NodeConfig,

    // Core state
    leader_uid: NodeUid,
    last_hb_tick: Tick,

    // Communication status, injected from the failure model each tick.
    can_communicate: bool,
    was_communicating: bool,
    recovery_hint: Tick,

    // Election state. At most one of `election_started` and
    // `waiting_for_coordinator` is ever set, and `election_started`
    // implies `election_active`.
    election_active: bool,
    election_started: bool,
    waiting_for_coordinator: bool,
    election_start_tick: Tick,
    ok_received_tick: Tick,

    rng: ChaCha8Rng,
    endpoint: Endpoint<Message>,
    events: MessageBuffer,
    debug_entries: Vec<DebugEntry>,

    // Background traffic bookkeeping
    next_ping_id: u32,
    pings_sent: u64,
    acks_received: u64,
}

impl Node {
    /// Create the node attached to `endpoint`, which fixes its UID and the
    /// cluster size.
    ///
    /// Every node starts out assuming the highest UID is leader; there is
    /// no election on a cold start.
    pub fn new(cfg: NodeConfig, seed: u64, endpoint: Endpoint<Message>) -> Self {
        let uid = endpoint.uid();
        let num_nodes = endpoint.num_nodes();
        Self {
            uid,
            num_nodes,
            cfg,
            leader_uid: num_nodes as NodeUid,
            last_hb_tick: NEVER,
            can_communicate: true,
            was_communicating: true,
            recovery_hint: 0,
            election_active: false,
            election_started: false,
            waiting_for_coordinator: false,
            election_start_tick: NEVER,
            ok_received_tick: NEVER,
            rng: node_rng(seed, uid),
            endpoint,
            events: MessageBuffer::new(),
            debug_entries: Vec::new(),
            next_ping_id: 0,
            pings_sent: 0,
            acks_received: 0,
        }
    }

    // ─── Accessors ───

    pub fn uid(&self) -> NodeUid {
        self.uid
    }

    pub fn leader_uid(&self) -> NodeUid {
        self.leader_uid
    }

    pub fn is_leader(&self) -> bool {
        self.uid == self.leader_uid
    }

    pub fn election_active(&self) -> bool {
        self.election_active
    }

    pub fn election_started(&self) -> bool {
        self.election_started
    }

    pub fn waiting_for_coordinator(&self) -> bool {
        self.waiting_for_coordinator
    }

    pub fn last_hb_tick(&self) -> Tick {
        self.last_hb_tick
    }

    pub fn can_communicate(&self) -> bool {
        self.can_communicate
    }

    pub fn pings_sent(&self) -> u64 {
        self.pings_sent
    }

    pub fn acks_received(&self) -> u64 {
        self.acks_received
    }

    /// Inject this tick's communication status. The orchestrator calls this
    /// before `tick_begin`.
    pub fn set_can_communicate(&mut self, can: bool) {
        self.can_communicate = can;
    }

    /// Inject the failure model's remaining-isolation estimate, read only
    /// by the link-down diagnostic in `tick_begin`.
    pub fn set_recovery_hint(&mut self, ticks: Tick) {
        self.recovery_hint = ticks;
    }

    // ─── Tick phases ───

    /// Phase 1: observe time.
    pub fn tick_begin(&mut self, tick: Tick) {
        if self.can_communicate != self.was_communicating {
            if self.can_communicate {
                self.debug_note(tick, "link restored, listening for heartbeats".to_string());
            } else if self.recovery_hint > 0 {
                self.debug_note(
                    tick,
                    format!("link down, transport blocked for {} ticks", self.recovery_hint),
                );
            } else {
                self.debug_note(tick, "link down, transport blocked".to_string());
            }
            self.was_communicating = self.can_communicate;
        }
    }

    /// Phase 2: emit outbound messages - heartbeat, election initiation,
    /// background ping, in that order.
    pub fn tick_send(&mut self, tick: Tick) {
        self.maybe_send_heartbeat(tick);

        // A pending election is deferred while waiting for a COORDINATOR;
        // the wait timeout re-arms it if the higher node never announces.
        if self.election_active && !self.election_started && !self.waiting_for_coordinator {
            self.start_election(tick);
        }

        self.maybe_send_ping(tick);
    }

    /// Phase 3: drain inbound messages, up to the configured budget.
    ///
    /// Every drained message is logged. While isolated, the node drains but
    /// does not observe: nothing is dispatched to the handlers.
    pub fn tick_recv(&mut self, tick: Tick) {
        let mut drained = 0;
        while drained < self.cfg.max_recv_per_tick {
            let Some(m) = self.endpoint.try_recv() else {
                break;
            };
            self.events.log_recv(tick, &m);
            if self.can_communicate {
                self.handle_message(m, tick);
            }
            drained += 1;
        }
    }

    /// Phase 4: evaluate the three timeouts.
    pub fn tick_end(&mut self, tick: Tick) {
        // Heartbeat timeout: the leader has gone quiet on us.
        if self.leader_uid != NO_LEADER
            && self.uid != self.leader_uid
            && !self.election_active
            && !self.waiting_for_coordinator
            && self.last_hb_tick >= 0
            && tick - self.last_hb_tick >= self.cfg.hb_timeout_ticks
        {
            self.election_active = true;
            self.election_started = false;
            self.debug_note(
                tick,
                format!(
                    "timeout: no heartbeat from leader {} since tick {}, starting election",
                    self.leader_uid, self.last_hb_tick
                ),
            );
        }

        // Coordinator-wait timeout: a higher node acknowledged our election
        // with OK but never announced itself.
        if self.waiting_for_coordinator
            && tick - self.ok_received_tick > self.cfg.election_timeout_ticks
        {
            self.waiting_for_coordinator = false;
            self.ok_received_tick = NEVER;
            self.election_active = true;
            self.election_started = false;
            self.debug_note(tick, "timeout: no COORDINATOR after OK, restarting election".to_string());
        }

        // Election-win timeout: no higher node objected.
        if self.election_active
            && self.election_started
            && tick - self.election_start_tick > self.cfg.election_timeout_ticks
        {
            self.leader_uid = self.uid;
            self.election_active = false;
            self.election_started = false;
            self.debug_note(tick, "won election, broadcasting COORDINATOR".to_string());
            debug!(uid = self.uid, tick, "election won");

            let coord = Message {
                kind: MsgKind::Coordinator,
                tick,
                src_uid: self.uid,
                dst_uid: BROADCAST_UID,
                leader_uid: self.uid,
                aux: 0,
            };
            self.broadcast(coord);
        }
    }

    /// Publish messages staged by peers for the next tick. Must only run in
    /// the orchestrator's quiet region, after the end-of-tick barrier.
    pub fn finish_tick(&mut self) {
        self.endpoint.commit_inbound();
    }

    // ─── Observability handoff ───

    pub fn state_report(&self, tick: Tick) -> StateReport {
        StateReport {
            tick,
            uid: self.uid,
            online: self.can_communicate,
            leader: self.leader_uid,
            election: self.election_active,
            last_hb: self.last_hb_tick,
        }
    }

    pub fn take_events(&mut self) -> Vec<MessageEvent> {
        self.events.take()
    }

    pub fn take_debug(&mut self) -> Vec<DebugEntry> {
        std::mem::take(&mut self.debug_entries)
    }

    // ─── Send helpers ───

    fn maybe_send_heartbeat(&mut self, tick: Tick) {
        if !self.is_leader() {
            return;
        }
        if self.cfg.hb_period_ticks <= 0 || tick % self.cfg.hb_period_ticks != 0 {
            return;
        }
        let hb = Message {
            kind: MsgKind::Heartbeat,
            tick,
            src_uid: self.uid,
            dst_uid: BROADCAST_UID,
            leader_uid: self.uid,
            aux: 0,
        };
        self.broadcast(hb);
    }

    fn start_election(&mut self, tick: Tick) {
        self.election_started = true;
        self.election_start_tick = tick;

        let mut any_higher = false;
        for peer in (self.uid + 1)..=(self.num_nodes as NodeUid) {
            any_higher = true;
            let m = Message {
                kind: MsgKind::Election,
                tick,
                src_uid: self.uid,
                dst_uid: peer,
                leader_uid: self.leader_uid,
                aux: 0,
            };
            let delivered = self.transport_send(m, peer);
            self.note_send(tick, MsgKind::Election, peer, delivered);
        }

        if !any_higher {
            // Highest UID: nobody to ask, the win timeout will crown us.
            self.debug_note(tick, "no higher peers, claiming leadership on timeout".to_string());
        }
        debug!(uid = self.uid, tick, "election started");
    }

    fn maybe_send_ping(&mut self, tick: Tick) {
        if self.num_nodes < 2 || self.cfg.p_send <= 0.0 {
            return;
        }
        if self.rng.gen::<f64>() >= self.cfg.p_send {
            return;
        }

        let peer = self.random_peer();
        let id = self.next_ping_id;
        self.next_ping_id = self.next_ping_id.wrapping_add(1);
        let ping = Message {
            kind: MsgKind::Ping,
            tick,
            src_uid: self.uid,
            dst_uid: peer,
            leader_uid: self.leader_uid,
            aux: id,
        };
        let delivered = self.transport_send(ping, peer);
        if delivered {
            self.pings_sent += 1;
        }
        self.note_send(tick, MsgKind::Ping, peer, delivered);
    }

    fn random_peer(&mut self) -> NodeUid {
        loop {
            let peer = self.rng.gen_range(1..=self.num_nodes as NodeUid);
            if peer != self.uid {
                return peer;
            }
        }
    }

    // ─── Transport adapter ───

    /// Send one message, enforcing isolation and the per-message drop
    /// probability. Returns whether the message actually crossed the
    /// transport; either way the attempt is logged.
    fn transport_send(&mut self, m: Message, dst: NodeUid) -> bool {
        let dropped = !self.can_communicate || self.should_drop();
        self.events.log_send(m.tick, &m, dst, dropped);
        if !dropped {
            self.endpoint.send(dst, m);
        }
        !dropped
    }

    fn should_drop(&mut self) -> bool {
        self.cfg.p_drop > 0.0 && self.rng.gen::<f64>() < self.cfg.p_drop
    }

    /// Record a send attempt in the debug stream, named by message kind.
    fn note_send(&mut self, tick: Tick, kind: MsgKind, dst: NodeUid, delivered: bool) {
        if delivered {
            self.debug_note(tick, format!("{} -> {dst}", kind.as_str()));
        } else {
            self.debug_note(tick, format!("{} -> {dst} (dropped)", kind.as_str()));
        }
    }

    /// Fan out to every other node, one independently droppable copy each.
    fn broadcast(&mut self, m: Message) {
        for peer in 1..=(self.num_nodes as NodeUid) {
            if peer == self.uid {
                continue;
            }
            self.transport_send(m, peer);
        }
    }

    // ─── Message dispatch ───

    fn handle_message(&mut self, m: Message, tick: Tick) {
        match m.kind {
            MsgKind::Heartbeat => {
                // Equal UID accepted so a restarted leader can reassert.
                if m.src_uid >= self.uid {
                    self.adopt_leader(m.src_uid, tick);
                }
            }

            MsgKind::Election => {
                let ok = Message {
                    kind: MsgKind::Ok,
                    tick,
                    src_uid: self.uid,
                    dst_uid: m.src_uid,
                    leader_uid: self.leader_uid,
                    aux: 0,
                };
                let delivered = self.transport_send(ok, m.src_uid);
                self.note_send(tick, MsgKind::Ok, m.src_uid, delivered);

                // A lower node is probing: contest the election ourselves,
                // unless we are already in one or have yielded to a higher
                // node.
                if m.src_uid < self.uid
                    && !self.election_active
                    && !self.waiting_for_coordinator
                {
                    self.election_active = true;
                    self.election_started = false;
                    self.debug_note(
                        tick,
                        format!("ELECTION from {}, starting own election", m.src_uid),
                    );
                }
            }

            MsgKind::Ok => {
                // Only a strictly higher node can make us yield.
                if m.src_uid > self.uid {
                    self.election_active = false;
                    self.election_started = false;
                    self.waiting_for_coordinator = true;
                    self.ok_received_tick = tick;
                    self.debug_note(
                        tick,
                        format!("OK from {}, yielding and waiting for COORDINATOR", m.src_uid),
                    );
                }
            }

            MsgKind::Coordinator => {
                if m.src_uid >= self.uid {
                    self.adopt_leader(m.src_uid, tick);
                    self.debug_note(tick, format!("COORDINATOR from {}, accepted", m.src_uid));
                } else {
                    self.debug_note(
                        tick,
                        format!("COORDINATOR from {} rejected, lower than us", m.src_uid),
                    );
                    if !self.election_active && !self.waiting_for_coordinator {
                        self.election_active = true;
                        self.election_started = false;
                    }
                }
            }

            MsgKind::Ping => {
                let ack = Message {
                    kind: MsgKind::Ack,
                    tick,
                    src_uid: self.uid,
                    dst_uid: m.src_uid,
                    leader_uid: self.leader_uid,
                    aux: m.aux,
                };
                self.transport_send(ack, m.src_uid);
            }

            MsgKind::Ack => {
                self.acks_received += 1;
            }
        }
    }

    fn adopt_leader(&mut self, leader: NodeUid, tick: Tick) {
        if self.leader_uid != leader {
            debug!(uid = self.uid, tick, leader, "adopted leader");
        }
        self.leader_uid = leader;
        self.last_hb_tick = tick;
        self.election_active = false;
        self.election_started = false;
        self.waiting_for_coordinator = false;
        self.ok_received_tick = NEVER;
    }

    fn debug_note(&mut self, tick: Tick, msg: String) {
        debug!(uid = self.uid, tick, "{msg}");
        self.debug_entries.push(DebugEntry {
            tick,
            uid: self.uid,
            msg,
        });
    }
}
