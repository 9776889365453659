//! Bounded per-tick record of message events.

use bullysim_types::{Direction, Message, MessageEvent, NodeUid, Tick};

/// Maximum message events a node records per tick.
///
/// Overflow is silently truncated: observability must never back-pressure
/// the algorithm, so a burst of traffic costs log completeness, not timing.
pub const MAX_MSG_EVENTS_PER_TICK: usize = 32;

/// Per-tick buffer of send/receive events, drained by the orchestrator
/// after the end phase.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    events: Vec<MessageEvent>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(MAX_MSG_EVENTS_PER_TICK),
        }
    }

    /// Record an outgoing message aimed at `dst`.
    ///
    /// Broadcast fan-out logs one event per concrete destination, so `dst`
    /// is the peer the copy went to, not the wire message's sentinel.
    pub fn log_send(&mut self, tick: Tick, m: &Message, dst: NodeUid, dropped: bool) {
        self.push(MessageEvent {
            tick,
            kind: m.kind,
            src_uid: m.src_uid,
            dst_uid: dst,
            dropped,
            direction: Direction::Send,
        });
    }

    /// Record a drained inbound message.
    pub fn log_recv(&mut self, tick: Tick, m: &Message) {
        self.push(MessageEvent {
            tick,
            kind: m.kind,
            src_uid: m.src_uid,
            dst_uid: m.dst_uid,
            dropped: false,
            direction: Direction::Recv,
        });
    }

    fn push(&mut self, event: MessageEvent) {
        if self.events.len() < MAX_MSG_EVENTS_PER_TICK {
            self.events.push(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Hand off this tick's events, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<MessageEvent> {
        std::mem::replace(&mut self.events, Vec::with_capacity(MAX_MSG_EVENTS_PER_TICK))
    }
}
