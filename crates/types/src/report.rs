//! Per-tick observability records.
//!
//! Nodes produce these during a tick; the orchestrator gathers them and the
//! observer writes them out as JSON Lines. Serialized field names match the
//! log format consumed by the analysis scripts, so renames here are
//! breaking changes.

use crate::{MsgKind, NodeUid, Tick};
use serde::Serialize;

/// Snapshot of one node's externally visible state at the end of a tick.
///
/// Serializes to one entry of a `state_log` record's `nodes` array; the
/// enclosing record carries the tick, so it is skipped here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateReport {
    #[serde(skip_serializing)]
    pub tick: Tick,
    pub uid: NodeUid,
    /// Whether the node could communicate this tick.
    pub online: bool,
    pub leader: NodeUid,
    /// Whether an election is active on this node.
    pub election: bool,
    pub last_hb: Tick,
}

/// Direction of a logged message event, from the owning node's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Send,
    Recv,
}

/// One send or receive observed at a node during a tick.
///
/// Serializes to one `message_log` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageEvent {
    pub tick: Tick,
    #[serde(rename = "type")]
    pub kind: MsgKind,
    #[serde(rename = "src")]
    pub src_uid: NodeUid,
    #[serde(rename = "dst")]
    pub dst_uid: NodeUid,
    /// True when the message never crossed the transport (isolation or the
    /// per-message drop Bernoulli). Receive events are never dropped.
    pub dropped: bool,
    #[serde(rename = "dir")]
    pub direction: Direction,
}

/// One human-readable diagnostic line from a node.
///
/// Serializes to one `debug_log` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugEntry {
    pub tick: Tick,
    pub uid: NodeUid,
    pub msg: String,
}

/// The first record of `state_log`, identifying the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunMetadata {
    /// Always `true`; distinguishes this record from per-tick state lines.
    pub metadata: bool,
    pub num_nodes: u32,
    pub num_ticks: Tick,
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_event_shape() {
        let event = MessageEvent {
            tick: 5,
            kind: MsgKind::Election,
            src_uid: 3,
            dst_uid: 5,
            dropped: false,
            direction: Direction::Send,
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"tick":5,"type":"ELECTION","src":3,"dst":5,"dropped":false,"dir":"send"}"#
        );
    }

    #[test]
    fn state_report_omits_tick() {
        let report = StateReport {
            tick: 7,
            uid: 1,
            online: true,
            leader: 5,
            election: false,
            last_hb: 6,
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"uid":1,"online":true,"leader":5,"election":false,"last_hb":6}"#
        );
    }

    #[test]
    fn metadata_shape() {
        let meta = RunMetadata {
            metadata: true,
            num_nodes: 3,
            num_ticks: 50,
            seed: 12345,
        };
        assert_eq!(
            serde_json::to_string(&meta).unwrap(),
            r#"{"metadata":true,"num_nodes":3,"num_ticks":50,"seed":12345}"#
        );
    }
}
