//! Wire message types.

use crate::{NodeUid, Tick};
use serde::Serialize;

/// The six protocol message kinds.
///
/// Serializes to the upper-case names used in `message_log` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MsgKind {
    /// Periodic broadcast by the leader asserting its liveness.
    Heartbeat,
    /// Election probe sent to every strictly-higher UID.
    Election,
    /// Reply from a higher UID telling the election initiator to yield.
    Ok,
    /// Terminal announcement by the newly elected leader.
    Coordinator,
    /// Background traffic probe carrying a correlation id in `aux`.
    Ping,
    /// Reply to a PING, echoing its correlation id.
    Ack,
}

impl MsgKind {
    /// Upper-case name as written to `message_log`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MsgKind::Heartbeat => "HEARTBEAT",
            MsgKind::Election => "ELECTION",
            MsgKind::Ok => "OK",
            MsgKind::Coordinator => "COORDINATOR",
            MsgKind::Ping => "PING",
            MsgKind::Ack => "ACK",
        }
    }
}

/// A protocol message.
///
/// Fixed shape for every kind; unused fields carry sentinels. Messages are
/// ephemeral: created in a sender's send phase, delivered into a peer's
/// inbound queue for a later tick, or dropped at transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub kind: MsgKind,
    /// Tick at which the sender issued this message.
    pub tick: Tick,
    pub src_uid: NodeUid,
    /// Destination UID, or [`BROADCAST_UID`](crate::BROADCAST_UID).
    pub dst_uid: NodeUid,
    /// The sender's current believed leader, or
    /// [`NO_LEADER`](crate::NO_LEADER).
    pub leader_uid: NodeUid,
    /// Opaque payload; PING/ACK use it as a correlation id.
    pub aux: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_log_format() {
        assert_eq!(MsgKind::Heartbeat.as_str(), "HEARTBEAT");
        assert_eq!(MsgKind::Election.as_str(), "ELECTION");
        assert_eq!(MsgKind::Ok.as_str(), "OK");
        assert_eq!(MsgKind::Coordinator.as_str(), "COORDINATOR");
        assert_eq!(MsgKind::Ping.as_str(), "PING");
        assert_eq!(MsgKind::Ack.as_str(), "ACK");
    }

    #[test]
    fn kind_serializes_as_upper_case_string() {
        assert_eq!(
            serde_json::to_string(&MsgKind::Coordinator).unwrap(),
            "\"COORDINATOR\""
        );
        assert_eq!(serde_json::to_string(&MsgKind::Ok).unwrap(), "\"OK\"");
    }
}
