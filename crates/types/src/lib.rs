//! Core types for the bullysim leader-election simulator.
//!
//! This crate provides the foundational types shared by every other crate:
//!
//! - [`Message`]: the fixed-shape wire message exchanged between nodes
//! - [`MsgKind`]: the six protocol message kinds
//! - [`StateReport`], [`MessageEvent`], [`DebugEntry`]: the per-tick
//!   observability records gathered by the controller
//!
//! All types here are **passive data** - they carry no behavior beyond
//! construction helpers and serialization. The election logic lives in
//! `bullysim-node`; the delivery rules live in `bullysim-transport`.

mod message;
mod report;

pub use message::{Message, MsgKind};
pub use report::{DebugEntry, Direction, MessageEvent, RunMetadata, StateReport};

/// Unique integer identity of a node, fixed for the run.
///
/// Nodes are numbered `1..=N`. The controller is not a node and has no UID.
/// The Bully protocol's priority relation is plain integer ordering on this
/// type.
pub type NodeUid = i32;

/// Simulated time, in ticks. One tick is one coordinated round across all
/// nodes.
pub type Tick = i64;

/// Destination sentinel meaning "every node except the sender".
pub const BROADCAST_UID: NodeUid = -1;

/// Leader sentinel meaning "no leader currently known".
pub const NO_LEADER: NodeUid = -1;

/// Tick sentinel meaning "has not happened yet".
pub const NEVER: Tick = -1;
