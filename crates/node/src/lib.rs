//! The Bully election state machine.
//!
//! A [`Node`] is driven through four phases per tick, in this exact order:
//!
//! ```text
//! begin(t) → send(t) → recv(t) → end(t)
//! ```
//!
//! Between `begin` and `send` the orchestrator has already injected the
//! tick's communication status from the failure model. The state machine is:
//!
//! - **Synchronous**: no async, no blocking waits - the receive phase uses
//!   the fabric's nonblocking probe
//! - **Deterministic**: same config, seed, and inbound messages produce the
//!   same outbound messages and state transitions
//! - **Self-contained**: a node mutates only its own state; peers are
//!   reached exclusively through its transport endpoint
//!
//! All observability is buffered per tick ([`MessageBuffer`], debug entries)
//! and handed to the orchestrator at tick end; logging never back-pressures
//! the algorithm.

mod buffer;
mod config;
mod state;

pub use buffer::{MessageBuffer, MAX_MSG_EVENTS_PER_TICK};
pub use config::NodeConfig;
pub use state::Node;
