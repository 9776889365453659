//! Deterministic tick orchestration for the Bully election simulator.
//!
//! [`SimulationRunner`] drives one worker thread per node plus an observer
//! through lockstep ticks. Each tick:
//!
//! 1. Worker barrier - all nodes enter the tick together
//! 2. Per-node update: failure model advance, communication status
//!    injection, then the four node phases (skipped while crashed)
//! 3. Worker barrier - no node leaves the tick while another is mid-send
//! 4. Gather: every worker hands its state report, message events, and
//!    debug entries to the observer, then publishes staged inbound traffic
//! 5. Global barrier with the observer before tick `t + 1`
//!
//! The two worker barriers are what guarantee that a message sent at tick
//! `t` is observable no earlier than tick `t + 1`; they must survive any
//! refactoring. The observer sorts gathered bundles by UID before writing,
//! so the three JSONL output streams are byte-identical across runs with
//! the same configuration and seed, regardless of thread scheduling.

mod config;
mod error;
mod observer;
mod runner;

pub use config::{LoggingConfig, SimulationConfig, SimulationSettings};
pub use error::SimError;
pub use observer::Observer;
pub use runner::{SimulationRunner, SimulationStats, TickBundle};
