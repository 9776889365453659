//! The observer: three append-only JSONL streams.

use crate::{LoggingConfig, SimError};
use bullysim_types::{DebugEntry, MessageEvent, RunMetadata, StateReport, Tick};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// A `state_log` line: every node's state at one tick, ascending UID.
#[derive(Serialize)]
struct TickStates<'a> {
    tick: Tick,
    nodes: &'a [StateReport],
}

/// Writes the state, message, and debug streams.
///
/// The observer owns its files exclusively; workers never touch them. Every
/// record is a copy gathered from a node, never a reference into node
/// state. Streams are flushed once per tick so an external consumer tailing
/// the files sees progress at tick granularity.
pub struct Observer {
    state_log: BufWriter<File>,
    message_log: BufWriter<File>,
    debug_log: BufWriter<File>,
}

impl Observer {
    /// Open all three streams, truncating existing files.
    ///
    /// Any open failure aborts the run: a simulation whose output cannot be
    /// recorded is worthless.
    pub fn open(cfg: &LoggingConfig) -> Result<Self, SimError> {
        Ok(Self {
            state_log: open_log(&cfg.state_log_file)?,
            message_log: open_log(&cfg.message_log_file)?,
            debug_log: open_log(&cfg.debug_log_file)?,
        })
    }

    /// Write the run-identifying first record of `state_log`.
    pub fn log_metadata(&mut self, meta: &RunMetadata) -> io::Result<()> {
        write_line(&mut self.state_log, meta)?;
        self.state_log.flush()
    }

    /// Write one tick's gathered records. `reports` must already be sorted
    /// by UID; `events` and `debug` keep the order the gather produced.
    pub fn log_tick(
        &mut self,
        tick: Tick,
        reports: &[StateReport],
        events: &[MessageEvent],
        debug: &[DebugEntry],
    ) -> io::Result<()> {
        write_line(&mut self.state_log, &TickStates { tick, nodes: reports })?;
        for event in events {
            write_line(&mut self.message_log, event)?;
        }
        for entry in debug {
            write_line(&mut self.debug_log, entry)?;
        }
        self.state_log.flush()?;
        self.message_log.flush()?;
        self.debug_log.flush()
    }
}

fn open_log(path: &Path) -> Result<BufWriter<File>, SimError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| SimError::LogOpen {
            path: path.to_path_buf(),
            source,
        })
}

fn write_line<T: Serialize>(writer: &mut impl Write, value: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")
}
