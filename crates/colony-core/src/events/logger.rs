//! Event Logger
//!
//! Every published event as one JSON object per line.

use bevy_ecs::prelude::*;
use colony_events::SimEvent;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

enum Sink {
    File { path: PathBuf, writer: BufWriter<File> },
    Discard,
}

/// Resource: JSONL writer for published events.
#[derive(Resource)]
pub struct EventLogger {
    sink: Sink,
    event_count: u64,
}

impl EventLogger {
    /// Starts a fresh log at `path`, truncating any previous one.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Self::open(path.as_ref(), false)
    }

    /// Continues an existing log at `path`.
    pub fn append(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Self::open(path.as_ref(), true)
    }

    fn open(path: &Path, append: bool) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        Ok(Self {
            sink: Sink::File {
                path: path.to_path_buf(),
                writer: BufWriter::new(file),
            },
            event_count: 0,
        })
    }

    /// Counts events without writing them.
    pub fn null() -> Self {
        Self {
            sink: Sink::Discard,
            event_count: 0,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.sink {
            Sink::File { path, .. } => Some(path),
            Sink::Discard => None,
        }
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn log(&mut self, event: &SimEvent) -> std::io::Result<()> {
        if let Sink::File { writer, .. } = &mut self.sink {
            writeln!(writer, "{}", event.to_jsonl()?)?;
        }
        self.event_count += 1;
        Ok(())
    }

    pub fn log_batch(&mut self, events: &[SimEvent]) -> std::io::Result<()> {
        events.iter().try_for_each(|event| self.log(event))
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.sink {
            Sink::File { writer, .. } => writer.flush(),
            Sink::Discard => Ok(()),
        }
    }
}

impl Drop for EventLogger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "failed to flush event log");
        }
    }
}
