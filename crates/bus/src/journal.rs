// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only events journal.
//!
//! One flushed JSON line per coordinator-visible event. The file is opened in
//! append mode at run start and lines are never rewritten, so a crashed
//! coordinator leaves at most one truncated trailing line, which readers
//! tolerate.

use crate::BusError;
use chrono::{DateTime, Utc};
use fm_core::{Event, JournalEvent, RunId};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Writer half of the journal. Single writer: the coordinator.
#[derive(Debug)]
pub struct EventJournal {
    path: PathBuf,
    file: File,
    run_id: RunId,
}

impl EventJournal {
    /// Open (or create) the journal in append mode.
    pub fn open(path: &Path, run_id: RunId) -> Result<Self, BusError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { path: path.to_path_buf(), file, run_id })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event and flush. Returns the envelope as written, for
    /// timeline bookkeeping.
    pub fn append(
        &mut self,
        timestamp: DateTime<Utc>,
        event: Event,
    ) -> Result<JournalEvent, BusError> {
        let envelope = JournalEvent { timestamp, run_id: self.run_id.clone(), event };
        let mut line = serde_json::to_vec(&envelope)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.flush()?;
        Ok(envelope)
    }
}

/// Read every parseable event from a journal file.
///
/// A truncated or garbled trailing line (crash mid-write) is skipped quietly;
/// malformed lines elsewhere are skipped with a warning so one bad record
/// cannot make the whole journal unreadable.
pub fn read_journal(path: &Path) -> Result<Vec<JournalEvent>, BusError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let reader = BufReader::new(file);
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let last = lines.len().saturating_sub(1);

    let mut events = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEvent>(line) {
            Ok(event) => events.push(event),
            Err(e) if i == last => {
                tracing::debug!(error = %e, "skipping truncated trailing journal line");
            }
            Err(e) => {
                tracing::warn!(line = i + 1, error = %e, "skipping malformed journal line");
            }
        }
    }
    Ok(events)
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
