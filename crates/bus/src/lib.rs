// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-bus: File IPC bus for the Foreman coordinator.
//!
//! Owns the on-disk run layout and every cross-process communication surface:
//! lock-protected per-agent mailboxes, the append-only events journal, the
//! rate-limited state snapshot, and per-task records. The coordinator is the
//! only writer; UIs and dashboards poll these files and never share memory
//! with the coordinator process.

mod atomic;
mod journal;
mod layout;
mod lock;
mod mailbox;
mod snapshot;
mod task_record;

pub use atomic::{read_json_opt, read_json_or, write_json_atomic};
pub use journal::{read_journal, EventJournal};
pub use layout::RunLayout;
pub use lock::FileLock;
pub use mailbox::{Mailboxes, OutboxEntry};
pub use snapshot::{
    ArtifactEntry, Edge, MergeItemRow, MergeQueueSnapshot, Phase, QualityResult, QualityStats,
    QueueStats, RunStatus, StateSnapshot, StateWriter, TaskRow, VerificationSummary, WatchdogStats,
    WaveReview,
};
pub use task_record::{read_task_record, write_task_record, TaskRecord, ValidationSnapshot};

use thiserror::Error;

/// Errors from bus operations
#[derive(Debug, Error)]
pub enum BusError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
