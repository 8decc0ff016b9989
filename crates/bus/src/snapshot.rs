// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State snapshot schema and the rate-limited writer.
//!
//! `state.json` is the single document an external UI needs: every task row,
//! the DAG edges, the live agents, queue and budget statistics, and bounded
//! tails of the timeline, errors, and decisions. It is rewritten atomically
//! and `state_seq` increases by exactly one per write, so readers detect
//! updates by comparing sequences.

use crate::atomic::write_json_atomic;
use crate::BusError;
use chrono::{DateTime, Utc};
use fm_core::{
    AgentId, AgentRecord, BudgetSnapshot, Clock, DecisionEntry, ErrorEntry, RunId, TaskId,
    TaskKind, TaskStatus, TimelineEntry,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Execution phase of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initializing,
    Executing,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

fm_core::simple_display! {
    Phase {
        Initializing => "initializing",
        Executing => "executing",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Task counts by status. Sums to the total task count in every snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub ready: usize,
    pub running: usize,
    pub reviewing: usize,
    pub done: usize,
    pub failed: usize,
    pub blocked: usize,
    pub skipped: usize,
}

impl QueueStats {
    pub fn count(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Ready => self.ready += 1,
            TaskStatus::Running => self.running += 1,
            TaskStatus::Reviewing => self.reviewing += 1,
            TaskStatus::Done => self.done += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Blocked => self.blocked += 1,
            TaskStatus::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogStats {
    pub crash_count: u32,
    pub reassigned_tasks: u32,
    pub stale_agents: usize,
}

/// Top-level status block: phase + current wave + queue stats + budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub phase: Phase,
    /// Dispatch rounds that assigned at least one task.
    pub wave: u32,
    pub queue: QueueStats,
    pub budget: BudgetSnapshot,
    pub watchdog: WatchdogStats,
}

/// Projected task row in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRow {
    pub task_id: TaskId,
    pub title: String,
    #[serde(rename = "task_kind")]
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<AgentId>,
    pub deps: Vec<TaskId>,
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_mode: Option<String>,
    /// Short result note, when a terminal event carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<String>,
    /// Files detected changed by this task's agent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_modified: Vec<String>,
}

/// One dependency edge: `source` must finish before `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: TaskId,
    pub target: TaskId,
}

/// Merge-queue item projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeItemRow {
    pub task_id: TaskId,
    pub status: String,
    pub judge_task_ids: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    pub merge_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeQueueSnapshot {
    pub pending: usize,
    pub in_review: usize,
    pub approved: usize,
    pub rejected: usize,
    pub merged: usize,
    pub items: Vec<MergeItemRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityStats {
    pub reviews_total: usize,
    pub reviews_passed: usize,
    pub average_score: f64,
}

/// Final quality verdict for one reviewed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    pub task_id: TaskId,
    pub score: f64,
    pub decision: String,
}

/// Per-wave review aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveReview {
    pub wave: u32,
    pub task_id: TaskId,
    pub reviews_passed: usize,
    pub reviews_total: usize,
    pub approved: bool,
}

/// Files changed per task, accumulated from `task.files_changed` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub task_id: TaskId,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub reviewed: usize,
    pub approved: usize,
    pub rejected: usize,
    pub merged: usize,
}

/// The whole observable state of a run, materialized into `state.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub state_seq: u64,
    pub timestamp: DateTime<Utc>,
    pub run_id: RunId,
    pub status: RunStatus,
    pub tasks: IndexMap<TaskId, TaskRow>,
    pub edges: Vec<Edge>,
    pub agents: Vec<AgentRecord>,
    pub merge_queue: MergeQueueSnapshot,
    /// Outbox harvest cursor per agent.
    pub cursors: BTreeMap<AgentId, u64>,
    /// Running task per agent.
    pub assignments: BTreeMap<AgentId, TaskId>,
    /// Attempt counter per task.
    pub attempts: BTreeMap<TaskId, u32>,
    /// Last ~200 journal events.
    pub timeline: Vec<TimelineEntry>,
    /// Last ~100 errors.
    pub errors: Vec<ErrorEntry>,
    /// Last ~100 orchestrator decisions.
    pub decisions: Vec<DecisionEntry>,
    /// Backend health by backend name.
    #[serde(default)]
    pub model_health: BTreeMap<String, String>,
    /// Decomposition plan summary, when one was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<serde_json::Value>,
    #[serde(default)]
    pub verification: VerificationSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifact_inventory: Vec<ArtifactEntry>,
    /// Agent log file per agent id.
    #[serde(default)]
    pub worker_log_files: BTreeMap<AgentId, PathBuf>,
    #[serde(default)]
    pub quality_stats: QualityStats,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wave_reviews: Vec<WaveReview>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quality_results: Vec<QualityResult>,
}

/// Debounced snapshot writer.
///
/// At most one write per configured interval. A request during the cooldown
/// arms a single deferred write (a second request is a no-op); the deferred
/// write fires from `flush_deferred` once the cooldown lapses. `finalize`
/// cancels any deferred write and writes synchronously, rate limit ignored.
#[derive(Debug)]
pub struct StateWriter<C: Clock> {
    path: PathBuf,
    clock: C,
    min_interval: Duration,
    last_write: Option<Instant>,
    deferred: bool,
    state_seq: u64,
}

impl<C: Clock> StateWriter<C> {
    pub fn new(path: &Path, max_writes_per_second: f64, clock: C) -> Self {
        let per_second = max_writes_per_second.max(0.1);
        Self {
            path: path.to_path_buf(),
            clock,
            min_interval: Duration::from_secs_f64(1.0 / per_second),
            last_write: None,
            deferred: false,
            state_seq: 0,
        }
    }

    /// Continue a resumed run's sequence so `state_seq` keeps increasing.
    pub fn resume_from_seq(&mut self, seq: u64) {
        self.state_seq = seq;
    }

    pub fn state_seq(&self) -> u64 {
        self.state_seq
    }

    /// Whether a deferred write is armed.
    pub fn deferred_pending(&self) -> bool {
        self.deferred
    }

    fn cooldown_elapsed(&self) -> bool {
        match self.last_write {
            None => true,
            Some(at) => self.clock.now().duration_since(at) >= self.min_interval,
        }
    }

    fn write_now(
        &mut self,
        build: impl FnOnce(u64) -> StateSnapshot,
    ) -> Result<(), BusError> {
        self.state_seq += 1;
        let snapshot = build(self.state_seq);
        write_json_atomic(&self.path, &snapshot)?;
        self.last_write = Some(self.clock.now());
        self.deferred = false;
        Ok(())
    }

    /// Request a snapshot write. Returns true when the write happened now;
    /// false when it was deferred to the end of the cooldown.
    pub fn schedule_write(
        &mut self,
        build: impl FnOnce(u64) -> StateSnapshot,
    ) -> Result<bool, BusError> {
        if self.cooldown_elapsed() {
            self.write_now(build)?;
            Ok(true)
        } else {
            self.deferred = true;
            Ok(false)
        }
    }

    /// Fire the armed deferred write if its cooldown has lapsed.
    pub fn flush_deferred(
        &mut self,
        build: impl FnOnce(u64) -> StateSnapshot,
    ) -> Result<bool, BusError> {
        if self.deferred && self.cooldown_elapsed() {
            self.write_now(build)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Shutdown path: cancel any deferred write and write synchronously.
    pub fn finalize(
        &mut self,
        build: impl FnOnce(u64) -> StateSnapshot,
    ) -> Result<(), BusError> {
        self.deferred = false;
        self.write_now(build)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
