// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task records under `tasks/task-{id}.json`.
//!
//! Each record is the durable view of one task: current status, attempts, a
//! bounded transition tail, and a validation block listing the review tasks
//! that depend on it. Written atomically on every transition so the files
//! stay inspectable after a crash.

use crate::atomic::{read_json_opt, write_json_atomic};
use crate::layout::RunLayout;
use crate::BusError;
use chrono::{DateTime, Utc};
use fm_core::{AgentId, TaskId, TaskKind, TaskStatus, TransitionRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many trailing transitions a task record keeps.
pub const TRANSITION_TAIL: usize = 30;

/// Review tasks depending on this task and their statuses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSnapshot {
    pub review_task_ids: Vec<TaskId>,
    pub statuses: BTreeMap<TaskId, TaskStatus>,
}

/// Durable per-task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub title: String,
    pub description: String,
    pub deps: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_hint: Option<String>,
    #[serde(rename = "task_kind")]
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<AgentId>,
    /// Last [`TRANSITION_TAIL`] transitions, oldest first.
    #[serde(default)]
    pub transitions: Vec<TransitionRecord>,
    #[serde(default)]
    pub validation: ValidationSnapshot,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Trim the transition tail to the configured bound, keeping the newest.
    pub fn trim_transitions(&mut self) {
        if self.transitions.len() > TRANSITION_TAIL {
            let excess = self.transitions.len() - TRANSITION_TAIL;
            self.transitions.drain(..excess);
        }
    }
}

/// Persist a task record atomically.
pub fn write_task_record(layout: &RunLayout, record: &TaskRecord) -> Result<(), BusError> {
    write_json_atomic(&layout.task_path(&record.task_id), record)
}

/// Read a task record, if one exists.
pub fn read_task_record(
    layout: &RunLayout,
    task_id: &TaskId,
) -> Result<Option<TaskRecord>, BusError> {
    read_json_opt(&layout.task_path(task_id))
}

#[cfg(test)]
#[path = "task_record_tests.rs"]
mod tests;
