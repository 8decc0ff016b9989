// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifier, kind, and status state machine.
//!
//! A task is the unit of work dispatched to an agent. Tasks are created by
//! the decomposer (or by the review pipeline, for auto-generated review and
//! merge tasks), mutated only through validated status transitions, and never
//! destroyed for the life of the run.

use crate::agent::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::string_id! {
    /// Unique identifier for a task.
    ///
    /// Decomposer tasks are numbered `t0`, `t1`, ...; auto-generated review
    /// and merge tasks use `review-{task}-{role}` and `merge-{task}`.
    pub struct TaskId;
}

/// What kind of work a task asks for. Drives prompt synthesis, role matching,
/// and whether completion claims pass through the review pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Analysis,
    Design,
    Implement,
    Test,
    Integrate,
    Judge,
    Critic,
    Merge,
}

impl TaskKind {
    /// Whether a `task_done` claim for this kind must be validated by the
    /// review-and-merge pipeline before the task counts as done.
    ///
    /// Review, merge, and planning kinds bypass review: their own completion
    /// is the final word.
    pub fn is_reviewable(self) -> bool {
        !matches!(
            self,
            TaskKind::Judge | TaskKind::Critic | TaskKind::Merge | TaskKind::Analysis
                | TaskKind::Design
        )
    }
}

crate::simple_display! {
    TaskKind {
        Analysis => "analysis",
        Design => "design",
        Implement => "implement",
        Test => "test",
        Integrate => "integrate",
        Judge => "judge",
        Critic => "critic",
        Merge => "merge",
    }
}

/// Status of a task in the scheduling state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, dependencies not yet satisfied
    Pending,
    /// Eligible for dispatch
    Ready,
    /// Assigned to an agent
    Running,
    /// Completion claimed, review pipeline in progress
    Reviewing,
    /// Terminal success
    Done,
    /// Terminal failure
    Failed,
    /// Parked until dependencies unblock
    Blocked,
    /// Terminal, intentionally not executed
    Skipped,
}

impl TaskStatus {
    /// Whether `to` is a legal next status from this one.
    ///
    /// This is the authoritative transition table; any transition it rejects
    /// is recorded as an error and ignored by callers.
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        match self {
            Pending => matches!(to, Ready | Running | Failed | Blocked),
            Ready => matches!(to, Running | Failed | Blocked),
            Running => matches!(to, Reviewing | Done | Failed | Ready),
            Reviewing => matches!(to, Done | Failed | Ready),
            Blocked => matches!(to, Ready | Failed),
            Done | Failed | Skipped => false,
        }
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed | TaskStatus::Skipped)
    }

    /// Statuses that satisfy a dependency edge.
    pub fn satisfies_dependency(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Skipped)
    }
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Ready => "ready",
        Running => "running",
        Reviewing => "reviewing",
        Done => "done",
        Failed => "failed",
        Blocked => "blocked",
        Skipped => "skipped",
    }
}

pub const DEFAULT_PRIORITY: i32 = 50;

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// A unit of work in the task DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub title: String,
    pub description: String,
    #[serde(rename = "task_kind")]
    pub kind: TaskKind,
    /// Task ids that must reach `done` or `skipped` before this task is ready.
    #[serde(default)]
    pub deps: Vec<TaskId>,
    /// Preferred role for assignment; the scheduler falls back to any worker
    /// role accepting the kind when no exact match is free.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_hint: Option<String>,
    /// Lower is more urgent.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Files the worker is expected to touch, surfaced in the prompt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_files: Vec<String>,
    /// Acceptance criteria surfaced to the worker and to reviewers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance: Vec<String>,
    #[serde(default = "Task::default_status")]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<AgentId>,
    /// Short explanation recorded when the task terminally fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_mode: Option<String>,
}

impl Task {
    fn default_status() -> TaskStatus {
        TaskStatus::Pending
    }

    /// Create a pending task with default priority and no dependencies.
    pub fn new(task_id: impl Into<TaskId>, title: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            task_id: task_id.into(),
            title: title.into(),
            description: String::new(),
            kind,
            deps: Vec::new(),
            role_hint: None,
            priority: DEFAULT_PRIORITY,
            target_files: Vec::new(),
            acceptance: Vec::new(),
            status: TaskStatus::Pending,
            assigned_agent_id: None,
            failure_mode: None,
        }
    }
}

/// One validated status change, kept per task and mirrored to the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub task_id: TaskId,
    pub from_state: TaskStatus,
    pub to_state: TaskStatus,
    /// Who drove the transition: "coordinator", "watchdog", "review", a role type.
    pub actor: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            task_id: TaskId = "t0",
            title: String = "test task",
            description: String = "",
        }
        set {
            kind: TaskKind = TaskKind::Implement,
            deps: Vec<TaskId> = Vec::new(),
            priority: i32 = DEFAULT_PRIORITY,
            target_files: Vec<String> = Vec::new(),
            acceptance: Vec<String> = Vec::new(),
            status: TaskStatus = TaskStatus::Pending,
        }
        option {
            role_hint: String = None,
            assigned_agent_id: AgentId = None,
            failure_mode: String = None,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
