// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task DAG and state machine.
//!
//! The canonical in-memory task collection: creation-ordered task map,
//! per-task attempt counters, and the transition log. All status mutation
//! funnels through [`TaskGraph::transition`], which validates against the
//! authoritative table; callers record rejected transitions as errors and
//! move on.

use chrono::{DateTime, Utc};
use fm_core::{Task, TaskId, TaskStatus, TransitionRecord};
use indexmap::IndexMap;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("unknown task")]
    UnknownTask,
    #[error("illegal transition from {from}")]
    Invalid { from: TaskStatus },
}

/// Creation-ordered task collection with attempts and transition history.
#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: IndexMap<TaskId, Task>,
    attempts: HashMap<TaskId, u32>,
    transition_log: Vec<TransitionRecord>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut graph = Self::new();
        for task in tasks {
            graph.insert(task);
        }
        graph
    }

    /// Add a task, keeping its given status. Re-inserting an existing id
    /// replaces the record but keeps its attempt count.
    pub fn insert(&mut self, task: Task) {
        self.attempts.entry(task.task_id.clone()).or_insert(0);
        self.tasks.insert(task.task_id.clone(), task);
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn get_mut(&mut self, task_id: &TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(task_id)
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn status(&self, task_id: &TaskId) -> Option<TaskStatus> {
        self.tasks.get(task_id).map(|t| t.status)
    }

    pub fn attempts(&self, task_id: &TaskId) -> u32 {
        self.attempts.get(task_id).copied().unwrap_or(0)
    }

    /// Increment and return the new attempt count (dispatch counting).
    pub fn increment_attempt(&mut self, task_id: &TaskId) -> u32 {
        let count = self.attempts.entry(task_id.clone()).or_insert(0);
        *count += 1;
        *count
    }

    /// Restore an attempt counter from persisted state.
    pub fn set_attempts(&mut self, task_id: &TaskId, attempts: u32) {
        self.attempts.insert(task_id.clone(), attempts);
    }

    /// Validated status change.
    ///
    /// A same-status request is a no-op (`Ok(None)`). On success the task's
    /// status is updated, a transition record is appended to the log and
    /// returned; terminal failure also stamps `failure_mode`.
    pub fn transition(
        &mut self,
        task_id: &TaskId,
        to: TaskStatus,
        actor: &str,
        reason: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<TransitionRecord>, TransitionError> {
        let task = self.tasks.get_mut(task_id).ok_or(TransitionError::UnknownTask)?;
        let from = task.status;
        if from == to {
            return Ok(None);
        }
        if !from.can_transition_to(to) {
            return Err(TransitionError::Invalid { from });
        }
        task.status = to;
        if to == TaskStatus::Failed {
            task.failure_mode = Some(reason.to_string());
        }
        if to == TaskStatus::Ready {
            task.assigned_agent_id = None;
        }
        let record = TransitionRecord {
            task_id: task_id.clone(),
            from_state: from,
            to_state: to,
            actor: actor.to_string(),
            reason: reason.to_string(),
            timestamp,
        };
        self.transition_log.push(record.clone());
        Ok(Some(record))
    }

    /// Whether every dependency of `task` has reached a satisfying terminal
    /// state. Unknown dependency ids never satisfy.
    pub fn deps_satisfied(&self, task: &Task) -> bool {
        task.deps.iter().all(|dep| {
            self.status(dep).map(TaskStatus::satisfies_dependency).unwrap_or(false)
        })
    }

    /// The dispatchable set: explicitly `ready` tasks, plus `pending` tasks
    /// whose dependencies are all satisfied. Sorted by priority (lower
    /// first), ties broken by creation order.
    pub fn ready_tasks(&self) -> Vec<TaskId> {
        let mut ready: Vec<(i32, usize, TaskId)> = self
            .tasks
            .values()
            .enumerate()
            .filter_map(|(index, task)| {
                let eligible = match task.status {
                    TaskStatus::Ready => true,
                    TaskStatus::Pending => self.deps_satisfied(task),
                    _ => false,
                };
                eligible.then(|| (task.priority, index, task.task_id.clone()))
            })
            .collect();
        ready.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        ready.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Whether every task has reached a terminal status.
    pub fn all_terminal(&self) -> bool {
        self.tasks.values().all(|t| t.status.is_terminal())
    }

    /// Dependency edges as (source, target): source must finish first.
    pub fn edges(&self) -> Vec<(TaskId, TaskId)> {
        self.tasks
            .values()
            .flat_map(|task| {
                task.deps.iter().map(move |dep| (dep.clone(), task.task_id.clone()))
            })
            .collect()
    }

    pub fn transition_log(&self) -> &[TransitionRecord] {
        &self.transition_log
    }

    /// Restore transition history from persisted task records.
    pub fn extend_transition_log(&mut self, records: impl IntoIterator<Item = TransitionRecord>) {
        self.transition_log.extend(records);
    }

    /// Transitions for one task, oldest first.
    pub fn transitions_for(&self, task_id: &TaskId) -> Vec<TransitionRecord> {
        self.transition_log.iter().filter(|r| &r.task_id == task_id).cloned().collect()
    }
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
