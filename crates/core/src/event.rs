// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator-visible events.
//!
//! Every observable occurrence (spawns, harvested worker events, task
//! transitions, decomposition decisions, watchdog actions, errors) is an
//! [`Event`]. Events serialize as `{"type": "dotted.name", "payload": {...}}`
//! and are wrapped in a [`JournalEvent`] envelope carrying the timestamp and
//! run id when appended to the journal.

use crate::agent::AgentId;
use crate::mailbox::OutboxEventKind;
use crate::role::WorkspaceMode;
use crate::task::{TaskId, TaskKind, TransitionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a finished task attempt was classified by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Success,
    Failure,
    SilentTimeout,
    DurationExceeded,
}

crate::simple_display! {
    Classification {
        Success => "success",
        Failure => "failure",
        SilentTimeout => "silent_timeout",
        DurationExceeded => "duration_exceeded",
    }
}

/// Events appended to the run journal.
///
/// Serializes with `{"type": "name.with.dots", "payload": {...fields}}`.
/// Unknown type tags deserialize to `Custom` so old journals stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    // -- run --
    #[serde(rename = "swarm.start")]
    SwarmStart { goal: String, role_count: usize, task_count: usize, resume: bool },

    // -- agent --
    #[serde(rename = "agent.spawned")]
    AgentSpawned {
        agent_id: AgentId,
        role_id: String,
        backend: String,
        model: String,
        cwd: PathBuf,
        workspace_mode: WorkspaceMode,
        /// "worktree" when the agent got a dedicated tree, "shared" otherwise.
        workspace_effective: String,
    },

    #[serde(rename = "agent.restart")]
    AgentRestart { agent_id: AgentId },

    #[serde(rename = "agent.terminated")]
    AgentTerminated { agent_id: AgentId, reason: String },

    /// Task prompt handed to an agent
    #[serde(rename = "agent.task.launch")]
    TaskLaunch { agent_id: AgentId, task_id: TaskId, task_kind: TaskKind },

    /// One event harvested from an agent's outbox
    #[serde(rename = "agent.event")]
    AgentEvent {
        agent_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<TaskId>,
        event_type: OutboxEventKind,
        payload: serde_json::Value,
    },

    /// Terminal marker observed for an assigned task
    #[serde(rename = "agent.task.exit")]
    TaskExit { agent_id: AgentId, task_id: TaskId, result: String },

    /// Coordinator's verdict on a finished attempt
    #[serde(rename = "agent.task.classified")]
    TaskClassified {
        agent_id: AgentId,
        task_id: TaskId,
        classification: Classification,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_seconds: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_seconds: Option<f64>,
    },

    // -- task --
    #[serde(rename = "task.created")]
    TaskCreated {
        task_id: TaskId,
        task_kind: TaskKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role_hint: Option<String>,
        deps: Vec<TaskId>,
    },

    #[serde(rename = "task.transition")]
    TaskTransition(TransitionRecord),

    /// Best-effort diff of an agent's workspace after a completion claim
    #[serde(rename = "task.files_changed")]
    FilesChanged { agent_id: AgentId, task_id: TaskId, files: Vec<String>, cwd: PathBuf },

    // -- decomposition --
    #[serde(rename = "decomposition.parallel")]
    DecompositionParallel { worker_count: u32, parallel_tasks: usize, total_tasks: usize },

    #[serde(rename = "decomposition.fallback")]
    DecompositionFallback { reason: String, mode: String },

    // -- errors --
    #[serde(rename = "error")]
    Error { category: String, message: String, severity: String },

    // -- debug (gated by run.debug) --
    #[serde(rename = "debug.agent.command")]
    DebugAgentCommand {
        agent_id: AgentId,
        command: Vec<String>,
        cwd: PathBuf,
        env_keys: Vec<String>,
    },

    #[serde(rename = "debug.task.prompt_sent")]
    DebugPromptSent { agent_id: AgentId, task_id: TaskId, prompt: String },

    #[serde(rename = "debug.watchdog.silence_check")]
    DebugSilenceCheck {
        agent_id: AgentId,
        task_id: TaskId,
        elapsed_seconds: f64,
        threshold_seconds: f64,
    },

    #[serde(rename = "debug.watchdog.duration_check")]
    DebugDurationCheck {
        agent_id: AgentId,
        task_id: TaskId,
        elapsed_seconds: f64,
        threshold_seconds: f64,
    },

    /// Catch-all for unknown event types (forward compatibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    /// Dotted event type identifier, as written to the journal.
    pub fn name(&self) -> &'static str {
        match self {
            Event::SwarmStart { .. } => "swarm.start",
            Event::AgentSpawned { .. } => "agent.spawned",
            Event::AgentRestart { .. } => "agent.restart",
            Event::AgentTerminated { .. } => "agent.terminated",
            Event::TaskLaunch { .. } => "agent.task.launch",
            Event::AgentEvent { .. } => "agent.event",
            Event::TaskExit { .. } => "agent.task.exit",
            Event::TaskClassified { .. } => "agent.task.classified",
            Event::TaskCreated { .. } => "task.created",
            Event::TaskTransition(_) => "task.transition",
            Event::FilesChanged { .. } => "task.files_changed",
            Event::DecompositionParallel { .. } => "decomposition.parallel",
            Event::DecompositionFallback { .. } => "decomposition.fallback",
            Event::Error { .. } => "error",
            Event::DebugAgentCommand { .. } => "debug.agent.command",
            Event::DebugPromptSent { .. } => "debug.task.prompt_sent",
            Event::DebugSilenceCheck { .. } => "debug.watchdog.silence_check",
            Event::DebugDurationCheck { .. } => "debug.watchdog.duration_check",
            Event::Custom => "custom",
        }
    }

    /// Short human-readable summary for timeline entries and log lines.
    pub fn log_summary(&self) -> String {
        match self {
            Event::SwarmStart { goal, role_count, task_count, .. } => {
                format!("start roles={role_count} tasks={task_count} goal={goal}")
            }
            Event::AgentSpawned { agent_id, backend, .. } => {
                format!("spawned {agent_id} backend={backend}")
            }
            Event::AgentRestart { agent_id } => format!("restarted {agent_id}"),
            Event::AgentTerminated { agent_id, reason } => {
                format!("terminated {agent_id}: {reason}")
            }
            Event::TaskLaunch { agent_id, task_id, task_kind } => {
                format!("{task_id} ({task_kind}) -> {agent_id}")
            }
            Event::AgentEvent { agent_id, event_type, .. } => {
                format!("{agent_id} emitted {event_type}")
            }
            Event::TaskExit { agent_id, task_id, result } => {
                format!("{task_id} on {agent_id}: {result}")
            }
            Event::TaskClassified { task_id, classification, .. } => {
                format!("{task_id} classified {classification}")
            }
            Event::TaskCreated { task_id, task_kind, .. } => {
                format!("created {task_id} ({task_kind})")
            }
            Event::TaskTransition(t) => {
                format!("{} {} -> {} by {}", t.task_id, t.from_state, t.to_state, t.actor)
            }
            Event::FilesChanged { task_id, files, .. } => {
                format!("{task_id} changed {} file(s)", files.len())
            }
            Event::DecompositionParallel { parallel_tasks, total_tasks, .. } => {
                format!("parallel decomposition: {parallel_tasks}/{total_tasks} tasks")
            }
            Event::DecompositionFallback { reason, mode } => {
                format!("decomposition fallback to {mode}: {reason}")
            }
            Event::Error { category, message, .. } => format!("{category}: {message}"),
            Event::DebugAgentCommand { agent_id, .. } => format!("debug command {agent_id}"),
            Event::DebugPromptSent { agent_id, task_id, .. } => {
                format!("debug prompt {task_id} -> {agent_id}")
            }
            Event::DebugSilenceCheck { task_id, elapsed_seconds, .. } => {
                format!("debug silence {task_id} {elapsed_seconds:.1}s")
            }
            Event::DebugDurationCheck { task_id, elapsed_seconds, .. } => {
                format!("debug duration {task_id} {elapsed_seconds:.1}s")
            }
            Event::Custom => "custom event".to_string(),
        }
    }

    /// Debug events are suppressed unless the run has `debug` enabled.
    pub fn is_debug(&self) -> bool {
        matches!(
            self,
            Event::DebugAgentCommand { .. }
                | Event::DebugPromptSent { .. }
                | Event::DebugSilenceCheck { .. }
                | Event::DebugDurationCheck { .. }
        )
    }
}

/// Journal envelope: one line of `events.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEvent {
    pub timestamp: DateTime<Utc>,
    pub run_id: crate::id::RunId,
    #[serde(flatten)]
    pub event: Event,
}

/// Bounded timeline entry in the state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub summary: String,
}

/// Bounded error entry in the state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub message: String,
    pub severity: String,
}

/// Bounded orchestrator-decision entry in the state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub decision: String,
    pub detail: String,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
