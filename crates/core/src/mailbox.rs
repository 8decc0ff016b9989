// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent inbox and outbox documents.
//!
//! Mailboxes are the coordinator-facing halves of the file IPC bus: the inbox
//! carries coordinator-to-agent messages, the outbox carries harvested agent
//! events. Both documents keep a monotonic per-box sequence: appending always
//! assigns `next_seq` and advances it, so sequence numbers are gap-free and
//! an event is never renumbered or rewritten after the fact.

use crate::agent::AgentId;
use crate::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn first_seq() -> u64 {
    1
}

/// Kind of a coordinator-to-agent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Task assignment carrying the prompt context
    TaskAssign,
    /// Orderly shutdown notice written before termination
    Shutdown,
}

crate::simple_display! {
    MessageKind {
        TaskAssign => "task_assign",
        Shutdown => "shutdown",
    }
}

/// One message in an agent's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub seq: u64,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub payload: serde_json::Value,
    pub requires_ack: bool,
}

/// Per-agent inbox document, rewritten atomically under the inbox lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInbox {
    pub agent_id: AgentId,
    #[serde(default)]
    pub messages: Vec<InboxMessage>,
    #[serde(default = "first_seq")]
    pub next_seq: u64,
}

impl AgentInbox {
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id, messages: Vec::new(), next_seq: 1 }
    }

    /// Append a message, assigning the next sequence number and a message id
    /// of the form `{agent_id}-m{seq}`. Returns the appended message.
    pub fn push(
        &mut self,
        timestamp: DateTime<Utc>,
        kind: MessageKind,
        task_id: Option<TaskId>,
        payload: serde_json::Value,
        requires_ack: bool,
    ) -> &InboxMessage {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.messages.push(InboxMessage {
            seq,
            message_id: format!("{}-m{}", self.agent_id, seq),
            timestamp,
            kind,
            task_id,
            payload,
            requires_ack,
        });
        // Invariant: push above makes the vec non-empty.
        &self.messages[self.messages.len() - 1]
    }
}

/// Kind of a harvested agent event.
///
/// Heartbeat markers are consumed by the process adapter for liveness and are
/// never materialized here; every assigned task yields exactly one terminal
/// `task_done` or `task_failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxEventKind {
    TaskDone,
    TaskFailed,
    Progress,
}

impl OutboxEventKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, OutboxEventKind::TaskDone | OutboxEventKind::TaskFailed)
    }
}

crate::simple_display! {
    OutboxEventKind {
        TaskDone => "task_done",
        TaskFailed => "task_failed",
        Progress => "progress",
    }
}

/// One harvested event in an agent's outbox. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub seq: u64,
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: OutboxEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
}

/// Per-agent outbox document, rewritten atomically under the outbox lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutbox {
    pub agent_id: AgentId,
    #[serde(default)]
    pub events: Vec<OutboxEvent>,
    #[serde(default = "first_seq")]
    pub next_seq: u64,
}

impl AgentOutbox {
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id, events: Vec::new(), next_seq: 1 }
    }

    /// Append an event, assigning the next sequence number and an event id of
    /// the form `{agent_id}-e{seq}`. Returns the appended event.
    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &mut self,
        timestamp: DateTime<Utc>,
        kind: OutboxEventKind,
        task_id: Option<TaskId>,
        payload: serde_json::Value,
        token_usage: Option<u64>,
        cost_usd: Option<f64>,
    ) -> &OutboxEvent {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(OutboxEvent {
            seq,
            event_id: format!("{}-e{}", self.agent_id, seq),
            timestamp,
            kind,
            task_id,
            payload,
            token_usage,
            cost_usd,
        });
        &self.events[self.events.len() - 1]
    }
}

#[cfg(test)]
#[path = "mailbox_tests.rs"]
mod tests;
