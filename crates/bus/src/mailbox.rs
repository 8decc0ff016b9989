// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock-protected mailbox operations.
//!
//! Each write is one critical section: acquire the box's lock, read the
//! current document, append with the next sequence, rewrite atomically,
//! release. Sequence assignment lives in the document types
//! ([`fm_core::AgentInbox`] / [`fm_core::AgentOutbox`]), so observers reading
//! under the same lock always see gap-free, monotonic sequences.

use crate::atomic::{read_json_or, write_json_atomic};
use crate::layout::RunLayout;
use crate::lock::FileLock;
use crate::BusError;
use chrono::{DateTime, Utc};
use fm_core::{
    AgentId, AgentInbox, AgentOutbox, InboxMessage, MessageKind, OutboxEvent, OutboxEventKind,
    TaskId,
};

/// One event to append to an outbox, before sequence assignment.
#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: OutboxEventKind,
    pub task_id: Option<TaskId>,
    pub payload: serde_json::Value,
    pub token_usage: Option<u64>,
    pub cost_usd: Option<f64>,
}

/// Mailbox IO over a run layout.
#[derive(Debug, Clone)]
pub struct Mailboxes {
    layout: RunLayout,
}

impl Mailboxes {
    pub fn new(layout: RunLayout) -> Self {
        Self { layout }
    }

    /// Create empty inbox/outbox documents for an agent if absent.
    pub fn ensure(&self, agent_id: &AgentId) -> Result<(), BusError> {
        let inbox_path = self.layout.inbox_path(agent_id);
        if !inbox_path.exists() {
            write_json_atomic(&inbox_path, &AgentInbox::new(agent_id.clone()))?;
        }
        let outbox_path = self.layout.outbox_path(agent_id);
        if !outbox_path.exists() {
            write_json_atomic(&outbox_path, &AgentOutbox::new(agent_id.clone()))?;
        }
        Ok(())
    }

    /// Append one message to an agent's inbox. Returns the message as written.
    pub fn push_inbox(
        &self,
        agent_id: &AgentId,
        timestamp: DateTime<Utc>,
        kind: MessageKind,
        task_id: Option<TaskId>,
        payload: serde_json::Value,
        requires_ack: bool,
    ) -> Result<InboxMessage, BusError> {
        let _lock = FileLock::acquire(&self.layout.inbox_lock_path(agent_id))?;
        let path = self.layout.inbox_path(agent_id);
        let mut inbox = read_json_or(&path, AgentInbox::new(agent_id.clone()))?;
        let message = inbox.push(timestamp, kind, task_id, payload, requires_ack).clone();
        write_json_atomic(&path, &inbox)?;
        Ok(message)
    }

    /// Append harvested events to an agent's outbox. Returns the events as
    /// written, with their assigned sequence numbers.
    pub fn append_outbox(
        &self,
        agent_id: &AgentId,
        entries: Vec<OutboxEntry>,
    ) -> Result<Vec<OutboxEvent>, BusError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let _lock = FileLock::acquire(&self.layout.outbox_lock_path(agent_id))?;
        let path = self.layout.outbox_path(agent_id);
        let mut outbox = read_json_or(&path, AgentOutbox::new(agent_id.clone()))?;

        let start = outbox.events.len();
        for entry in entries {
            outbox.push(
                entry.timestamp,
                entry.kind,
                entry.task_id,
                entry.payload,
                entry.token_usage,
                entry.cost_usd,
            );
        }
        write_json_atomic(&path, &outbox)?;
        Ok(outbox.events[start..].to_vec())
    }

    pub fn read_inbox(&self, agent_id: &AgentId) -> Result<AgentInbox, BusError> {
        let _lock = FileLock::acquire(&self.layout.inbox_lock_path(agent_id))?;
        read_json_or(&self.layout.inbox_path(agent_id), AgentInbox::new(agent_id.clone()))
    }

    pub fn read_outbox(&self, agent_id: &AgentId) -> Result<AgentOutbox, BusError> {
        let _lock = FileLock::acquire(&self.layout.outbox_lock_path(agent_id))?;
        read_json_or(&self.layout.outbox_path(agent_id), AgentOutbox::new(agent_id.clone()))
    }
}

#[cfg(test)]
#[path = "mailbox_tests.rs"]
mod tests;
