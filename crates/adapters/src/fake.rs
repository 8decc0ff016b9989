// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable in-memory agent adapter for tests.
//!
//! Each `send` consumes the next scripted outcome for that agent and turns it
//! into buffered stream events, so coordinator tests can drive full
//! dispatch/harvest cycles without real processes. Liveness is test-driven:
//! the fake's notion of "now" and per-agent heartbeats are set explicitly.

use crate::process::{AgentAdapter, AgentProcessSpec, AgentProcessStatus, AgentStreamEvent};
use crate::AgentAdapterError;
use async_trait::async_trait;
use chrono::DateTime;
use fm_core::{AgentId, OutboxEventKind};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the fake agent does with the next prompt line it receives.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Progress lines, then `task_done` carrying the given usage.
    Done { progress: Vec<String>, tokens: Option<u64>, cost_usd: Option<f64> },
    /// Progress lines, then `task_failed`.
    Failed { progress: Vec<String> },
    /// No events at all (for silence-timeout tests).
    Silent,
}

impl ScriptedOutcome {
    pub fn done() -> Self {
        ScriptedOutcome::Done { progress: vec![], tokens: None, cost_usd: None }
    }

    pub fn failed() -> Self {
        ScriptedOutcome::Failed { progress: vec![] }
    }
}

#[derive(Default)]
struct FakeAgent {
    spawn_count: u32,
    running: bool,
    exit_code: Option<i32>,
    last_heartbeat_ms: u64,
    stderr_tail: String,
    events: Vec<AgentStreamEvent>,
    script: VecDeque<ScriptedOutcome>,
    sent: Vec<String>,
    terminations: Vec<String>,
}

impl FakeAgent {
    fn push_event(
        &mut self,
        now_ms: u64,
        kind: OutboxEventKind,
        payload: serde_json::Value,
        tokens: Option<u64>,
        cost_usd: Option<f64>,
    ) {
        let seq = self.events.len() as u64 + 1;
        self.events.push(AgentStreamEvent {
            seq,
            timestamp: DateTime::from_timestamp_millis(now_ms as i64).unwrap_or_default(),
            kind,
            payload,
            token_usage: tokens,
            cost_usd,
        });
    }
}

/// In-memory [`AgentAdapter`] with scripted behavior and recorded calls.
#[derive(Clone, Default)]
pub struct FakeAgentAdapter {
    now_ms: Arc<AtomicU64>,
    agents: Arc<Mutex<HashMap<AgentId, FakeAgent>>>,
}

impl FakeAgentAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fake's wall clock, used to stamp events and fresh heartbeats.
    pub fn set_now_ms(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }

    /// Queue the outcome for the agent's next prompt line.
    pub fn script(&self, agent_id: &AgentId, outcome: ScriptedOutcome) {
        self.agents.lock().entry(agent_id.clone()).or_default().script.push_back(outcome);
    }

    /// Prompt lines the agent has received, in order.
    pub fn sent_lines(&self, agent_id: &AgentId) -> Vec<String> {
        self.agents.lock().get(agent_id).map(|a| a.sent.clone()).unwrap_or_default()
    }

    pub fn spawn_count(&self, agent_id: &AgentId) -> u32 {
        self.agents.lock().get(agent_id).map(|a| a.spawn_count).unwrap_or(0)
    }

    pub fn terminations(&self, agent_id: &AgentId) -> Vec<String> {
        self.agents.lock().get(agent_id).map(|a| a.terminations.clone()).unwrap_or_default()
    }

    /// Simulate the process dying without a terminal marker.
    pub fn mark_exited(&self, agent_id: &AgentId, exit_code: Option<i32>, stderr_tail: &str) {
        let mut agents = self.agents.lock();
        let agent = agents.entry(agent_id.clone()).or_default();
        agent.running = false;
        agent.exit_code = exit_code;
        agent.stderr_tail = stderr_tail.to_string();
    }

    /// Pin an agent's heartbeat to a specific timestamp.
    pub fn set_heartbeat_ms(&self, agent_id: &AgentId, ms: u64) {
        self.agents.lock().entry(agent_id.clone()).or_default().last_heartbeat_ms = ms;
    }

    /// Inject a progress event outside the scripted flow.
    pub fn emit_progress(
        &self,
        agent_id: &AgentId,
        line: &str,
        tokens: Option<u64>,
        cost_usd: Option<f64>,
    ) {
        let now = self.now_ms.load(Ordering::SeqCst);
        let mut agents = self.agents.lock();
        let agent = agents.entry(agent_id.clone()).or_default();
        agent.push_event(now, OutboxEventKind::Progress, json!({ "line": line }), tokens, cost_usd);
        agent.last_heartbeat_ms = now;
    }
}

#[async_trait]
impl AgentAdapter for FakeAgentAdapter {
    async fn spawn(&self, spec: AgentProcessSpec) -> Result<(), AgentAdapterError> {
        let now = self.now_ms.load(Ordering::SeqCst);
        let mut agents = self.agents.lock();
        let agent = agents.entry(spec.agent_id.clone()).or_default();
        agent.spawn_count += 1;
        agent.running = true;
        agent.exit_code = None;
        agent.events.clear();
        agent.last_heartbeat_ms = now;
        Ok(())
    }

    async fn send(&self, agent_id: &AgentId, line: &str) -> Result<(), AgentAdapterError> {
        let now = self.now_ms.load(Ordering::SeqCst);
        let mut agents = self.agents.lock();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| AgentAdapterError::NotFound(agent_id.to_string()))?;
        agent.sent.push(line.to_string());

        match agent.script.pop_front() {
            Some(ScriptedOutcome::Done { progress, tokens, cost_usd }) => {
                for text in progress {
                    agent.push_event(
                        now,
                        OutboxEventKind::Progress,
                        json!({ "line": text }),
                        None,
                        None,
                    );
                }
                agent.push_event(now, OutboxEventKind::TaskDone, json!({}), tokens, cost_usd);
                agent.last_heartbeat_ms = now;
            }
            Some(ScriptedOutcome::Failed { progress }) => {
                for text in progress {
                    agent.push_event(
                        now,
                        OutboxEventKind::Progress,
                        json!({ "line": text }),
                        None,
                        None,
                    );
                }
                agent.push_event(now, OutboxEventKind::TaskFailed, json!({}), None, None);
                agent.last_heartbeat_ms = now;
            }
            Some(ScriptedOutcome::Silent) | None => {}
        }
        Ok(())
    }

    async fn read_events(
        &self,
        agent_id: &AgentId,
        since_seq: u64,
    ) -> Result<Vec<AgentStreamEvent>, AgentAdapterError> {
        let agents = self.agents.lock();
        let agent = agents
            .get(agent_id)
            .ok_or_else(|| AgentAdapterError::NotFound(agent_id.to_string()))?;
        Ok(agent.events.iter().filter(|e| e.seq > since_seq).cloned().collect())
    }

    async fn status(&self, agent_id: &AgentId) -> Result<AgentProcessStatus, AgentAdapterError> {
        let agents = self.agents.lock();
        let agent = agents
            .get(agent_id)
            .ok_or_else(|| AgentAdapterError::NotFound(agent_id.to_string()))?;
        Ok(AgentProcessStatus {
            running: agent.running,
            exit_code: agent.exit_code,
            last_heartbeat_ms: agent.last_heartbeat_ms,
            stderr_tail: agent.stderr_tail.clone(),
            pid: None,
        })
    }

    async fn terminate(
        &self,
        agent_id: &AgentId,
        reason: &str,
        _grace: Duration,
    ) -> Result<Option<i32>, AgentAdapterError> {
        let mut agents = self.agents.lock();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| AgentAdapterError::NotFound(agent_id.to_string()))?;
        agent.running = false;
        agent.terminations.push(reason.to_string());
        Ok(agent.exit_code)
    }
}
