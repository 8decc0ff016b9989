// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task timers and the agent watchdog.

use super::Coordinator;
use crate::error::EngineError;
use crate::watchdog;
use fm_adapters::{AgentAdapter, AgentProcessStatus};
use fm_core::{
    AgentId, AgentRecord, AgentStatus, Classification, Clock, Event, TaskStatus,
};
use std::collections::HashMap;

const RECORD_STDERR_CAP: usize = 800;

/// Render a threshold the way it reads in failure reasons: `1s`, `2.5s`.
fn fmt_secs(seconds: f64) -> String {
    if (seconds - seconds.round()).abs() < 1e-9 {
        format!("{}", seconds.round() as i64)
    } else {
        format!("{seconds}")
    }
}

impl<A: AgentAdapter, C: Clock> Coordinator<A, C> {
    /// Fail running tasks that have emitted nothing within the silence
    /// timeout.
    pub(crate) async fn enforce_silence_timeouts(&mut self) -> Result<(), EngineError> {
        let timeout_s = self.config.watchdog.task_silence_timeout().as_secs_f64();
        let now = self.clock.epoch_ms();

        for (agent_id, task_id) in self.running_by_agent.clone() {
            let last = self.last_progress_ms.get(&task_id).copied().unwrap_or(now);
            let elapsed = now.saturating_sub(last) as f64 / 1000.0;
            self.emit(Event::DebugSilenceCheck {
                agent_id: agent_id.clone(),
                task_id: task_id.clone(),
                elapsed_seconds: elapsed,
                threshold_seconds: timeout_s,
            })?;
            if elapsed <= timeout_s {
                continue;
            }
            let reason = format!("silent_timeout>{}s", fmt_secs(timeout_s));
            self.handle_task_failed(
                &agent_id,
                &task_id,
                reason,
                Classification::SilentTimeout,
                Some(timeout_s),
                None,
            )
            .await?;
        }
        Ok(())
    }

    /// Fail running tasks whose total runtime exceeds the hard ceiling.
    /// Silence and duration may both be due in one tick; whichever fires
    /// first consumes the assignment, so a task fails at most once per
    /// attempt.
    pub(crate) async fn enforce_duration_limits(&mut self) -> Result<(), EngineError> {
        let max_s = self.config.watchdog.task_max_duration().as_secs_f64();
        let now = self.clock.epoch_ms();

        for (agent_id, task_id) in self.running_by_agent.clone() {
            let Some(started) = self.started_at_ms.get(&task_id).copied() else {
                continue;
            };
            let elapsed = now.saturating_sub(started) as f64 / 1000.0;
            self.emit(Event::DebugDurationCheck {
                agent_id: agent_id.clone(),
                task_id: task_id.clone(),
                elapsed_seconds: elapsed,
                threshold_seconds: max_s,
            })?;
            if elapsed <= max_s {
                continue;
            }
            let reason = format!("task_duration_exceeded>{}s", fmt_secs(max_s));
            self.handle_task_failed(
                &agent_id,
                &task_id,
                reason,
                Classification::DurationExceeded,
                None,
                Some(elapsed),
            )
            .await?;
        }
        Ok(())
    }

    /// Poll the fleet, restart stale-but-alive agents, and refresh the
    /// snapshot's agent rows.
    pub(crate) async fn evaluate_watchdog(&mut self) -> Result<(), EngineError> {
        let mut agent_ids: Vec<AgentId> = self.specs.keys().cloned().collect();
        agent_ids.sort();

        let mut heartbeat = HashMap::new();
        let mut running = HashMap::new();
        let mut statuses: Vec<(AgentId, AgentProcessStatus)> = Vec::new();
        for agent_id in &agent_ids {
            match self.adapter.status(agent_id).await {
                Ok(status) => {
                    heartbeat.insert(agent_id.clone(), status.last_heartbeat_ms);
                    running.insert(agent_id.clone(), status.running);
                    statuses.push((agent_id.clone(), status));
                }
                Err(e) => self.error("adapter", &format!("status {agent_id}: {e}")),
            }
        }

        let report = watchdog::evaluate(
            &heartbeat,
            &running,
            self.clock.epoch_ms(),
            self.config.watchdog.heartbeat_timeout(),
        );
        self.last_stale_count = report.stale_agents.len();
        for agent_id in &report.restart_agents {
            self.restart_agent(agent_id).await?;
        }

        // Snapshot rows reflect post-restart reality.
        for (agent_id, status) in statuses.iter_mut() {
            if report.restart_agents.contains(agent_id) {
                if let Ok(fresh) = self.adapter.status(agent_id).await {
                    *status = fresh;
                }
            }
        }
        let fleet: Vec<AgentRecord> =
            statuses.iter().map(|(agent_id, status)| self.agent_record(agent_id, status)).collect();
        self.fleet = fleet;
        Ok(())
    }

    /// Terminate and respawn a stale agent, re-queueing its task.
    pub(crate) async fn restart_agent(&mut self, agent_id: &AgentId) -> Result<(), EngineError> {
        let Some(spec) = self.specs.get(agent_id).cloned() else {
            return Ok(());
        };
        let grace = self.config.watchdog.termination_grace();
        if let Err(e) = self.adapter.terminate(agent_id, "watchdog_restart", grace).await {
            tracing::warn!(agent_id = %agent_id, error = %e, "terminate before restart failed");
        }
        self.crash_count += 1;
        self.emit(Event::AgentRestart { agent_id: agent_id.clone() })?;

        self.adapter.spawn(spec).await?;
        self.adapter_cursors.insert(agent_id.clone(), 0);
        *self.restart_count.entry(agent_id.clone()).or_insert(0) += 1;

        if let Some(task_id) = self.running_by_agent.remove(agent_id) {
            self.last_progress_ms.remove(&task_id);
            self.started_at_ms.remove(&task_id);
            self.transition_task(&task_id, TaskStatus::Ready, "watchdog", "agent_restarted")?;
            self.reassigned_tasks += 1;
        }
        Ok(())
    }

    fn agent_record(&self, agent_id: &AgentId, status: &AgentProcessStatus) -> AgentRecord {
        let spec = self.specs.get(agent_id);
        let role = self.role_by_agent.get(agent_id);
        let (tokens_used, cost_usd) =
            self.agent_usage.get(agent_id).copied().unwrap_or((0, 0.0));
        let stderr_tail: String = {
            let tail = &status.stderr_tail;
            let chars: Vec<char> = tail.chars().collect();
            let skip = chars.len().saturating_sub(RECORD_STDERR_CAP);
            chars[skip..].iter().collect()
        };
        AgentRecord {
            agent_id: agent_id.clone(),
            role_id: role.map(|r| r.role_id.clone()).unwrap_or_default(),
            role_type: self.role_type_of_agent(agent_id),
            backend: spec.map(|s| s.backend.clone()).unwrap_or_default(),
            execution_mode: role.map(|r| r.execution_mode).unwrap_or_default(),
            status: if status.running { AgentStatus::Running } else { AgentStatus::Exited },
            task_id: self.running_by_agent.get(agent_id).cloned(),
            last_heartbeat_ms: status.last_heartbeat_ms,
            cwd: spec.map(|s| s.cwd.clone()).unwrap_or_default(),
            command: spec.map(|s| s.command.join(" ")).unwrap_or_default(),
            exit_code: status.exit_code,
            restart_count: self.restart_count.get(agent_id).copied().unwrap_or(0),
            stderr_tail,
            tokens_used,
            cost_usd,
        }
    }
}
