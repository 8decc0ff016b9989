// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbox harvesting and terminal-event handling.

use super::Coordinator;
use crate::error::EngineError;
use fm_adapters::{
    run_with_timeout, AgentAdapter, AgentProcessStatus, GIT_COMMAND_TIMEOUT,
};
use fm_bus::OutboxEntry;
use fm_core::{
    AgentId, Classification, Clock, Event, OutboxEventKind, TaskId, TaskStatus,
};
use tokio::process::Command;

const FILES_CHANGED_CAP: usize = 50;
const RESULT_SUMMARY_CAP: usize = 200;
const STDERR_REASON_CAP: usize = 400;

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Failure reason for a process that died without a terminal marker:
/// exit code plus a flattened stderr tail.
fn exit_reason(status: &AgentProcessStatus, base: &str) -> String {
    let code =
        status.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string());
    let tail = status.stderr_tail.trim().replace('\n', " | ");
    if tail.is_empty() {
        format!("{base}; exit_code={code}")
    } else {
        format!("{base}; exit_code={code}; stderr={}", truncate_chars(&tail, STDERR_REASON_CAP))
    }
}

impl<A: AgentAdapter, C: Clock> Coordinator<A, C> {
    /// Drain every agent's stream: mirror events into the outbox and the
    /// journal, feed the budget, then act on terminal markers. An agent that
    /// exited without emitting a terminal marker fails its running task.
    pub(crate) async fn harvest_outputs(&mut self) -> Result<(), EngineError> {
        let mut agent_ids: Vec<AgentId> = self.specs.keys().cloned().collect();
        agent_ids.sort();

        for agent_id in agent_ids {
            let since = self.adapter_cursors.get(&agent_id).copied().unwrap_or(0);
            let events = match self.adapter.read_events(&agent_id, since).await {
                Ok(events) => events,
                Err(e) => {
                    self.error("adapter", &format!("read_events {agent_id}: {e}"));
                    continue;
                }
            };

            if events.is_empty() {
                if self.running_by_agent.contains_key(&agent_id) {
                    if let Ok(status) = self.adapter.status(&agent_id).await {
                        if !status.running {
                            let reason =
                                exit_reason(&status, "process_exit_without_terminal_event");
                            self.fail_running_task(&agent_id, reason).await?;
                        }
                    }
                }
                continue;
            }
            if let Some(last) = events.last() {
                self.adapter_cursors.insert(agent_id.clone(), last.seq);
            }

            // Stamp each event with the task the agent was running when it
            // was emitted; a terminal marker consumes the assignment, so
            // trailing events carry no task id.
            let mut current_task = self.running_by_agent.get(&agent_id).cloned();
            let mut entries = Vec::with_capacity(events.len());
            let mut terminals: Vec<(OutboxEventKind, TaskId)> = Vec::new();
            let mut progressed: Vec<TaskId> = Vec::new();
            for event in &events {
                let text = event.payload.get("line").and_then(|v| v.as_str()).unwrap_or("");
                self.budget.add_usage(event.token_usage, event.cost_usd, text.len());
                let usage = self.agent_usage.entry(agent_id.clone()).or_default();
                usage.0 += event.token_usage.unwrap_or(0);
                usage.1 += event.cost_usd.unwrap_or(0.0);

                entries.push(OutboxEntry {
                    timestamp: event.timestamp,
                    kind: event.kind,
                    task_id: current_task.clone(),
                    payload: event.payload.clone(),
                    token_usage: event.token_usage,
                    cost_usd: event.cost_usd,
                });
                match event.kind {
                    OutboxEventKind::TaskDone | OutboxEventKind::TaskFailed => {
                        if let Some(task_id) = current_task.take() {
                            terminals.push((event.kind, task_id));
                        }
                    }
                    OutboxEventKind::Progress => {
                        if let Some(task_id) = &current_task {
                            progressed.push(task_id.clone());
                            if !text.is_empty() {
                                self.result_summary.insert(
                                    task_id.clone(),
                                    truncate_chars(text, RESULT_SUMMARY_CAP),
                                );
                            }
                        }
                    }
                }
            }

            let written = self.mailboxes.append_outbox(&agent_id, entries)?;
            if let Some(last) = written.last() {
                self.outbox_cursors.insert(agent_id.clone(), last.seq);
            }
            for event in &written {
                self.emit(Event::AgentEvent {
                    agent_id: agent_id.clone(),
                    task_id: event.task_id.clone(),
                    event_type: event.kind,
                    payload: event.payload.clone(),
                })?;
            }

            let now = self.clock.epoch_ms();
            for task_id in progressed {
                self.last_progress_ms.insert(task_id, now);
            }
            for (kind, task_id) in terminals {
                match kind {
                    OutboxEventKind::TaskDone => {
                        self.handle_completion_claim(&agent_id, &task_id).await?;
                    }
                    OutboxEventKind::TaskFailed => {
                        self.handle_task_failed(
                            &agent_id,
                            &task_id,
                            "worker_reported_failure".to_string(),
                            Classification::Failure,
                            None,
                            None,
                        )
                        .await?;
                    }
                    OutboxEventKind::Progress => {}
                }
            }
        }
        Ok(())
    }

    /// A worker claims its task is done. Reviewable kinds enter the merge
    /// queue; everything else is terminally done on its own say-so.
    pub(crate) async fn handle_completion_claim(
        &mut self,
        agent_id: &AgentId,
        task_id: &TaskId,
    ) -> Result<(), EngineError> {
        self.detect_file_changes(agent_id, task_id).await?;
        self.running_by_agent.remove(agent_id);
        self.last_progress_ms.remove(task_id);
        self.started_at_ms.remove(task_id);

        self.emit(Event::TaskExit {
            agent_id: agent_id.clone(),
            task_id: task_id.clone(),
            result: "task_done".to_string(),
        })?;
        self.emit(Event::TaskClassified {
            agent_id: agent_id.clone(),
            task_id: task_id.clone(),
            classification: Classification::Success,
            reason: None,
            timeout_seconds: None,
            duration_seconds: None,
        })?;

        let Some(kind) = self.graph.get(task_id).map(|t| t.kind) else {
            return Ok(());
        };
        let actor = self.role_type_of_agent(agent_id).to_string();
        if kind.is_reviewable() {
            // Higher hierarchy decides the final status.
            self.transition_task(task_id, TaskStatus::Reviewing, &actor, "completion_claim")?;
            self.merge_queue.enqueue(task_id.clone());
        } else {
            self.transition_task(task_id, TaskStatus::Done, &actor, "terminal_claim")?;
        }
        Ok(())
    }

    /// A task attempt failed. Under the attempt cap the task re-queues;
    /// at the cap it fails terminally.
    pub(crate) async fn handle_task_failed(
        &mut self,
        agent_id: &AgentId,
        task_id: &TaskId,
        reason: String,
        classification: Classification,
        timeout_seconds: Option<f64>,
        duration_seconds: Option<f64>,
    ) -> Result<(), EngineError> {
        self.running_by_agent.remove(agent_id);
        self.last_progress_ms.remove(task_id);
        self.started_at_ms.remove(task_id);

        self.emit(Event::TaskExit {
            agent_id: agent_id.clone(),
            task_id: task_id.clone(),
            result: "task_failed".to_string(),
        })?;
        self.emit(Event::TaskClassified {
            agent_id: agent_id.clone(),
            task_id: task_id.clone(),
            classification,
            reason: Some(reason.clone()),
            timeout_seconds,
            duration_seconds,
        })?;

        if !self.graph.contains(task_id) {
            return Ok(());
        }
        if self.graph.attempts(task_id) < self.config.retries.max_task_attempts {
            self.transition_task(task_id, TaskStatus::Ready, "coordinator", &reason)?;
            self.persist_task(task_id, Some(reason))?;
        } else {
            self.transition_task(task_id, TaskStatus::Failed, "coordinator", &reason)?;
        }
        Ok(())
    }

    /// Fail whatever task the agent is currently running (silent process
    /// death path).
    pub(crate) async fn fail_running_task(
        &mut self,
        agent_id: &AgentId,
        reason: String,
    ) -> Result<(), EngineError> {
        if let Some(task_id) = self.running_by_agent.get(agent_id).cloned() {
            self.handle_task_failed(
                agent_id,
                &task_id,
                reason,
                Classification::Failure,
                None,
                None,
            )
            .await?;
        }
        Ok(())
    }

    /// Best-effort `git diff` of the agent's workspace after a completion
    /// claim. Non-git workspaces and git failures are silent.
    async fn detect_file_changes(
        &mut self,
        agent_id: &AgentId,
        task_id: &TaskId,
    ) -> Result<(), EngineError> {
        let Some(cwd) = self.specs.get(agent_id).map(|s| s.cwd.clone()) else {
            return Ok(());
        };

        let mut diff = Command::new("git");
        diff.args(["diff", "--name-only", "HEAD"]).current_dir(&cwd);
        let Ok(output) = run_with_timeout(diff, GIT_COMMAND_TIMEOUT, "git diff").await else {
            return Ok(());
        };
        if !output.status.success() {
            return Ok(());
        }
        let mut files: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let mut untracked = Command::new("git");
        untracked.args(["ls-files", "--others", "--exclude-standard"]).current_dir(&cwd);
        if let Ok(output) = run_with_timeout(untracked, GIT_COMMAND_TIMEOUT, "git ls-files").await
        {
            if output.status.success() {
                files.extend(
                    String::from_utf8_lossy(&output.stdout)
                        .lines()
                        .filter(|l| !l.is_empty())
                        .map(|l| format!("+ {l}")),
                );
            }
        }

        files.truncate(FILES_CHANGED_CAP);
        if files.is_empty() {
            return Ok(());
        }

        self.emit(Event::FilesChanged {
            agent_id: agent_id.clone(),
            task_id: task_id.clone(),
            files: files.clone(),
            cwd,
        })?;
        let inventory = self.files_by_task.entry(task_id.clone()).or_default();
        for file in files {
            if !inventory.contains(&file) {
                inventory.push(file);
            }
        }
        Ok(())
    }
}
