// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ready-task dispatch.

use super::Coordinator;
use crate::error::EngineError;
use crate::prompt::build_task_prompt;
use crate::scheduler::{assign_tasks, AgentSlot, Assignment};
use fm_adapters::AgentAdapter;
use fm_bus::Phase;
use fm_core::{AgentId, Clock, Event, MessageKind, Task, TaskId, TaskStatus};
use serde_json::json;

impl<A: AgentAdapter, C: Clock> Coordinator<A, C> {
    /// Match ready tasks to free agents and launch them.
    pub(crate) async fn dispatch_ready_tasks(&mut self) -> Result<(), EngineError> {
        if self.phase != Phase::Executing {
            return Ok(());
        }

        let max_attempts = self.config.retries.max_task_attempts;
        let mut eligible: Vec<TaskId> = Vec::new();
        for task_id in self.graph.ready_tasks() {
            if self.graph.attempts(&task_id) >= max_attempts {
                self.transition_task(
                    &task_id,
                    TaskStatus::Failed,
                    "coordinator",
                    "max_task_attempts_exceeded",
                )?;
            } else {
                eligible.push(task_id);
            }
        }

        let assignments = {
            let ready_tasks: Vec<&Task> =
                eligible.iter().filter_map(|id| self.graph.get(id)).collect();
            let slots: Vec<AgentSlot> = self
                .specs
                .keys()
                .map(|agent_id| AgentSlot {
                    agent_id: agent_id.clone(),
                    role_id: self
                        .role_by_agent
                        .get(agent_id)
                        .map(|r| r.role_id.clone())
                        .unwrap_or_default(),
                    busy: self.running_by_agent.contains_key(agent_id),
                })
                .collect();
            assign_tasks(&ready_tasks, &slots, &self.manifest.roles)
        };
        if assignments.is_empty() {
            return Ok(());
        }

        self.wave += 1;
        let now = self.clock.epoch_ms();
        for Assignment { task_id, agent_id } in assignments {
            self.graph.increment_attempt(&task_id);
            self.running_by_agent.insert(agent_id.clone(), task_id.clone());
            self.last_progress_ms.insert(task_id.clone(), now);
            self.started_at_ms.insert(task_id.clone(), now);
            if let Some(task) = self.graph.get_mut(&task_id) {
                task.assigned_agent_id = Some(agent_id.clone());
            }
            self.transition_task(&task_id, TaskStatus::Running, "coordinator", "assigned")?;
            self.send_task_assignment(&agent_id, &task_id).await?;
        }
        Ok(())
    }

    /// Inbox write + prompt line to the agent's stdin.
    async fn send_task_assignment(
        &mut self,
        agent_id: &AgentId,
        task_id: &TaskId,
    ) -> Result<(), EngineError> {
        let Some(task) = self.graph.get(task_id).cloned() else {
            return Ok(());
        };

        self.mailboxes.push_inbox(
            agent_id,
            self.clock.utc(),
            MessageKind::TaskAssign,
            Some(task_id.clone()),
            json!({
                "title": task.title,
                "description": task.description,
                "acceptance": task.acceptance,
                "target_files": task.target_files,
                "task_kind": task.kind,
            }),
            true,
        )?;

        let prompt = build_task_prompt(&self.goal, &task);
        if let Err(e) = self.adapter.send(agent_id, &prompt).await {
            // A dead agent consumes the attempt; retry machinery decides
            // whether the task re-queues.
            self.error("dispatch", &format!("send to {agent_id} failed: {e}"));
            self.handle_task_failed(
                agent_id,
                task_id,
                format!("agent_unreachable: {e}"),
                fm_core::Classification::Failure,
                None,
                None,
            )
            .await?;
            return Ok(());
        }

        self.emit(Event::TaskLaunch {
            agent_id: agent_id.clone(),
            task_id: task_id.clone(),
            task_kind: task.kind,
        })?;
        let truncated: String = prompt.chars().take(2000).collect();
        self.emit(Event::DebugPromptSent {
            agent_id: agent_id.clone(),
            task_id: task_id.clone(),
            prompt: truncated,
        })?;
        Ok(())
    }
}
