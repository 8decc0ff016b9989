// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run bootstrap, resume reconciliation, and fleet lifecycle.

use super::{Coordinator, TIMELINE_TAIL};
use crate::dag::TaskGraph;
use crate::decompose::decompose;
use crate::error::EngineError;
use crate::merge_queue::MergeQueue;
use fm_adapters::{
    cleanup_worktrees, ensure_workspace_for_agent, role_command, AgentAdapter, AgentProcessSpec,
};
use fm_bus::{
    read_journal, read_json_opt, read_task_record, write_json_atomic, write_task_record,
    RunLayout, StateSnapshot, TaskRecord, ValidationSnapshot,
};
use fm_core::{
    AgentId, BudgetCounter, Clock, Config, ErrorEntry, Event, Manifest, MergePolicy, MessageKind,
    RunId, TaskStatus, TimelineEntry,
};
use serde_json::json;
use std::collections::{HashMap, VecDeque};

/// Everything `Coordinator::new` needs from either bootstrap or resume.
pub(super) struct LoadedRun {
    pub run_id: RunId,
    pub manifest: Manifest,
    pub graph: TaskGraph,
    pub merge_queue: MergeQueue,
    pub budget: BudgetCounter,
    pub outbox_cursors: HashMap<AgentId, u64>,
    pub state_seq: u64,
    pub errors: Vec<ErrorEntry>,
    pub timeline: VecDeque<TimelineEntry>,
    pub pending_events: Vec<Event>,
}

/// Start a fresh run: decompose the goal, write the manifest and the seed
/// task records.
pub(super) fn bootstrap_run<C: Clock>(
    layout: &RunLayout,
    config: &Config,
    goal: &str,
    clock: &C,
) -> Result<LoadedRun, EngineError> {
    let run_id = RunId::generate();
    let decomposition = decompose(
        goal,
        &config.roles,
        config.orchestration.decomposition,
        config.orchestration.max_tasks,
    );

    let manifest = Manifest {
        run_id: run_id.clone(),
        goal: goal.to_string(),
        created_at: clock.utc(),
        roles: config.roles.clone(),
        tasks: decomposition.tasks.clone(),
        budget: config.budget.clone(),
        merge_policy: MergePolicy {
            authority_role: config.merge.authority_role.clone(),
            quality_threshold: config.merge.quality_threshold,
        },
    };
    write_json_atomic(&layout.manifest_path(), &manifest)?;

    for task in &manifest.tasks {
        write_task_record(
            layout,
            &TaskRecord {
                task_id: task.task_id.clone(),
                title: task.title.clone(),
                description: task.description.clone(),
                deps: task.deps.clone(),
                role_hint: task.role_hint.clone(),
                kind: task.kind,
                status: task.status,
                attempts: 0,
                last_error: None,
                assigned_agent_id: None,
                transitions: Vec::new(),
                validation: ValidationSnapshot::default(),
                updated_at: clock.utc(),
            },
        )?;
    }

    let budget = BudgetCounter::new(manifest.budget.clone());
    Ok(LoadedRun {
        run_id,
        graph: TaskGraph::from_tasks(manifest.tasks.iter().cloned()),
        manifest,
        merge_queue: MergeQueue::new(),
        budget,
        outbox_cursors: HashMap::new(),
        state_seq: 0,
        errors: Vec::new(),
        timeline: VecDeque::new(),
        pending_events: decomposition.events,
    })
}

/// Resume an existing run from its manifest, task records, and snapshot.
/// Returns `None` when there is no manifest to resume from.
///
/// Reconciliation: any task persisted as `running` restarts as `ready`; the
/// worker that held it is gone.
pub(super) fn resume_run<C: Clock>(
    layout: &RunLayout,
    _goal: &str,
    _clock: &C,
) -> Result<Option<LoadedRun>, EngineError> {
    let Some(manifest) = read_json_opt::<Manifest>(&layout.manifest_path())? else {
        return Ok(None);
    };
    let snapshot = read_json_opt::<StateSnapshot>(&layout.state_path())?;

    let mut graph = TaskGraph::new();
    for task in &manifest.tasks {
        let mut task = task.clone();
        if let Some(record) = read_task_record(layout, &task.task_id)? {
            task.status = if record.status == TaskStatus::Running {
                TaskStatus::Ready
            } else {
                record.status
            };
            if task.status == TaskStatus::Ready {
                task.assigned_agent_id = None;
            } else {
                task.assigned_agent_id = record.assigned_agent_id.clone();
            }
            let task_id = task.task_id.clone();
            graph.insert(task);
            graph.set_attempts(&task_id, record.attempts);
            graph.extend_transition_log(record.transitions);
        } else {
            graph.insert(task);
        }
    }

    let mut budget = BudgetCounter::new(manifest.budget.clone());
    let mut merge_queue = MergeQueue::new();
    let mut outbox_cursors = HashMap::new();
    let mut state_seq = 0;
    let mut errors = Vec::new();
    if let Some(snap) = snapshot {
        budget.tokens_used = snap.status.budget.tokens_used;
        budget.cost_used_usd = snap.status.budget.cost_used_usd;
        merge_queue = MergeQueue::from_rows(&snap.merge_queue.items);
        outbox_cursors = snap.cursors.into_iter().collect();
        state_seq = snap.state_seq;
        errors = snap.errors;
    }

    // Seed the timeline from the journal tail so observers keep continuity.
    let journal_tail = read_journal(&layout.events_path())?;
    let skip = journal_tail.len().saturating_sub(TIMELINE_TAIL);
    let timeline = journal_tail
        .into_iter()
        .skip(skip)
        .map(|envelope| TimelineEntry {
            timestamp: envelope.timestamp,
            event_type: envelope.event.name().to_string(),
            summary: envelope.event.log_summary(),
        })
        .collect();

    Ok(Some(LoadedRun {
        run_id: manifest.run_id.clone(),
        graph,
        manifest,
        merge_queue,
        budget,
        outbox_cursors,
        state_seq,
        errors,
        timeline,
        pending_events: Vec::new(),
    }))
}

impl<A: AgentAdapter, C: Clock> Coordinator<A, C> {
    /// Spawn every agent in the roster: workspace, mailboxes, process.
    pub(crate) async fn spawn_agents(&mut self) -> Result<(), EngineError> {
        let roles = self.manifest.roles.clone();
        for role in roles {
            for index in 1..=role.count {
                let agent_id = AgentId::for_role(&role.role_id, index);
                let workspace = ensure_workspace_for_agent(
                    &self.config.run.working_dir,
                    &self.layout.worktrees_dir(),
                    &agent_id,
                    role.workspace_mode,
                )
                .await?;
                let command = role_command(&role, self.config.run.debug)?;
                let spec = AgentProcessSpec {
                    agent_id: agent_id.clone(),
                    role_id: role.role_id.clone(),
                    backend: role.backend.clone(),
                    model: role.model.clone(),
                    command: command.clone(),
                    cwd: workspace.clone(),
                    env: Vec::new(),
                    unset_env: Vec::new(),
                    log_path: self.layout.agent_log_path(&agent_id),
                };
                self.adapter.spawn(spec.clone()).await?;
                self.mailboxes.ensure(&agent_id)?;

                self.specs.insert(agent_id.clone(), spec);
                self.role_by_agent.insert(agent_id.clone(), role.clone());
                self.outbox_cursors.entry(agent_id.clone()).or_insert(0);
                self.adapter_cursors.insert(agent_id.clone(), 0);
                self.restart_count.entry(agent_id.clone()).or_insert(0);

                let workspace_effective =
                    if workspace == self.config.run.working_dir { "shared" } else { "worktree" };
                self.emit(Event::AgentSpawned {
                    agent_id: agent_id.clone(),
                    role_id: role.role_id.clone(),
                    backend: role.backend.clone(),
                    model: role.model.clone(),
                    cwd: workspace.clone(),
                    workspace_mode: role.workspace_mode,
                    workspace_effective: workspace_effective.to_string(),
                })?;
                self.emit(Event::DebugAgentCommand {
                    agent_id,
                    command,
                    cwd: workspace,
                    env_keys: vec!["FM_AGENT_ID".to_string(), "FM_MODEL".to_string()],
                })?;
            }
        }
        Ok(())
    }

    /// Graceful fleet shutdown: shutdown notice, terminate with grace, then
    /// worktree cleanup.
    pub(crate) async fn shutdown_agents(&mut self, reason: &str) -> Result<(), EngineError> {
        let grace = self.config.watchdog.termination_grace();
        let mut agent_ids: Vec<AgentId> = self.specs.keys().cloned().collect();
        agent_ids.sort();

        for agent_id in agent_ids {
            if let Err(e) = self.mailboxes.push_inbox(
                &agent_id,
                self.clock.utc(),
                MessageKind::Shutdown,
                None,
                json!({ "reason": reason }),
                false,
            ) {
                tracing::warn!(agent_id = %agent_id, error = %e, "failed to write shutdown notice");
            }
            if let Err(e) = self.adapter.terminate(&agent_id, reason, grace).await {
                tracing::warn!(agent_id = %agent_id, error = %e, "terminate failed");
            }
            self.emit(Event::AgentTerminated {
                agent_id: agent_id.clone(),
                reason: reason.to_string(),
            })?;
        }

        cleanup_worktrees(&self.config.run.working_dir, &self.layout.worktrees_dir()).await;
        Ok(())
    }
}
