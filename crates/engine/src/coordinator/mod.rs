// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hybrid coordinator: a single logically-serial control loop driving a
//! fleet of agent subprocesses against the task DAG.
//!
//! All task-state mutation happens inside [`Coordinator::tick`]; agents run
//! in parallel but communicate exclusively through the adapter seam and the
//! file IPC bus. Every transition and its side effects (persist the task
//! record, journal the event, update the merge queue) complete before the
//! next suspension point.

mod bootstrap;
mod dispatch;
mod harvest;
mod monitor;
mod review;
mod state;

use crate::dag::{TaskGraph, TransitionError};
use crate::error::EngineError;
use crate::merge_queue::MergeQueue;
use fm_adapters::{AgentAdapter, AgentProcessSpec};
use fm_bus::{
    write_json_atomic, write_task_record, EventJournal, Mailboxes, Phase, RunLayout, StateWriter,
    TaskRecord, ValidationSnapshot,
};
use fm_core::{
    AgentId, BudgetCounter, Clock, Config, DecisionEntry, ErrorEntry, Event, Manifest, Role,
    RoleType, RunId, Task, TaskId, TaskKind, TaskStatus, TimelineEntry,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

const TIMELINE_TAIL: usize = 200;
const ERRORS_TAIL: usize = 100;
const DECISIONS_TAIL: usize = 100;

/// Coordinator for one run.
pub struct Coordinator<A: AgentAdapter, C: Clock> {
    pub(crate) config: Config,
    pub(crate) goal: String,
    pub(crate) run_id: RunId,
    pub(crate) layout: RunLayout,
    pub(crate) adapter: A,
    pub(crate) clock: C,

    pub(crate) journal: EventJournal,
    pub(crate) mailboxes: Mailboxes,
    pub(crate) writer: StateWriter<C>,

    pub(crate) manifest: Manifest,
    pub(crate) graph: TaskGraph,
    pub(crate) merge_queue: MergeQueue,
    pub(crate) budget: BudgetCounter,
    pub(crate) phase: Phase,
    pub(crate) wave: u32,

    pub(crate) specs: HashMap<AgentId, AgentProcessSpec>,
    pub(crate) role_by_agent: HashMap<AgentId, Role>,
    pub(crate) running_by_agent: HashMap<AgentId, TaskId>,
    pub(crate) last_progress_ms: HashMap<TaskId, u64>,
    pub(crate) started_at_ms: HashMap<TaskId, u64>,
    /// Outbox sequence reached per agent (persisted in the snapshot).
    pub(crate) outbox_cursors: HashMap<AgentId, u64>,
    /// Adapter stream cursor per agent; reset on every (re)spawn.
    pub(crate) adapter_cursors: HashMap<AgentId, u64>,
    pub(crate) restart_count: HashMap<AgentId, u32>,
    pub(crate) agent_usage: HashMap<AgentId, (u64, f64)>,

    pub(crate) crash_count: u32,
    pub(crate) reassigned_tasks: u32,
    pub(crate) timeline: VecDeque<TimelineEntry>,
    pub(crate) errors: Vec<ErrorEntry>,
    pub(crate) decisions: Vec<DecisionEntry>,
    pub(crate) files_by_task: BTreeMap<TaskId, Vec<String>>,
    pub(crate) result_summary: HashMap<TaskId, String>,
    pub(crate) quality_results: Vec<fm_bus::QualityResult>,
    pub(crate) wave_reviews: Vec<fm_bus::WaveReview>,
    pub(crate) last_stale_count: usize,
    pub(crate) fleet: Vec<fm_core::AgentRecord>,

    pub(crate) started_at: Instant,
    cancel: CancellationToken,
}

impl<A: AgentAdapter, C: Clock> Coordinator<A, C> {
    /// Create a coordinator, bootstrapping a fresh run or resuming an
    /// existing one from its manifest and snapshot.
    pub fn new(
        config: Config,
        goal: impl Into<String>,
        resume: bool,
        adapter: A,
        clock: C,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let goal = goal.into();
        let layout = RunLayout::new(&config.run.run_dir);
        layout.ensure()?;

        let loaded = if resume {
            bootstrap::resume_run(&layout, &goal, &clock)?
        } else {
            None
        };
        let resumed = loaded.is_some();
        let loaded = match loaded {
            Some(loaded) => loaded,
            None => bootstrap::bootstrap_run(&layout, &config, &goal, &clock)?,
        };
        // A resumed run keeps the goal it was started with.
        let goal = if resumed { loaded.manifest.goal.clone() } else { goal };

        let journal = EventJournal::open(&layout.events_path(), loaded.run_id.clone())?;
        let mut writer =
            StateWriter::new(&layout.state_path(), config.run.state_writes_per_second, clock.clone());
        writer.resume_from_seq(loaded.state_seq);

        let started_at = clock.now();
        let mut coordinator = Self {
            goal,
            run_id: loaded.run_id,
            mailboxes: Mailboxes::new(layout.clone()),
            layout,
            adapter,
            journal,
            writer,
            manifest: loaded.manifest,
            graph: loaded.graph,
            merge_queue: loaded.merge_queue,
            budget: loaded.budget,
            phase: Phase::Executing,
            wave: 0,
            specs: HashMap::new(),
            role_by_agent: HashMap::new(),
            running_by_agent: HashMap::new(),
            last_progress_ms: HashMap::new(),
            started_at_ms: HashMap::new(),
            outbox_cursors: loaded.outbox_cursors,
            adapter_cursors: HashMap::new(),
            restart_count: HashMap::new(),
            agent_usage: HashMap::new(),
            crash_count: 0,
            reassigned_tasks: 0,
            timeline: loaded.timeline,
            errors: loaded.errors,
            decisions: Vec::new(),
            files_by_task: BTreeMap::new(),
            result_summary: HashMap::new(),
            quality_results: Vec::new(),
            wave_reviews: Vec::new(),
            last_stale_count: 0,
            fleet: Vec::new(),
            started_at,
            cancel: CancellationToken::new(),
            config,
            clock,
        };

        for event in loaded.pending_events {
            coordinator.emit(event)?;
        }
        coordinator.emit(Event::SwarmStart {
            goal: coordinator.goal.clone(),
            role_count: coordinator.manifest.roles.len(),
            task_count: coordinator.manifest.tasks.len(),
            resume: resumed,
        })?;
        Ok(coordinator)
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn merge_queue(&self) -> &MergeQueue {
        &self.merge_queue
    }

    pub fn mailboxes(&self) -> &Mailboxes {
        &self.mailboxes
    }

    /// Token for external cancellation. Cancelling initiates graceful
    /// shutdown at the next tick boundary.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run to completion: spawn the fleet, tick until the phase is terminal
    /// (or cancellation), then shut everything down and write the final
    /// snapshot.
    pub async fn run(&mut self) -> Result<Phase, EngineError> {
        match self.run_inner().await {
            Ok(phase) => Ok(phase),
            Err(e) => {
                // Top-level catch: journal the crash, best-effort shutdown,
                // then propagate.
                self.error("coordinator_crash", &e.to_string());
                if let Err(shutdown_err) = self.shutdown_agents("coordinator_crash").await {
                    tracing::warn!(error = %shutdown_err, "shutdown after crash failed");
                }
                let _ = self.write_state_final();
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self) -> Result<Phase, EngineError> {
        self.spawn_agents().await?;
        let poll = self.config.run.poll_interval();

        loop {
            let phase = self.tick().await?;
            if phase.is_terminal() {
                break;
            }
            if self.cancel.is_cancelled() {
                self.error("cancelled", "run cancelled externally");
                self.phase = Phase::Failed;
                break;
            }
            tokio::time::sleep(poll).await;
        }

        self.shutdown_agents("shutdown").await?;
        self.write_state_final()?;
        Ok(self.phase)
    }

    /// One scheduling round. Public so embedders and tests can drive the
    /// loop at their own pace.
    pub async fn tick(&mut self) -> Result<Phase, EngineError> {
        self.harvest_outputs().await?;
        self.enforce_silence_timeouts().await?;
        self.enforce_duration_limits().await?;
        self.process_review_queue().await?;
        self.dispatch_ready_tasks().await?;

        if self.phase == Phase::Executing && self.graph.all_terminal() {
            self.phase = Phase::Completed;
        }

        self.evaluate_watchdog().await?;

        if self.phase == Phase::Executing {
            if self.budget.hard_exceeded() {
                self.phase = Phase::Failed;
                self.error("budget", "budget hard cap exceeded");
            } else if self.clock.now().duration_since(self.started_at)
                > self.config.run.max_runtime()
            {
                self.phase = Phase::Failed;
                self.error("timeout", "max runtime exceeded");
            }
        }

        self.write_state()?;
        Ok(self.phase)
    }

    /// Append an event to the journal and the bounded timeline. Debug events
    /// are dropped unless the run has `debug` enabled.
    pub(crate) fn emit(&mut self, event: Event) -> Result<(), EngineError> {
        if event.is_debug() && !self.config.run.debug {
            return Ok(());
        }
        let envelope = self.journal.append(self.clock.utc(), event)?;
        self.timeline.push_back(TimelineEntry {
            timestamp: envelope.timestamp,
            event_type: envelope.event.name().to_string(),
            summary: envelope.event.log_summary(),
        });
        while self.timeline.len() > TIMELINE_TAIL {
            self.timeline.pop_front();
        }
        Ok(())
    }

    /// Record an error: bounded tail + `error` journal event. Never fails;
    /// an unwritable journal at this point is logged and swallowed.
    pub(crate) fn error(&mut self, category: &str, message: &str) {
        tracing::warn!(category, message, "coordinator error");
        self.errors.push(ErrorEntry {
            timestamp: self.clock.utc(),
            category: category.to_string(),
            message: message.to_string(),
            severity: "error".to_string(),
        });
        if self.errors.len() > ERRORS_TAIL {
            let excess = self.errors.len() - ERRORS_TAIL;
            self.errors.drain(..excess);
        }
        let event = Event::Error {
            category: category.to_string(),
            message: message.to_string(),
            severity: "error".to_string(),
        };
        if let Err(e) = self.emit(event) {
            tracing::error!(error = %e, "failed to journal error event");
        }
    }

    /// Record an orchestrator decision for the snapshot tail.
    pub(crate) fn decide(&mut self, actor: &str, decision: &str, detail: String) {
        self.decisions.push(DecisionEntry {
            timestamp: self.clock.utc(),
            actor: actor.to_string(),
            decision: decision.to_string(),
            detail,
        });
        if self.decisions.len() > DECISIONS_TAIL {
            let excess = self.decisions.len() - DECISIONS_TAIL;
            self.decisions.drain(..excess);
        }
    }

    /// Validated transition + task-record persist + journal event. An
    /// illegal transition is recorded as an error and otherwise ignored.
    pub(crate) fn transition_task(
        &mut self,
        task_id: &TaskId,
        to: TaskStatus,
        actor: &str,
        reason: &str,
    ) -> Result<bool, EngineError> {
        match self.graph.transition(task_id, to, actor, reason, self.clock.utc()) {
            Ok(Some(record)) => {
                self.persist_task(task_id, None)?;
                self.emit(Event::TaskTransition(record))?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(TransitionError::Invalid { from }) => {
                self.error(
                    "invalid_transition",
                    &format!("{task_id}: {from}->{to} by {actor}"),
                );
                Ok(false)
            }
            Err(TransitionError::UnknownTask) => {
                self.error("invalid_transition", &format!("{task_id}: unknown task by {actor}"));
                Ok(false)
            }
        }
    }

    /// Persist the durable per-task record.
    pub(crate) fn persist_task(
        &mut self,
        task_id: &TaskId,
        last_error: Option<String>,
    ) -> Result<(), EngineError> {
        let Some(task) = self.graph.get(task_id) else {
            return Ok(());
        };

        let review_task_ids: Vec<TaskId> = self
            .graph
            .iter()
            .filter(|t| {
                matches!(t.kind, TaskKind::Judge | TaskKind::Critic) && t.deps.contains(task_id)
            })
            .map(|t| t.task_id.clone())
            .collect();
        let statuses = review_task_ids
            .iter()
            .filter_map(|id| self.graph.status(id).map(|s| (id.clone(), s)))
            .collect();

        let mut record = TaskRecord {
            task_id: task.task_id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            deps: task.deps.clone(),
            role_hint: task.role_hint.clone(),
            kind: task.kind,
            status: task.status,
            attempts: self.graph.attempts(task_id),
            last_error: last_error.or_else(|| task.failure_mode.clone()),
            assigned_agent_id: task.assigned_agent_id.clone(),
            transitions: self.graph.transitions_for(task_id),
            validation: ValidationSnapshot { review_task_ids, statuses },
            updated_at: self.clock.utc(),
        };
        record.trim_transitions();
        write_task_record(&self.layout, &record)?;
        Ok(())
    }

    /// Add a task mid-run (review and merge tasks): journal, DAG, task
    /// record, and an atomic manifest rewrite.
    pub(crate) fn append_task(&mut self, task: Task) -> Result<(), EngineError> {
        self.emit(Event::TaskCreated {
            task_id: task.task_id.clone(),
            task_kind: task.kind,
            role_hint: task.role_hint.clone(),
            deps: task.deps.clone(),
        })?;
        self.graph.insert(task.clone());
        let task_id = task.task_id.clone();
        self.manifest.tasks.push(task);
        self.persist_task(&task_id, None)?;
        write_json_atomic(&self.layout.manifest_path(), &self.manifest)?;
        Ok(())
    }

    /// Role type of the agent's role, defaulting to worker.
    pub(crate) fn role_type_of_agent(&self, agent_id: &AgentId) -> RoleType {
        self.role_by_agent.get(agent_id).map(|r| r.role_type).unwrap_or(RoleType::Worker)
    }

    /// Review role ids: judge/critic roles in the roster, else the
    /// configured fallback list.
    pub(crate) fn review_role_ids(&self) -> Vec<(String, RoleType)> {
        let mut ids: Vec<(String, RoleType)> = self
            .manifest
            .review_roles()
            .iter()
            .map(|r| (r.role_id.clone(), r.role_type))
            .collect();
        if ids.is_empty() {
            for role_id in &self.config.merge.review_roles {
                let role_type = self.manifest.role_type(role_id);
                ids.push((role_id.clone(), role_type));
            }
        }
        ids
    }
}

#[cfg(test)]
#[path = "../coordinator_tests/mod.rs"]
mod tests;
