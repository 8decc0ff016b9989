// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot materialization.

use super::Coordinator;
use crate::error::EngineError;
use fm_adapters::AgentAdapter;
use fm_bus::{
    ArtifactEntry, Edge, QualityStats, QueueStats, RunStatus, StateSnapshot, TaskRow,
    VerificationSummary, WatchdogStats,
};
use fm_core::{AgentStatus, Clock};
use indexmap::IndexMap;
use serde_json::json;
use std::collections::BTreeMap;

impl<A: AgentAdapter, C: Clock> Coordinator<A, C> {
    /// Rate-limited snapshot write; the debounce lives in the writer.
    pub(crate) fn write_state(&mut self) -> Result<(), EngineError> {
        let mut snapshot = self.build_snapshot();
        self.writer.schedule_write(move |seq| {
            snapshot.state_seq = seq;
            snapshot
        })?;
        Ok(())
    }

    /// Synchronous final write on shutdown, rate limit ignored.
    pub(crate) fn write_state_final(&mut self) -> Result<(), EngineError> {
        let mut snapshot = self.build_snapshot();
        self.writer.finalize(move |seq| {
            snapshot.state_seq = seq;
            snapshot
        })?;
        Ok(())
    }

    /// Project the whole observable run state into one document.
    fn build_snapshot(&self) -> StateSnapshot {
        let mut queue = QueueStats::default();
        let mut tasks = IndexMap::new();
        let mut attempts = BTreeMap::new();
        for task in self.graph.iter() {
            queue.count(task.status);
            attempts.insert(task.task_id.clone(), self.graph.attempts(&task.task_id));
            tasks.insert(
                task.task_id.clone(),
                TaskRow {
                    task_id: task.task_id.clone(),
                    title: task.title.clone(),
                    kind: task.kind,
                    status: task.status,
                    attempts: self.graph.attempts(&task.task_id),
                    role_hint: task.role_hint.clone(),
                    assigned_agent_id: task.assigned_agent_id.clone(),
                    deps: task.deps.clone(),
                    priority: task.priority,
                    failure_mode: task.failure_mode.clone(),
                    result_summary: self.result_summary.get(&task.task_id).cloned(),
                    files_modified: self
                        .files_by_task
                        .get(&task.task_id)
                        .cloned()
                        .unwrap_or_default(),
                },
            );
        }

        let edges = self
            .graph
            .edges()
            .into_iter()
            .map(|(source, target)| Edge { source, target })
            .collect();

        let merge_queue = self.merge_queue.snapshot();
        let verification = VerificationSummary {
            reviewed: merge_queue.items.len(),
            approved: merge_queue.approved + merge_queue.merged,
            rejected: merge_queue.rejected,
            merged: merge_queue.merged,
        };

        let reviews_total: usize = self.wave_reviews.iter().map(|w| w.reviews_total).sum();
        let reviews_passed: usize = self.wave_reviews.iter().map(|w| w.reviews_passed).sum();
        let scores: Vec<f64> =
            self.merge_queue.items().iter().filter_map(|i| i.quality_score).collect();
        let quality_stats = QualityStats {
            reviews_total,
            reviews_passed,
            average_score: if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            },
        };

        // Backend health: degraded as soon as any of its agents has exited.
        let mut model_health = BTreeMap::new();
        for role in &self.manifest.roles {
            model_health.entry(role.backend.clone()).or_insert_with(|| "healthy".to_string());
        }
        for record in &self.fleet {
            if record.status == AgentStatus::Exited {
                model_health.insert(record.backend.clone(), "degraded".to_string());
            }
        }

        let worker_log_files = self
            .specs
            .keys()
            .map(|agent_id| (agent_id.clone(), self.layout.agent_log_path(agent_id)))
            .collect();

        StateSnapshot {
            state_seq: 0, // assigned by the writer
            timestamp: self.clock.utc(),
            run_id: self.run_id.clone(),
            status: RunStatus {
                phase: self.phase,
                wave: self.wave,
                queue,
                budget: self.budget.snapshot(),
                watchdog: WatchdogStats {
                    crash_count: self.crash_count,
                    reassigned_tasks: self.reassigned_tasks,
                    stale_agents: self.last_stale_count,
                },
            },
            tasks,
            edges,
            agents: self.fleet.clone(),
            merge_queue,
            cursors: self.outbox_cursors.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            assignments: self
                .running_by_agent
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            attempts,
            timeline: self.timeline.iter().cloned().collect(),
            errors: self.errors.clone(),
            decisions: self.decisions.clone(),
            model_health,
            plan: Some(json!({
                "strategy": self.config.orchestration.decomposition.to_string(),
                "max_tasks": self.config.orchestration.max_tasks,
                "task_count": self.graph.len(),
            })),
            verification,
            artifact_inventory: self
                .files_by_task
                .iter()
                .map(|(task_id, files)| ArtifactEntry {
                    task_id: task_id.clone(),
                    files: files.clone(),
                })
                .collect(),
            worker_log_files,
            quality_stats,
            wave_reviews: self.wave_reviews.clone(),
            quality_results: self.quality_results.clone(),
        }
    }
}
