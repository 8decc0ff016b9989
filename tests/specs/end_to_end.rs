// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::support::{base_config, shell_role};
use fm_adapters::ProcessAdapter;
use fm_bus::{read_json_opt, Phase, StateSnapshot};
use fm_core::{RoleType, Strategy, SystemClock, TaskId, TaskStatus};
use fm_engine::Coordinator;
use tempfile::TempDir;

#[tokio::test]
async fn single_worker_single_task_completes() {
    let dir = TempDir::new().unwrap();
    let roles = vec![shell_role("worker", RoleType::Worker, 1, "true")];
    let config = base_config(dir.path(), Strategy::Manual, roles);

    let adapter = ProcessAdapter::new(SystemClock);
    let mut coordinator =
        Coordinator::new(config, "echo hi", false, adapter, SystemClock).unwrap();
    let phase = coordinator.run().await.unwrap();

    assert_eq!(phase, Phase::Completed);
    assert_eq!(coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Done));

    let snap: StateSnapshot =
        read_json_opt(&coordinator.layout().state_path()).unwrap().unwrap();
    assert_eq!(snap.status.phase, Phase::Completed);
    assert_eq!(snap.status.queue.done, snap.status.queue.total);
}

#[tokio::test]
async fn parallel_workers_fan_out_and_integrate() {
    let dir = TempDir::new().unwrap();
    let roles = vec![shell_role("coder", RoleType::Worker, 3, "true")];
    let config = base_config(dir.path(), Strategy::Parallel, roles);

    let adapter = ProcessAdapter::new(SystemClock);
    let mut coordinator =
        Coordinator::new(config, "build X", false, adapter, SystemClock).unwrap();
    let phase = coordinator.run().await.unwrap();

    assert_eq!(phase, Phase::Completed);
    let graph = coordinator.graph();
    for id in ["t0", "t1", "t2", "t3"] {
        assert_eq!(graph.status(&TaskId::new(id)), Some(TaskStatus::Done), "{id}");
    }
}

#[tokio::test]
async fn failing_backend_exhausts_attempts() {
    let dir = TempDir::new().unwrap();
    let roles = vec![shell_role("worker", RoleType::Worker, 1, "false")];
    let mut config = base_config(dir.path(), Strategy::Manual, roles);
    config.retries.max_task_attempts = 2;

    let adapter = ProcessAdapter::new(SystemClock);
    let mut coordinator =
        Coordinator::new(config, "doomed goal", false, adapter, SystemClock).unwrap();
    let phase = coordinator.run().await.unwrap();

    // Every attempt failed; the run still ends with all tasks terminal.
    assert_eq!(phase, Phase::Completed);
    let task = coordinator.graph().get(&TaskId::new("t0")).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure_mode.as_deref(), Some("worker_reported_failure"));
    assert_eq!(coordinator.graph().attempts(&TaskId::new("t0")), 2);
}

#[tokio::test]
async fn review_pipeline_over_real_processes() {
    let dir = TempDir::new().unwrap();
    let roles = vec![
        shell_role("worker", RoleType::Worker, 1, "true"),
        shell_role("judge", RoleType::Judge, 1, "true"),
        shell_role("critic", RoleType::Critic, 1, "true"),
    ];
    let config = base_config(dir.path(), Strategy::Manual, roles);

    let adapter = ProcessAdapter::new(SystemClock);
    let mut coordinator =
        Coordinator::new(config, "implement the feature", false, adapter, SystemClock).unwrap();
    let phase = coordinator.run().await.unwrap();

    assert_eq!(phase, Phase::Completed);
    let graph = coordinator.graph();
    assert_eq!(graph.status(&TaskId::new("t0")), Some(TaskStatus::Done));
    assert_eq!(graph.status(&TaskId::new("review-t0-judge")), Some(TaskStatus::Done));
    assert_eq!(graph.status(&TaskId::new("review-t0-critic")), Some(TaskStatus::Done));
    assert_eq!(graph.status(&TaskId::new("merge-t0")), Some(TaskStatus::Done));

    let item = coordinator.merge_queue().get(&TaskId::new("t0")).unwrap();
    assert_eq!(item.quality_score, Some(1.0));
}
