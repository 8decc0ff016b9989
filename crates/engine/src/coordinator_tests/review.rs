// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Review-and-merge pipeline scenarios.

use super::support::{config_with, review_role, worker_role, Fixture};
use crate::merge_queue::MergeItemStatus;
use fm_adapters::ScriptedOutcome;
use fm_bus::Phase;
use fm_core::{RoleType, Strategy, TaskId, TaskStatus};
use tempfile::TempDir;

fn review_roster() -> Vec<fm_core::Role> {
    vec![
        worker_role("worker", 1),
        review_role("judge", RoleType::Judge),
        review_role("critic", RoleType::Critic),
    ]
}

#[tokio::test]
async fn completion_claim_flows_through_judge_critic_and_merge() {
    let dir = TempDir::new().unwrap();
    let config = config_with(dir.path(), Strategy::Manual, review_roster());
    let mut fx = Fixture::start_in(dir, config, "implement the feature", false).await;

    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::done()); // t0
    fx.adapter.script(&fx.agent("judge-1"), ScriptedOutcome::done());
    fx.adapter.script(&fx.agent("critic-1"), ScriptedOutcome::done());
    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::done()); // merge-t0

    let phase = fx.run_to_completion(20).await;
    assert_eq!(phase, Phase::Completed);

    let graph = fx.coordinator.graph();
    // Review tasks were synthesized for both review roles.
    assert_eq!(graph.status(&TaskId::new("review-t0-judge")), Some(TaskStatus::Done));
    assert_eq!(graph.status(&TaskId::new("review-t0-critic")), Some(TaskStatus::Done));
    // Merge task targeted the authority role and completed.
    let merge = graph.get(&TaskId::new("merge-t0")).unwrap();
    assert_eq!(merge.role_hint.as_deref(), Some("worker"));
    assert_eq!(merge.status, TaskStatus::Done);
    assert!(merge.deps.contains(&TaskId::new("t0")));
    assert!(merge.deps.contains(&TaskId::new("review-t0-judge")));

    // The underlying task only became done through the merge.
    assert_eq!(graph.status(&TaskId::new("t0")), Some(TaskStatus::Done));
    let item = fx.coordinator.merge_queue().get(&TaskId::new("t0")).unwrap();
    assert_eq!(item.status, MergeItemStatus::Merged);
    assert_eq!(item.quality_score, Some(1.0));
}

#[tokio::test]
async fn failing_review_rejects_under_strict_threshold() {
    let dir = TempDir::new().unwrap();
    let mut config = config_with(dir.path(), Strategy::Manual, review_roster());
    config.merge.quality_threshold = 1.0;
    config.retries.max_task_attempts = 1;
    let mut fx = Fixture::start_in(dir, config, "implement the feature", false).await;

    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::done());
    fx.adapter.script(&fx.agent("judge-1"), ScriptedOutcome::done());
    fx.adapter.script(&fx.agent("critic-1"), ScriptedOutcome::failed());

    let phase = fx.run_to_completion(20).await;
    assert_eq!(phase, Phase::Completed);

    let item = fx.coordinator.merge_queue().get(&TaskId::new("t0")).unwrap();
    assert_eq!(item.status, MergeItemStatus::Rejected);
    assert_eq!(item.quality_score, Some(0.5));
    assert_eq!(item.decision.as_deref(), Some("rejected"));

    let task = fx.coordinator.graph().get(&TaskId::new("t0")).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure_mode.as_deref(), Some("insufficient_quality"));
    // No merge task was ever created.
    assert!(!fx.coordinator.graph().contains(&TaskId::new("merge-t0")));
}

#[tokio::test]
async fn half_threshold_survives_one_failing_review() {
    let dir = TempDir::new().unwrap();
    let mut config = config_with(dir.path(), Strategy::Manual, review_roster());
    config.merge.quality_threshold = 0.5;
    config.retries.max_task_attempts = 1;
    let mut fx = Fixture::start_in(dir, config, "implement the feature", false).await;

    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::done());
    fx.adapter.script(&fx.agent("judge-1"), ScriptedOutcome::done());
    fx.adapter.script(&fx.agent("critic-1"), ScriptedOutcome::failed());
    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::done()); // merge

    let phase = fx.run_to_completion(20).await;
    assert_eq!(phase, Phase::Completed);

    let item = fx.coordinator.merge_queue().get(&TaskId::new("t0")).unwrap();
    assert_eq!(item.status, MergeItemStatus::Merged);
    assert_eq!(item.quality_score, Some(0.5));
    assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Done));
}

#[tokio::test]
async fn failed_merge_task_rejects_the_item() {
    let dir = TempDir::new().unwrap();
    let mut config = config_with(dir.path(), Strategy::Manual, review_roster());
    config.retries.max_task_attempts = 1;
    let mut fx = Fixture::start_in(dir, config, "implement the feature", false).await;

    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::done());
    fx.adapter.script(&fx.agent("judge-1"), ScriptedOutcome::done());
    fx.adapter.script(&fx.agent("critic-1"), ScriptedOutcome::done());
    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::failed()); // merge fails

    let phase = fx.run_to_completion(20).await;
    assert_eq!(phase, Phase::Completed);

    let item = fx.coordinator.merge_queue().get(&TaskId::new("t0")).unwrap();
    assert_eq!(item.status, MergeItemStatus::Rejected);
    assert_eq!(item.decision.as_deref(), Some("merge_failed"));
    assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Failed));
}

#[tokio::test]
async fn non_reviewable_kinds_bypass_the_pipeline() {
    let dir = TempDir::new().unwrap();
    let config = config_with(dir.path(), Strategy::Hierarchical, review_roster());
    let mut fx = Fixture::start_in(dir, config, "build X", false).await;

    // The analysis task completes; it must go straight to done with no
    // merge-queue item.
    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::done());
    fx.tick().await; // dispatch t0 (analysis)
    fx.tick().await; // harvest claim

    assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Done));
    assert!(fx.coordinator.merge_queue().get(&TaskId::new("t0")).is_none());
}
