// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Silence/duration timeouts, retry, and the attempt cap.

use super::support::{config_with, worker_role, Fixture};
use fm_adapters::ScriptedOutcome;
use fm_bus::{read_journal, Phase};
use fm_core::{Classification, Event, Strategy, TaskId, TaskStatus};
use std::time::Duration;
use tempfile::TempDir;

fn silence_config(dir: &TempDir, max_attempts: u32) -> fm_core::Config {
    let mut config = config_with(dir.path(), Strategy::Manual, vec![worker_role("worker", 1)]);
    config.retries.max_task_attempts = max_attempts;
    config.watchdog.task_silence_timeout_seconds = 1.0;
    config.watchdog.task_max_duration_seconds = 900.0;
    config.watchdog.heartbeat_timeout_seconds = 3600.0;
    config
}

#[tokio::test]
async fn silent_task_times_out_then_succeeds_on_retry() {
    let dir = TempDir::new().unwrap();
    let config = silence_config(&dir, 2);
    let mut fx = Fixture::start_in(dir, config, "echo hi", false).await;
    let agent = fx.agent("worker-1");

    // First dispatch: nothing. Second: success. Plus the merge task.
    fx.adapter.script(&agent, ScriptedOutcome::Silent);
    fx.adapter.script(&agent, ScriptedOutcome::done());
    fx.adapter.script(&agent, ScriptedOutcome::done());

    fx.tick().await;
    assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Running));

    // Cross the silence threshold; the task fails back to ready and is
    // redispatched in the same tick.
    fx.advance(Duration::from_millis(1500));
    fx.tick().await;
    assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Running));
    assert_eq!(fx.coordinator.graph().attempts(&TaskId::new("t0")), 2);

    let phase = fx.run_to_completion(10).await;
    assert_eq!(phase, Phase::Completed);
    assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Done));

    // Classifications for t0: silent_timeout first, then success.
    let events = read_journal(&fx.coordinator.layout().events_path()).unwrap();
    let classifications: Vec<(Classification, Option<String>)> = events
        .iter()
        .filter_map(|e| match &e.event {
            Event::TaskClassified { task_id, classification, reason, .. }
                if task_id.as_str() == "t0" =>
            {
                Some((*classification, reason.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(classifications.len(), 2);
    assert_eq!(classifications[0].0, Classification::SilentTimeout);
    assert_eq!(classifications[0].1.as_deref(), Some("silent_timeout>1s"));
    assert_eq!(classifications[1].0, Classification::Success);
}

#[tokio::test]
async fn first_failure_is_terminal_when_attempt_cap_is_one() {
    let dir = TempDir::new().unwrap();
    let config = silence_config(&dir, 1);
    let mut fx = Fixture::start_in(dir, config, "echo hi", false).await;
    let agent = fx.agent("worker-1");
    fx.adapter.script(&agent, ScriptedOutcome::Silent);

    fx.tick().await;
    fx.advance(Duration::from_millis(1500));
    let phase = fx.tick().await;

    let task = fx.coordinator.graph().get(&TaskId::new("t0")).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure_mode.as_deref(), Some("silent_timeout>1s"));
    assert_eq!(phase, Phase::Completed);
}

#[tokio::test]
async fn silence_fires_before_duration_when_shorter() {
    let dir = TempDir::new().unwrap();
    let mut config = silence_config(&dir, 1);
    config.watchdog.task_silence_timeout_seconds = 1.0;
    config.watchdog.task_max_duration_seconds = 2.0;
    let mut fx = Fixture::start_in(dir, config, "echo hi", false).await;
    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::Silent);

    fx.tick().await;
    // Past both thresholds at once: exactly one failure, the silence one.
    fx.advance(Duration::from_secs(5));
    fx.tick().await;

    let events = read_journal(&fx.coordinator.layout().events_path()).unwrap();
    let classifications: Vec<Classification> = events
        .iter()
        .filter_map(|e| match &e.event {
            Event::TaskClassified { classification, .. } => Some(*classification),
            _ => None,
        })
        .collect();
    assert_eq!(classifications, vec![Classification::SilentTimeout]);

    let task = fx.coordinator.graph().get(&TaskId::new("t0")).unwrap();
    assert!(task.failure_mode.as_deref().unwrap().starts_with("silent_timeout>"));
}

#[tokio::test]
async fn worker_reported_failure_requeues_then_fails_at_cap() {
    let dir = TempDir::new().unwrap();
    let config = silence_config(&dir, 2);
    let mut fx = Fixture::start_in(dir, config, "echo hi", false).await;
    let agent = fx.agent("worker-1");
    fx.adapter.script(&agent, ScriptedOutcome::failed());
    fx.adapter.script(&agent, ScriptedOutcome::failed());

    fx.tick().await; // dispatch, wrapper reports failure
    fx.tick().await; // harvest failure -> ready -> redispatch -> failure again
    let phase = fx.run_to_completion(5).await;

    let task = fx.coordinator.graph().get(&TaskId::new("t0")).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure_mode.as_deref(), Some("worker_reported_failure"));
    assert_eq!(fx.coordinator.graph().attempts(&TaskId::new("t0")), 2);
    assert_eq!(phase, Phase::Completed);
}

#[tokio::test]
async fn dead_process_without_terminal_marker_fails_the_task() {
    let dir = TempDir::new().unwrap();
    let config = silence_config(&dir, 1);
    let mut fx = Fixture::start_in(dir, config, "echo hi", false).await;
    let agent = fx.agent("worker-1");
    fx.adapter.script(&agent, ScriptedOutcome::Silent);

    fx.tick().await;
    fx.adapter.mark_exited(&agent, Some(137), "out of memory\nkilled");
    fx.tick().await;

    let task = fx.coordinator.graph().get(&TaskId::new("t0")).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    let reason = task.failure_mode.as_deref().unwrap();
    assert!(reason.contains("process_exit_without_terminal_event"));
    assert!(reason.contains("exit_code=137"));
    assert!(reason.contains("out of memory | killed"));
}
