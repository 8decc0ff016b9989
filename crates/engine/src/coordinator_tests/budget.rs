// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Budget exhaustion and max-runtime enforcement.

use super::support::{config_with, worker_role, Fixture};
use fm_adapters::ScriptedOutcome;
use fm_bus::{read_journal, read_json_opt, Phase, StateSnapshot};
use fm_core::{Strategy, TaskStatus};
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn token_cap_fails_the_run_and_stops_dispatching() {
    let dir = TempDir::new().unwrap();
    let mut config = config_with(dir.path(), Strategy::Parallel, vec![worker_role("coder", 2)]);
    config.budget.max_tokens = 100;
    let mut fx = Fixture::start_in(TempDir::new().unwrap(), config, "build X", false).await;

    // The first completion reports enough tokens to blow the cap.
    fx.adapter.script(
        &fx.agent("coder-1"),
        ScriptedOutcome::Done { progress: vec![], tokens: Some(150), cost_usd: None },
    );
    fx.adapter.script(&fx.agent("coder-2"), ScriptedOutcome::Silent);

    fx.tick().await; // dispatch wave
    let phase = fx.tick().await; // harvest usage -> hard exceeded
    assert_eq!(phase, Phase::Failed);

    let snap: StateSnapshot =
        read_json_opt(&fx.coordinator.layout().state_path()).unwrap().unwrap();
    assert!(snap.status.budget.hard_exceeded);
    assert_eq!(snap.status.phase, Phase::Failed);

    // No further launches after the failing tick.
    let launches_before = read_journal(&fx.coordinator.layout().events_path())
        .unwrap()
        .iter()
        .filter(|e| e.event.name() == "agent.task.launch")
        .count();
    fx.tick().await;
    fx.tick().await;
    let launches_after = read_journal(&fx.coordinator.layout().events_path())
        .unwrap()
        .iter()
        .filter(|e| e.event.name() == "agent.task.launch")
        .count();
    assert_eq!(launches_before, launches_after);
}

#[tokio::test]
async fn full_run_terminates_workers_on_budget_exhaustion() {
    let dir = TempDir::new().unwrap();
    let mut config = config_with(dir.path(), Strategy::Manual, vec![worker_role("worker", 1)]);
    config.budget.max_tokens = 10;
    config.run.poll_interval_ms = 50;
    let mut fx = Fixture::start_in(TempDir::new().unwrap(), config, "echo hi", false).await;

    fx.adapter.script(
        &fx.agent("worker-1"),
        ScriptedOutcome::Done { progress: vec![], tokens: Some(50), cost_usd: None },
    );

    // Drive ticks manually the way run() would, then shut down.
    let mut phase = Phase::Executing;
    for _ in 0..10 {
        phase = fx.tick().await;
        if phase.is_terminal() {
            break;
        }
    }
    assert_eq!(phase, Phase::Failed);
    fx.coordinator.shutdown_agents("shutdown").await.unwrap();

    let terminations = fx.adapter.terminations(&fx.agent("worker-1"));
    assert_eq!(terminations, vec!["shutdown".to_string()]);

    // Errors tail names the budget.
    let snap: StateSnapshot =
        read_json_opt(&fx.coordinator.layout().state_path()).unwrap().unwrap();
    assert!(snap.errors.iter().any(|e| e.category == "budget"));
}

#[tokio::test]
async fn wall_clock_ceiling_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let mut config = config_with(dir.path(), Strategy::Manual, vec![worker_role("worker", 1)]);
    config.run.max_runtime_seconds = 60;
    config.watchdog.task_silence_timeout_seconds = 3600.0;
    config.watchdog.task_max_duration_seconds = 7200.0;
    config.watchdog.heartbeat_timeout_seconds = 7200.0;
    let mut fx = Fixture::start_in(TempDir::new().unwrap(), config, "echo hi", false).await;
    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::Silent);

    fx.tick().await;
    assert_eq!(
        fx.coordinator.graph().status(&fm_core::TaskId::new("t0")),
        Some(TaskStatus::Running)
    );

    fx.advance(Duration::from_secs(120));
    let phase = fx.tick().await;
    assert_eq!(phase, Phase::Failed);

    let snap: StateSnapshot =
        read_json_opt(&fx.coordinator.layout().state_path()).unwrap().unwrap();
    assert!(snap.errors.iter().any(|e| e.category == "timeout"));
}
