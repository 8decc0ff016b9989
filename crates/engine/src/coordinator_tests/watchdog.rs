// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat watchdog: stale-agent restart and task re-queue.

use super::support::{config_with, worker_role, Fixture};
use fm_adapters::ScriptedOutcome;
use fm_bus::{read_journal, read_json_opt, Phase, StateSnapshot};
use fm_core::{Clock, Strategy, TaskId, TaskStatus};
use std::time::Duration;
use tempfile::TempDir;

fn watchdog_config(dir: &TempDir) -> fm_core::Config {
    let mut config = config_with(dir.path(), Strategy::Manual, vec![worker_role("worker", 1)]);
    config.watchdog.heartbeat_timeout_seconds = 30.0;
    config.watchdog.task_silence_timeout_seconds = 600.0;
    config.watchdog.task_max_duration_seconds = 1200.0;
    config
}

#[tokio::test]
async fn stale_agent_is_restarted_and_task_requeued() {
    let dir = TempDir::new().unwrap();
    let config = watchdog_config(&dir);
    let mut fx = Fixture::start_in(TempDir::new().unwrap(), config, "echo hi", false).await;
    let agent = fx.agent("worker-1");

    fx.adapter.script(&agent, ScriptedOutcome::Silent);
    fx.tick().await;
    assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Running));
    assert_eq!(fx.adapter.spawn_count(&agent), 1);

    // Freeze the heartbeat for longer than the threshold while the process
    // stays alive.
    fx.advance(Duration::from_secs(60));
    fx.coordinator.tick().await.unwrap();

    assert_eq!(fx.adapter.spawn_count(&agent), 2);
    assert!(fx.adapter.terminations(&agent).contains(&"watchdog_restart".to_string()));
    assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Ready));

    let events = read_journal(&fx.coordinator.layout().events_path()).unwrap();
    assert!(events.iter().any(|e| e.event.name() == "agent.restart"));

    let snap: StateSnapshot =
        read_json_opt(&fx.coordinator.layout().state_path()).unwrap().unwrap();
    assert_eq!(snap.status.watchdog.crash_count, 1);
    assert_eq!(snap.status.watchdog.reassigned_tasks, 1);
    assert_eq!(snap.agents[0].restart_count, 1);
}

#[tokio::test]
async fn restarted_agent_completes_the_requeued_task() {
    let dir = TempDir::new().unwrap();
    let config = watchdog_config(&dir);
    let mut fx = Fixture::start_in(TempDir::new().unwrap(), config, "echo hi", false).await;
    let agent = fx.agent("worker-1");

    fx.adapter.script(&agent, ScriptedOutcome::Silent);
    fx.tick().await;
    fx.advance(Duration::from_secs(60));
    fx.coordinator.tick().await.unwrap(); // restart, t0 back to ready

    fx.adapter.script(&agent, ScriptedOutcome::done());
    fx.adapter.script(&agent, ScriptedOutcome::done()); // merge task
    let phase = fx.run_to_completion(10).await;

    assert_eq!(phase, Phase::Completed);
    assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Done));
    assert_eq!(fx.coordinator.graph().attempts(&TaskId::new("t0")), 2);
}

#[tokio::test]
async fn fresh_heartbeats_do_not_trigger_restarts() {
    let dir = TempDir::new().unwrap();
    let config = watchdog_config(&dir);
    let mut fx = Fixture::start_in(TempDir::new().unwrap(), config, "echo hi", false).await;
    let agent = fx.agent("worker-1");
    fx.adapter.script(&agent, ScriptedOutcome::Silent);

    // Ticks with small steps keep the heartbeat fresh via the fixture's
    // advance helper.
    for _ in 0..5 {
        fx.tick().await;
        fx.adapter.set_heartbeat_ms(&agent, fx.clock.epoch_ms());
    }
    assert_eq!(fx.adapter.spawn_count(&agent), 1);
    assert!(fx.adapter.terminations(&agent).is_empty());
}
