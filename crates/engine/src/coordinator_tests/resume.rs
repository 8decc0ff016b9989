// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-recovery and resume reconciliation.

use super::support::{config_with, worker_role, Fixture};
use fm_adapters::ScriptedOutcome;
use fm_bus::{read_journal, read_json_opt, Phase, StateSnapshot};
use fm_core::{Strategy, TaskId, TaskStatus};
use tempfile::TempDir;

#[tokio::test]
async fn resume_preserves_done_tasks_and_requeues_running() {
    let dir = TempDir::new().unwrap();
    let config = config_with(dir.path(), Strategy::Parallel, vec![worker_role("coder", 2)]);

    // First life: finish t0, leave t1 running, then "crash" (drop without
    // shutdown).
    let pre_crash_seq;
    {
        let mut fx = Fixture::start_in(
            TempDir::new().unwrap(),
            config.clone(),
            "build X",
            false,
        )
        .await;
        fx.adapter.script(&fx.agent("coder-1"), ScriptedOutcome::done()); // t0
        fx.adapter.script(&fx.agent("coder-1"), ScriptedOutcome::done()); // merge-t0
        fx.adapter.script(&fx.agent("coder-2"), ScriptedOutcome::Silent); // t1 stays running

        for _ in 0..12 {
            fx.tick().await;
            if fx.coordinator.graph().status(&TaskId::new("t0")) == Some(TaskStatus::Done) {
                break;
            }
        }
        assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Done));
        assert_eq!(fx.coordinator.graph().status(&TaskId::new("t1")), Some(TaskStatus::Running));

        let snap: StateSnapshot =
            read_json_opt(&fx.coordinator.layout().state_path()).unwrap().unwrap();
        pre_crash_seq = snap.state_seq;
        // Drop without shutdown: simulated coordinator crash.
    }

    // Second life: resume in the same run directory.
    let mut fx = Fixture::start_in(TempDir::new().unwrap(), config, "build X", true).await;
    {
        let graph = fx.coordinator.graph();
        assert_eq!(graph.status(&TaskId::new("t0")), Some(TaskStatus::Done));
        assert_eq!(graph.status(&TaskId::new("merge-t0")), Some(TaskStatus::Done));
        // Previously running task restarts as ready, attempts preserved.
        assert_eq!(graph.status(&TaskId::new("t1")), Some(TaskStatus::Ready));
        assert_eq!(graph.attempts(&TaskId::new("t1")), 1);
    }

    // state_seq keeps strictly increasing across lives.
    fx.tick().await;
    let snap: StateSnapshot =
        read_json_opt(&fx.coordinator.layout().state_path()).unwrap().unwrap();
    assert!(snap.state_seq > pre_crash_seq);

    // The journal is one continuous, fully parseable sequence.
    let events = read_journal(&fx.coordinator.layout().events_path()).unwrap();
    let starts = events.iter().filter(|e| e.event.name() == "swarm.start").count();
    assert_eq!(starts, 2);
}

#[tokio::test]
async fn resumed_run_finishes_the_remaining_work() {
    let dir = TempDir::new().unwrap();
    let config = config_with(dir.path(), Strategy::Manual, vec![worker_role("worker", 1)]);

    {
        let mut fx =
            Fixture::start_in(TempDir::new().unwrap(), config.clone(), "echo hi", false).await;
        fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::Silent);
        fx.tick().await; // t0 running
        assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Running));
    }

    let mut fx = Fixture::start_in(TempDir::new().unwrap(), config, "echo hi", true).await;
    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::done());
    fx.adapter.script(&fx.agent("worker-1"), ScriptedOutcome::done());

    let phase = fx.run_to_completion(10).await;
    assert_eq!(phase, Phase::Completed);
    assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Done));
}

#[tokio::test]
async fn manifest_round_trip_is_identity() {
    let dir = TempDir::new().unwrap();
    let config = config_with(dir.path(), Strategy::Hierarchical, vec![worker_role("worker", 1)]);
    let fx = Fixture::start_in(TempDir::new().unwrap(), config, "build X", false).await;

    let manifest_path = fx.coordinator.layout().manifest_path();
    let manifest: fm_core::Manifest = read_json_opt(&manifest_path).unwrap().unwrap();
    let rewritten = serde_json::to_string_pretty(&manifest).unwrap();
    let reparsed: fm_core::Manifest = serde_json::from_str(&rewritten).unwrap();
    assert_eq!(reparsed, manifest);
    assert_eq!(reparsed.tasks.len(), fx.coordinator.graph().len());
    assert_eq!(reparsed.roles.len(), 1);
}

#[tokio::test]
async fn resume_without_manifest_bootstraps_fresh() {
    let dir = TempDir::new().unwrap();
    let config = config_with(dir.path(), Strategy::Manual, vec![worker_role("worker", 1)]);
    let fx = Fixture::start_in(TempDir::new().unwrap(), config, "echo hi", true).await;

    assert_eq!(fx.coordinator.graph().len(), 1);
    assert!(fx.coordinator.layout().manifest_path().exists());
}
