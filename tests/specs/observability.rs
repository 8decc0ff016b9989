// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Invariants of the observability surface after a real run: journal order,
//! mailbox sequences, snapshot consistency.

use super::support::{base_config, shell_role};
use fm_adapters::ProcessAdapter;
use fm_bus::{read_journal, read_json_opt, Phase, RunLayout, StateSnapshot};
use fm_core::{AgentId, Event, RoleType, Strategy, SystemClock};
use fm_engine::Coordinator;
use tempfile::TempDir;

async fn completed_run(dir: &TempDir) -> RunLayout {
    let roles = vec![shell_role("worker", RoleType::Worker, 1, "true")];
    let config = base_config(dir.path(), Strategy::Manual, roles);
    let adapter = ProcessAdapter::new(SystemClock);
    let mut coordinator =
        Coordinator::new(config, "echo hi", false, adapter, SystemClock).unwrap();
    let phase = coordinator.run().await.unwrap();
    assert_eq!(phase, Phase::Completed);
    coordinator.layout().clone()
}

#[tokio::test]
async fn journal_is_fully_parseable_and_transitions_are_legal() {
    let dir = TempDir::new().unwrap();
    let layout = completed_run(&dir).await;

    let events = read_journal(&layout.events_path()).unwrap();
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| !e.run_id.as_str().is_empty()));
    assert_eq!(events[0].event.name(), "swarm.start");

    for event in &events {
        if let Event::TaskTransition(record) = &event.event {
            assert!(
                record.from_state.can_transition_to(record.to_state),
                "journaled illegal transition {} -> {}",
                record.from_state,
                record.to_state
            );
        }
    }

    // A reviewable task reaching done was preceded by merge completion.
    let done_index = events
        .iter()
        .position(|e| {
            matches!(&e.event, Event::TaskTransition(r)
                if r.task_id == "t0" && r.to_state == fm_core::TaskStatus::Done)
        })
        .unwrap();
    let merge_done_index = events
        .iter()
        .position(|e| {
            matches!(&e.event, Event::TaskTransition(r)
                if r.task_id == "merge-t0" && r.to_state == fm_core::TaskStatus::Done)
        })
        .unwrap();
    assert!(merge_done_index < done_index);
}

#[tokio::test]
async fn outbox_sequences_are_gap_free_with_one_terminal_per_task() {
    let dir = TempDir::new().unwrap();
    let layout = completed_run(&dir).await;

    let outbox: fm_core::AgentOutbox =
        read_json_opt(&layout.outbox_path(&AgentId::new("worker-1"))).unwrap().unwrap();
    let seqs: Vec<u64> = outbox.events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (1..=seqs.len() as u64).collect::<Vec<_>>());
    assert_eq!(outbox.next_seq, seqs.len() as u64 + 1);

    for task in ["t0", "merge-t0"] {
        let terminals = outbox
            .events
            .iter()
            .filter(|e| {
                e.kind.is_terminal() && e.task_id.as_ref().is_some_and(|t| t.as_str() == task)
            })
            .count();
        assert_eq!(terminals, 1, "task {task}");
    }
}

#[tokio::test]
async fn snapshot_is_consistent_and_self_contained() {
    let dir = TempDir::new().unwrap();
    let layout = completed_run(&dir).await;

    let snap: StateSnapshot = read_json_opt(&layout.state_path()).unwrap().unwrap();
    assert!(snap.state_seq > 0);
    assert_eq!(snap.status.phase, Phase::Completed);

    let q = &snap.status.queue;
    assert_eq!(
        q.pending + q.ready + q.running + q.reviewing + q.done + q.failed + q.blocked + q.skipped,
        q.total
    );
    assert_eq!(q.total, snap.tasks.len());

    // Edges mirror task dependencies.
    for edge in &snap.edges {
        let target = snap.tasks.get(&edge.target).unwrap();
        assert!(target.deps.contains(&edge.source));
    }

    // Agent rows carry enough to render the fleet.
    assert_eq!(snap.agents.len(), 1);
    assert_eq!(snap.agents[0].agent_id, "worker-1");
    assert!(snap.worker_log_files.contains_key(&AgentId::new("worker-1")));

    // Task records exist and agree with the snapshot.
    for row in snap.tasks.values() {
        let record = fm_bus::read_task_record(&layout, &row.task_id).unwrap().unwrap();
        assert_eq!(record.status, row.status);
        assert_eq!(record.attempts, row.attempts);
    }
}

#[tokio::test]
async fn per_agent_log_captures_wrapper_output() {
    let dir = TempDir::new().unwrap();
    let layout = completed_run(&dir).await;

    let log = std::fs::read_to_string(layout.agent_log_path(&AgentId::new("worker-1"))).unwrap();
    assert!(log.contains("[HEARTBEAT]"));
    assert!(log.contains("[TASK_DONE]"));
}
