// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Invalid transitions and mailbox invariants at the coordinator level.

use super::support::{worker_role, Fixture};
use fm_adapters::ScriptedOutcome;
use fm_bus::{read_json_opt, StateSnapshot};
use fm_core::{OutboxEventKind, Strategy, TaskId, TaskStatus};

#[tokio::test]
async fn invalid_transition_is_recorded_and_ignored() {
    let mut fx = Fixture::start(Strategy::Manual, vec![worker_role("worker", 1)], "echo hi").await;

    // t0 is pending; done is not reachable from pending.
    let changed = fx
        .coordinator
        .transition_task(&TaskId::new("t0"), TaskStatus::Done, "coordinator", "bogus")
        .unwrap();
    assert!(!changed);
    assert_eq!(fx.coordinator.graph().status(&TaskId::new("t0")), Some(TaskStatus::Pending));

    fx.tick().await;
    let snap: StateSnapshot =
        read_json_opt(&fx.coordinator.layout().state_path()).unwrap().unwrap();
    let error = snap.errors.iter().find(|e| e.category == "invalid_transition").unwrap();
    assert!(error.message.contains("t0"));
    assert!(error.message.contains("pending->done"));
}

#[tokio::test]
async fn unknown_task_transition_is_recorded_and_ignored() {
    let mut fx = Fixture::start(Strategy::Manual, vec![worker_role("worker", 1)], "echo hi").await;
    let changed = fx
        .coordinator
        .transition_task(&TaskId::new("ghost"), TaskStatus::Ready, "coordinator", "x")
        .unwrap();
    assert!(!changed);

    fx.tick().await;
    let snap: StateSnapshot =
        read_json_opt(&fx.coordinator.layout().state_path()).unwrap().unwrap();
    assert!(snap.errors.iter().any(|e| e.category == "invalid_transition"));
}

#[tokio::test]
async fn mailboxes_hold_gap_free_sequences_and_one_terminal_per_task() {
    let mut fx = Fixture::start(Strategy::Manual, vec![worker_role("worker", 1)], "echo hi").await;
    let agent = fx.agent("worker-1");
    fx.adapter.script(
        &agent,
        ScriptedOutcome::Done {
            progress: vec!["reading".to_string(), "writing".to_string()],
            tokens: None,
            cost_usd: None,
        },
    );
    fx.adapter.script(&agent, ScriptedOutcome::done());
    fx.run_to_completion(10).await;

    let inbox = fx.coordinator.mailboxes().read_inbox(&agent).unwrap();
    let inbox_seqs: Vec<u64> = inbox.messages.iter().map(|m| m.seq).collect();
    assert_eq!(inbox_seqs, (1..=inbox_seqs.len() as u64).collect::<Vec<_>>());
    assert!(inbox.messages.iter().all(|m| m.requires_ack));

    let outbox = fx.coordinator.mailboxes().read_outbox(&agent).unwrap();
    let outbox_seqs: Vec<u64> = outbox.events.iter().map(|e| e.seq).collect();
    assert_eq!(outbox_seqs, (1..=outbox_seqs.len() as u64).collect::<Vec<_>>());

    // Exactly one terminal event per assigned task.
    for task in ["t0", "merge-t0"] {
        let terminals = outbox
            .events
            .iter()
            .filter(|e| {
                e.kind.is_terminal() && e.task_id.as_ref().is_some_and(|id| id.as_str() == task)
            })
            .count();
        assert_eq!(terminals, 1, "task {task}");
    }

    // Progress lines for t0 are present and task-stamped.
    let progress = outbox
        .events
        .iter()
        .filter(|e| e.kind == OutboxEventKind::Progress)
        .count();
    assert_eq!(progress, 2);
}

#[tokio::test]
async fn queue_stats_always_sum_to_total() {
    let mut fx =
        Fixture::start(Strategy::Parallel, vec![worker_role("coder", 2)], "build X").await;
    for i in 1..=2 {
        let agent = fx.agent(&format!("coder-{i}"));
        for _ in 0..5 {
            fx.adapter.script(&agent, ScriptedOutcome::done());
        }
    }

    for _ in 0..30 {
        let phase = fx.tick().await;
        let snap: StateSnapshot =
            read_json_opt(&fx.coordinator.layout().state_path()).unwrap().unwrap();
        let q = snap.status.queue;
        assert_eq!(
            q.pending + q.ready + q.running + q.reviewing + q.done + q.failed + q.blocked
                + q.skipped,
            q.total
        );
        assert_eq!(q.total, snap.tasks.len());
        if phase.is_terminal() {
            return;
        }
    }
    panic!("did not finish");
}
