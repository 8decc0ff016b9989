// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end dispatch scenarios: single task, parallel fan-out.

use super::support::{worker_role, Fixture};
use fm_adapters::ScriptedOutcome;
use fm_bus::{read_journal, read_json_opt, Phase, StateSnapshot};
use fm_core::{Event, Strategy, TaskId, TaskStatus};

#[tokio::test]
async fn single_worker_manual_task_runs_to_done() {
    let mut fx = Fixture::start(Strategy::Manual, vec![worker_role("worker", 1)], "echo hi").await;
    let agent = fx.agent("worker-1");

    // One outcome for the goal task, one for its auto-generated merge task.
    fx.adapter.script(&agent, ScriptedOutcome::done());
    fx.adapter.script(&agent, ScriptedOutcome::done());

    let phase = fx.run_to_completion(10).await;
    assert_eq!(phase, Phase::Completed);

    let graph = fx.coordinator.graph();
    assert_eq!(graph.status(&TaskId::new("t0")), Some(TaskStatus::Done));
    assert_eq!(graph.status(&TaskId::new("merge-t0")), Some(TaskStatus::Done));

    // Prompts: the goal task first, then the merge task.
    let sent = fx.adapter.sent_lines(&agent);
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("echo hi"));
    assert!(sent[1].contains("Merge t0"));

    // Final snapshot is self-contained and consistent.
    let snap: StateSnapshot =
        read_json_opt(&fx.coordinator.layout().state_path()).unwrap().unwrap();
    assert_eq!(snap.status.phase, Phase::Completed);
    assert_eq!(snap.status.queue.done, snap.status.queue.total);
    assert_eq!(snap.merge_queue.merged, 1);
}

#[tokio::test]
async fn journal_records_the_full_task_lifecycle() {
    let mut fx = Fixture::start(Strategy::Manual, vec![worker_role("worker", 1)], "echo hi").await;
    let agent = fx.agent("worker-1");
    fx.adapter.script(&agent, ScriptedOutcome::done());
    fx.adapter.script(&agent, ScriptedOutcome::done());
    fx.run_to_completion(10).await;

    let events = read_journal(&fx.coordinator.layout().events_path()).unwrap();
    let names: Vec<&str> = events.iter().map(|e| e.event.name()).collect();

    assert!(names.contains(&"swarm.start"));
    assert!(names.contains(&"agent.spawned"));
    assert!(names.contains(&"agent.task.launch"));
    assert!(names.contains(&"agent.event"));
    assert!(names.contains(&"agent.task.exit"));
    assert!(names.contains(&"agent.task.classified"));
    assert!(names.contains(&"task.created")); // merge task
    assert!(names.contains(&"task.transition"));

    // Every persisted transition obeys the table.
    for event in &events {
        if let Event::TaskTransition(record) = &event.event {
            assert!(
                record.from_state.can_transition_to(record.to_state),
                "{} -> {} journaled",
                record.from_state,
                record.to_state
            );
        }
    }
}

#[tokio::test]
async fn three_parallel_workers_then_integrate() {
    let mut fx = Fixture::start(Strategy::Parallel, vec![worker_role("coder", 3)], "build X").await;

    // Three focus tasks start ready; integrate waits on all of them.
    {
        let graph = fx.coordinator.graph();
        let ready: Vec<TaskId> = graph.ready_tasks();
        assert_eq!(ready.len(), 3);
        assert_eq!(graph.status(&TaskId::new("t3")), Some(TaskStatus::Pending));
    }

    // Plenty of successes for focus tasks, their merges, and integrate.
    for i in 1..=3 {
        let agent = fx.agent(&format!("coder-{i}"));
        for _ in 0..4 {
            fx.adapter.script(&agent, ScriptedOutcome::done());
        }
    }

    // First tick dispatches all three in one wave.
    fx.tick().await;
    {
        let graph = fx.coordinator.graph();
        for id in ["t0", "t1", "t2"] {
            assert_eq!(graph.status(&TaskId::new(id)), Some(TaskStatus::Running), "{id}");
        }
        assert_eq!(graph.status(&TaskId::new("t3")), Some(TaskStatus::Pending));
    }

    let phase = fx.run_to_completion(40).await;
    assert_eq!(phase, Phase::Completed);
    let graph = fx.coordinator.graph();
    assert_eq!(graph.status(&TaskId::new("t3")), Some(TaskStatus::Done));

    // Integrate only launched after every focus task finished.
    let events = read_journal(&fx.coordinator.layout().events_path()).unwrap();
    let launch_index = |task: &str| {
        events
            .iter()
            .position(|e| {
                matches!(&e.event, Event::TaskLaunch { task_id, .. } if task_id.as_str() == task)
            })
            .unwrap_or_else(|| panic!("no launch for {task}"))
    };
    let integrate_launch = launch_index("t3");
    for task in ["t0", "t1", "t2"] {
        assert!(launch_index(task) < integrate_launch);
    }
}

#[tokio::test]
async fn no_worker_is_ever_double_booked() {
    let mut fx = Fixture::start(Strategy::Parallel, vec![worker_role("coder", 2)], "build X").await;
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
        // assignments is agent-keyed, so double booking would collapse keys;
        // check the reverse direction too.
        let mut tasks: Vec<_> = snap.assignments.values().collect();
        tasks.sort();
        tasks.dedup();
        assert_eq!(tasks.len(), snap.assignments.len());
        if phase.is_terminal() {
            return;
        }
    }
    panic!("did not finish");
}
