// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::RoleBuilder;

fn workers(count: u32) -> Vec<Role> {
    vec![RoleBuilder::default().role_id("coder").count(count).build()]
}

fn full_roster(worker_count: u32) -> Vec<Role> {
    vec![
        RoleBuilder::default().role_id("coder").count(worker_count).build(),
        RoleBuilder::default().role_id("judge").role_type(RoleType::Judge).build(),
        RoleBuilder::default().role_id("critic").role_type(RoleType::Critic).build(),
    ]
}

#[test]
fn manual_emits_single_goal_task() {
    let d = decompose("echo hi", &workers(1), Strategy::Manual, 12);
    assert_eq!(d.tasks.len(), 1);
    let t = &d.tasks[0];
    assert_eq!(t.task_id, "t0");
    assert_eq!(t.kind, TaskKind::Implement);
    assert_eq!(t.description, "echo hi");
    assert_eq!(t.role_hint.as_deref(), Some("coder"));
    assert!(t.deps.is_empty());
    assert!(d.events.is_empty());
}

#[test]
fn fast_single_worker_skips_test_task() {
    let d = decompose("build X", &workers(1), Strategy::Fast, 12);
    let kinds: Vec<TaskKind> = d.tasks.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![TaskKind::Implement, TaskKind::Integrate]);
    assert_eq!(d.tasks[0].status, TaskStatus::Ready);
    assert_eq!(d.tasks[1].deps, vec![TaskId::new("t0")]);
}

#[test]
fn fast_multi_worker_adds_test_task() {
    let d = decompose("build X", &workers(2), Strategy::Fast, 12);
    let kinds: Vec<TaskKind> = d.tasks.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![TaskKind::Implement, TaskKind::Test, TaskKind::Integrate]);
    assert_eq!(
        d.tasks[2].deps,
        vec![TaskId::new("t0"), TaskId::new("t1")]
    );
}

#[test]
fn parallel_three_workers_fans_out_with_integrate_barrier() {
    let d = decompose("build X", &workers(3), Strategy::Parallel, 12);

    let ready: Vec<&Task> = d.tasks.iter().filter(|t| t.status == TaskStatus::Ready).collect();
    assert_eq!(ready.len(), 3);

    let integrate = d.tasks.iter().find(|t| t.kind == TaskKind::Integrate).unwrap();
    assert_eq!(integrate.status, TaskStatus::Pending);
    assert_eq!(
        integrate.deps,
        vec![TaskId::new("t0"), TaskId::new("t1"), TaskId::new("t2")]
    );

    assert!(matches!(
        d.events[..],
        [Event::DecompositionParallel { worker_count: 3, parallel_tasks: 3, .. }]
    ));
}

#[test]
fn parallel_single_worker_degrades_to_one_task() {
    let d = decompose("build X", &workers(1), Strategy::Parallel, 12);
    assert_eq!(d.tasks.len(), 1);
    assert_eq!(d.tasks[0].status, TaskStatus::Ready);
    assert_eq!(d.tasks[0].kind, TaskKind::Implement);
}

#[test]
fn parallel_appends_judge_and_critic_after_integrate() {
    let d = decompose("build X", &full_roster(2), Strategy::Parallel, 12);
    let judge = d.tasks.iter().find(|t| t.kind == TaskKind::Judge).unwrap();
    let critic = d.tasks.iter().find(|t| t.kind == TaskKind::Critic).unwrap();
    let integrate = d.tasks.iter().find(|t| t.kind == TaskKind::Integrate).unwrap();

    assert_eq!(judge.deps, vec![integrate.task_id.clone()]);
    assert_eq!(critic.deps, vec![integrate.task_id.clone(), judge.task_id.clone()]);
    assert_eq!(judge.role_hint.as_deref(), Some("judge"));
    assert_eq!(critic.role_hint.as_deref(), Some("critic"));
}

#[test]
fn hierarchical_builds_pipeline_with_only_first_ready() {
    let d = decompose("build X", &full_roster(1), Strategy::Hierarchical, 12);
    let kinds: Vec<TaskKind> = d.tasks.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TaskKind::Analysis,
            TaskKind::Design,
            TaskKind::Implement,
            TaskKind::Test,
            TaskKind::Integrate,
            TaskKind::Judge,
            TaskKind::Critic,
        ]
    );
    assert_eq!(d.tasks[0].status, TaskStatus::Ready);
    assert!(d.tasks[1..].iter().all(|t| t.status == TaskStatus::Pending));
}

#[test]
fn llm_falls_back_to_parallel_with_event() {
    let d = decompose("build X", &workers(2), Strategy::Llm, 12);
    assert!(matches!(
        d.events[0],
        Event::DecompositionFallback { ref mode, .. } if mode == "parallel"
    ));
    // Parallel shape follows the fallback event.
    assert!(d.tasks.iter().any(|t| t.kind == TaskKind::Integrate));
}

#[test]
fn max_tasks_caps_output() {
    let d = decompose("build X", &full_roster(3), Strategy::Hierarchical, 3);
    assert_eq!(d.tasks.len(), 3);
    assert_eq!(d.tasks[0].status, TaskStatus::Ready);

    let d = decompose("build X", &workers(4), Strategy::Parallel, 2);
    assert_eq!(d.tasks.len(), 2);
}
