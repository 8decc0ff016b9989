// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::{RoleBuilder, TaskBuilder, TaskKind};

fn slot(agent_id: &str, role_id: &str, busy: bool) -> AgentSlot {
    AgentSlot { agent_id: AgentId::new(agent_id), role_id: role_id.to_string(), busy }
}

fn worker_roles() -> Vec<Role> {
    vec![
        RoleBuilder::default().role_id("coder").build(),
        RoleBuilder::default().role_id("judge").role_type(RoleType::Judge).build(),
    ]
}

#[test]
fn hinted_role_is_preferred() {
    let task = TaskBuilder::default().task_id("t0").role_hint("judge").kind(TaskKind::Judge).build();
    let slots = vec![slot("coder-1", "coder", false), slot("judge-1", "judge", false)];

    let assignments = assign_tasks(&[&task], &slots, &worker_roles());
    assert_eq!(assignments, vec![Assignment { task_id: TaskId::new("t0"), agent_id: AgentId::new("judge-1") }]);
}

#[test]
fn falls_back_to_worker_accepting_kind() {
    // Hinted role is busy; a worker role accepting implement picks it up.
    let task = TaskBuilder::default().task_id("t0").role_hint("judge").kind(TaskKind::Implement).build();
    let slots = vec![slot("coder-1", "coder", false), slot("judge-1", "judge", true)];

    let assignments = assign_tasks(&[&task], &slots, &worker_roles());
    assert_eq!(assignments[0].agent_id, AgentId::new("coder-1"));
}

#[test]
fn kind_filter_blocks_fallback() {
    let roles = vec![RoleBuilder::default()
        .role_id("coder")
        .task_kinds(vec![TaskKind::Implement])
        .build()];
    let task = TaskBuilder::default().task_id("t0").kind(TaskKind::Judge).build();
    let slots = vec![slot("coder-1", "coder", false)];

    assert!(assign_tasks(&[&task], &slots, &roles).is_empty());
}

#[test]
fn busy_agents_are_skipped() {
    let task = TaskBuilder::default().task_id("t0").role_hint("coder").build();
    let slots = vec![slot("coder-1", "coder", true)];
    assert!(assign_tasks(&[&task], &slots, &worker_roles()).is_empty());
}

#[test]
fn one_task_per_agent_per_round() {
    let t0 = TaskBuilder::default().task_id("t0").role_hint("coder").build();
    let t1 = TaskBuilder::default().task_id("t1").role_hint("coder").build();
    let slots = vec![slot("coder-1", "coder", false)];

    let assignments = assign_tasks(&[&t0, &t1], &slots, &worker_roles());
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].task_id, TaskId::new("t0"));
}

#[test]
fn ties_break_by_agent_id_order() {
    let task = TaskBuilder::default().task_id("t0").role_hint("coder").build();
    // Deliberately unsorted slot list.
    let slots = vec![
        slot("coder-3", "coder", false),
        slot("coder-1", "coder", false),
        slot("coder-2", "coder", false),
    ];

    let assignments = assign_tasks(&[&task], &slots, &worker_roles());
    assert_eq!(assignments[0].agent_id, AgentId::new("coder-1"));
}

#[test]
fn parallel_fanout_fills_all_free_agents() {
    let tasks: Vec<_> = (0..3)
        .map(|i| TaskBuilder::default().task_id(format!("t{i}")).role_hint("coder").build())
        .collect();
    let task_refs: Vec<&Task> = tasks.iter().collect();
    let slots = vec![
        slot("coder-1", "coder", false),
        slot("coder-2", "coder", false),
        slot("coder-3", "coder", false),
    ];

    let assignments = assign_tasks(&task_refs, &slots, &worker_roles());
    let agents: Vec<&str> = assignments.iter().map(|a| a.agent_id.as_str()).collect();
    assert_eq!(agents, vec!["coder-1", "coder-2", "coder-3"]);
}

#[test]
fn unhinted_task_uses_worker_fallback() {
    let task = TaskBuilder::default().task_id("t0").build();
    let slots = vec![slot("judge-1", "judge", false), slot("coder-1", "coder", false)];

    let assignments = assign_tasks(&[&task], &slots, &worker_roles());
    assert_eq!(assignments[0].agent_id, AgentId::new("coder-1"));
}
