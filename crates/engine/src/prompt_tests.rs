// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::TaskBuilder;
use yare::parameterized;

#[test]
fn coding_prompt_carries_goal_title_and_description() {
    let task = TaskBuilder::default()
        .task_id("t2")
        .title("Implement core changes")
        .description("Add the parser module")
        .kind(TaskKind::Implement)
        .build();
    let prompt = build_task_prompt("build a parser", &task);

    assert!(prompt.starts_with("Project goal: build a parser"));
    assert!(prompt.contains("Task t2: Implement core changes"));
    assert!(prompt.contains("Add the parser module"));
    assert!(prompt.contains("You are a coding agent"));
}

#[test]
fn empty_goal_omits_goal_context() {
    let task = TaskBuilder::default().build();
    let prompt = build_task_prompt("", &task);
    assert!(!prompt.contains("Project goal"));
    assert!(prompt.starts_with("Task t0:"));
}

#[test]
fn acceptance_criteria_are_listed() {
    let task = TaskBuilder::default()
        .acceptance(vec!["tests pass".to_string(), "no panics".to_string()])
        .build();
    let prompt = build_task_prompt("goal", &task);
    assert!(prompt.contains("Acceptance criteria:\n  - tests pass\n  - no panics"));
}

#[test]
fn target_files_are_listed() {
    let task = TaskBuilder::default()
        .target_files(vec!["src/lib.rs".to_string()])
        .build();
    let prompt = build_task_prompt("goal", &task);
    assert!(prompt.contains("Target files:\n  - src/lib.rs"));
}

#[test]
fn multiline_descriptions_are_flattened() {
    let task = TaskBuilder::default().description("line one\nline two").build();
    let prompt = build_task_prompt("goal", &task);
    assert!(prompt.contains("line one line two"));
}

#[parameterized(
    analysis = { TaskKind::Analysis, "written plan or analysis" },
    design = { TaskKind::Design, "written plan or analysis" },
    judge = { TaskKind::Judge, "Evaluate the work" },
    critic = { TaskKind::Critic, "Evaluate the work" },
    merge = { TaskKind::Merge, "current working directory" },
    implement = { TaskKind::Implement, "coding agent" },
)]
fn templates_by_kind(kind: TaskKind, marker: &str) {
    let task = TaskBuilder::default().kind(kind).build();
    assert!(build_task_prompt("goal", &task).contains(marker));
}

#[test]
fn prompts_never_contain_protocol_markers() {
    for kind in [
        TaskKind::Analysis,
        TaskKind::Design,
        TaskKind::Implement,
        TaskKind::Test,
        TaskKind::Integrate,
        TaskKind::Judge,
        TaskKind::Critic,
        TaskKind::Merge,
    ] {
        let task = TaskBuilder::default().kind(kind).build();
        let prompt = build_task_prompt("goal", &task);
        assert!(!prompt.contains("[HEARTBEAT]"));
        assert!(!prompt.contains("[TASK_DONE]"));
        assert!(!prompt.contains("[TASK_FAILED]"));
    }
}
