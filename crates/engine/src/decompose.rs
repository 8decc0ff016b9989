// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Initial task decomposition.
//!
//! Turns the user goal and the role roster into a seed task set under one of
//! the configured strategies. The decomposer never assigns tasks; it only
//! chooses shapes: one blob (manual), a short chain (fast), a per-worker
//! fan-out with an integrate barrier (parallel), or a full analysis → design
//! → implement/test → integrate pipeline (hierarchical). A requested `llm`
//! strategy without a planner falls back to parallel so workers start
//! immediately.

use fm_core::{Event, Role, RoleType, Strategy, Task, TaskId, TaskKind, TaskStatus};

/// Decomposer output: the seed tasks plus the events describing how the
/// shape was chosen.
#[derive(Debug, Clone, Default)]
pub struct Decomposition {
    pub tasks: Vec<Task>,
    pub events: Vec<Event>,
}

fn role_of_type(roles: &[Role], role_type: RoleType) -> Option<&Role> {
    roles.iter().find(|r| r.role_type == role_type)
}

fn worker_role_id(roles: &[Role]) -> Option<String> {
    role_of_type(roles, RoleType::Worker)
        .or(roles.first())
        .map(|r| r.role_id.clone())
}

fn worker_count(roles: &[Role]) -> u32 {
    roles.iter().filter(|r| r.role_type == RoleType::Worker).map(|r| r.count).sum()
}

fn task(
    id: &str,
    title: &str,
    description: String,
    kind: TaskKind,
    deps: Vec<TaskId>,
    role_hint: Option<String>,
    status: TaskStatus,
) -> Task {
    let mut t = Task::new(id, title, kind);
    t.description = description;
    t.deps = deps;
    t.role_hint = role_hint;
    t.status = status;
    t
}

/// Build the initial task set for a goal. Output is capped at `max_tasks`.
pub fn decompose(goal: &str, roles: &[Role], strategy: Strategy, max_tasks: usize) -> Decomposition {
    let max_tasks = max_tasks.max(1);
    match strategy {
        Strategy::Manual => manual(goal, roles),
        Strategy::Fast => fast(goal, roles, max_tasks),
        Strategy::Parallel => parallel(goal, roles, max_tasks, Vec::new()),
        Strategy::Hierarchical => hierarchical(goal, roles, max_tasks),
        Strategy::Llm => {
            // No planner is wired in; degrade to parallel and say so.
            let events = vec![Event::DecompositionFallback {
                reason: "llm_planner_not_configured".to_string(),
                mode: "parallel".to_string(),
            }];
            parallel(goal, roles, max_tasks, events)
        }
    }
}

fn manual(goal: &str, roles: &[Role]) -> Decomposition {
    Decomposition {
        tasks: vec![task(
            "t0",
            "Primary objective",
            goal.to_string(),
            TaskKind::Implement,
            vec![],
            worker_role_id(roles),
            TaskStatus::Pending,
        )],
        events: Vec::new(),
    }
}

fn fast(goal: &str, roles: &[Role], max_tasks: usize) -> Decomposition {
    let worker = worker_role_id(roles);
    let mut tasks = vec![task(
        "t0",
        "Implement core changes",
        goal.to_string(),
        TaskKind::Implement,
        vec![],
        worker.clone(),
        TaskStatus::Ready,
    )];
    if worker_count(roles) > 1 {
        tasks.push(task(
            "t1",
            "Add/adjust tests",
            "Add tests that validate behavior and edge cases.".to_string(),
            TaskKind::Test,
            vec![TaskId::new("t0")],
            worker.clone(),
            TaskStatus::Pending,
        ));
    }
    let integrate_deps: Vec<TaskId> = tasks.iter().map(|t| t.task_id.clone()).collect();
    tasks.push(task(
        &format!("t{}", tasks.len()),
        "Integrate and finalize",
        "Integrate implementation and tests into coherent final output.".to_string(),
        TaskKind::Integrate,
        integrate_deps,
        worker,
        TaskStatus::Pending,
    ));
    tasks.truncate(max_tasks);
    Decomposition { tasks, events: Vec::new() }
}

fn parallel(goal: &str, roles: &[Role], max_tasks: usize, mut events: Vec<Event>) -> Decomposition {
    let worker = worker_role_id(roles);
    let judge = role_of_type(roles, RoleType::Judge).map(|r| r.role_id.clone());
    let critic = role_of_type(roles, RoleType::Critic).map(|r| r.role_id.clone());
    let workers = worker_count(roles);

    // One worker degrades to a single impl task, like fast mode.
    if workers <= 1 {
        let mut tasks = vec![task(
            "t0",
            "Implement full objective",
            goal.to_string(),
            TaskKind::Implement,
            vec![],
            worker,
            TaskStatus::Ready,
        )];
        tasks.truncate(max_tasks);
        return Decomposition { tasks, events };
    }

    let mut focus_areas: Vec<(String, TaskKind)> = vec![
        ("Implement core logic and main features".to_string(), TaskKind::Implement),
        ("Implement tests and edge cases".to_string(), TaskKind::Test),
    ];
    if workers >= 3 {
        focus_areas
            .push(("Implement integration, docs, and auxiliary modules".to_string(), TaskKind::Implement));
    }
    for extra in 3..workers {
        focus_areas
            .push((format!("Implement additional scope (area {})", extra + 1), TaskKind::Implement));
    }
    focus_areas.truncate(workers as usize);

    let mut tasks: Vec<Task> = focus_areas
        .iter()
        .enumerate()
        .map(|(i, (focus, kind))| {
            task(
                &format!("t{i}"),
                focus,
                format!(
                    "{goal}\n\nFocus area: {focus}. Do not modify files outside your scope \
                     unless necessary for your task."
                ),
                *kind,
                vec![],
                worker.clone(),
                TaskStatus::Ready,
            )
        })
        .collect();

    let impl_ids: Vec<TaskId> = tasks.iter().map(|t| t.task_id.clone()).collect();
    let parallel_count = tasks.len();
    let integrate_id = format!("t{}", tasks.len());
    tasks.push(task(
        &integrate_id,
        "Integrate and finalize",
        "Integrate all parallel work into coherent final output. Run tests, fix conflicts."
            .to_string(),
        TaskKind::Integrate,
        impl_ids,
        worker,
        TaskStatus::Pending,
    ));

    let mut next_idx = tasks.len();
    if let Some(judge) = judge {
        tasks.push(task(
            &format!("t{next_idx}"),
            "Judge final quality",
            "Evaluate correctness, completeness, and clarity.".to_string(),
            TaskKind::Judge,
            vec![TaskId::new(&integrate_id)],
            Some(judge),
            TaskStatus::Pending,
        ));
        next_idx += 1;
    }
    if let Some(critic) = critic {
        let mut deps = vec![TaskId::new(&integrate_id)];
        if next_idx > parallel_count + 1 {
            deps.push(TaskId::new(format!("t{}", next_idx - 1)));
        }
        tasks.push(task(
            &format!("t{next_idx}"),
            "Critic risk review",
            "Identify contradictions, weak assumptions, and regressions.".to_string(),
            TaskKind::Critic,
            deps,
            Some(critic),
            TaskStatus::Pending,
        ));
    }

    events.push(Event::DecompositionParallel {
        worker_count: workers,
        parallel_tasks: parallel_count,
        total_tasks: tasks.len(),
    });
    tasks.truncate(max_tasks);
    Decomposition { tasks, events }
}

fn hierarchical(goal: &str, roles: &[Role], max_tasks: usize) -> Decomposition {
    let worker = worker_role_id(roles);
    let judge = role_of_type(roles, RoleType::Judge).map(|r| r.role_id.clone());
    let critic = role_of_type(roles, RoleType::Critic).map(|r| r.role_id.clone());
    let research = role_of_type(roles, RoleType::Researcher)
        .or_else(|| role_of_type(roles, RoleType::Orchestrator))
        .map(|r| r.role_id.clone())
        .or_else(|| worker.clone());

    let mut tasks = vec![
        task(
            "t0",
            "Analyze goal and constraints",
            format!("Analyze objective and identify required modules: {goal}"),
            TaskKind::Analysis,
            vec![],
            research.clone(),
            TaskStatus::Pending,
        ),
        task(
            "t1",
            "Design implementation plan",
            "Design concrete implementation and file-level plan.".to_string(),
            TaskKind::Design,
            vec![TaskId::new("t0")],
            research,
            TaskStatus::Pending,
        ),
        task(
            "t2",
            "Implement core changes",
            goal.to_string(),
            TaskKind::Implement,
            vec![TaskId::new("t1")],
            worker.clone(),
            TaskStatus::Pending,
        ),
        task(
            "t3",
            "Add/adjust tests",
            "Add tests that validate behavior and edge cases.".to_string(),
            TaskKind::Test,
            vec![TaskId::new("t1")],
            worker.clone(),
            TaskStatus::Pending,
        ),
        task(
            "t4",
            "Integrate and finalize",
            "Integrate implementation and tests into coherent final output.".to_string(),
            TaskKind::Integrate,
            vec![TaskId::new("t2"), TaskId::new("t3")],
            worker,
            TaskStatus::Pending,
        ),
    ];

    if let Some(judge) = &judge {
        tasks.push(task(
            "t5",
            "Judge final quality",
            "Evaluate correctness, completeness, and clarity.".to_string(),
            TaskKind::Judge,
            vec![TaskId::new("t4")],
            Some(judge.clone()),
            TaskStatus::Pending,
        ));
    }
    if let Some(critic) = critic {
        let mut deps = vec![TaskId::new("t4")];
        if judge.is_some() {
            deps.push(TaskId::new("t5"));
        }
        tasks.push(task(
            "t6",
            "Critic risk review",
            "Identify contradictions, weak assumptions, and regressions.".to_string(),
            TaskKind::Critic,
            deps,
            Some(critic),
            TaskStatus::Pending,
        ));
    }

    tasks.truncate(max_tasks);
    // Only the first stage starts dispatchable.
    if let Some(first) = tasks.first_mut() {
        first.status = TaskStatus::Ready;
    }
    Decomposition { tasks, events: Vec::new() }
}

#[cfg(test)]
#[path = "decompose_tests.rs"]
mod tests;
