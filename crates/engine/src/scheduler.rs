// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ready-task to free-slot matching.
//!
//! Stable matching: tasks arrive in priority/creation order, agents are
//! considered in agent-id order. A task prefers a free agent of its hinted
//! role; failing that, any free worker-type agent whose kind filter accepts
//! the task kind. One task per agent per round.

use fm_core::{AgentId, Role, RoleType, Task, TaskId};

/// One agent's availability for this scheduling round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSlot {
    pub agent_id: AgentId,
    pub role_id: String,
    pub busy: bool,
}

/// A matched (task, agent) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub task_id: TaskId,
    pub agent_id: AgentId,
}

/// Match ready tasks to free agents.
///
/// `ready` must already be in dispatch order (priority, then creation).
/// Ties between eligible agents break by stable agent-id ordering.
pub fn assign_tasks(ready: &[&Task], slots: &[AgentSlot], roles: &[Role]) -> Vec<Assignment> {
    let mut free: Vec<&AgentSlot> = slots.iter().filter(|s| !s.busy).collect();
    free.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));

    let role_of = |role_id: &str| roles.iter().find(|r| r.role_id == role_id);

    let mut assignments = Vec::new();
    for task in ready {
        let hinted = task.role_hint.as_deref();
        let position = free
            .iter()
            .position(|slot| Some(slot.role_id.as_str()) == hinted)
            .or_else(|| {
                // Fallback: any worker-type role accepting this kind.
                free.iter().position(|slot| {
                    role_of(&slot.role_id).is_some_and(|role| {
                        role.role_type == RoleType::Worker && role.accepts_kind(task.kind)
                    })
                })
            });
        if let Some(i) = position {
            let slot = free.remove(i);
            assignments.push(Assignment {
                task_id: task.task_id.clone(),
                agent_id: slot.agent_id.clone(),
            });
        }
    }
    assignments
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
