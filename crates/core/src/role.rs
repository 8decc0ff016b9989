// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Role recipes: how many agents of a given kind to spawn and what they may do.

use crate::task::TaskKind;
use serde::{Deserialize, Serialize};

/// Broad category of a role, used for review-role discovery and scheduling
/// fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    Worker,
    Judge,
    Critic,
    Researcher,
    Orchestrator,
}

crate::simple_display! {
    RoleType {
        Worker => "worker",
        Judge => "judge",
        Critic => "critic",
        Researcher => "researcher",
        Orchestrator => "orchestrator",
    }
}

/// How an agent's working directory is provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceMode {
    /// All agents share the repository checkout with write access
    SharedRw,
    /// All agents share the repository checkout read-only
    SharedRo,
    /// Dedicated git worktree per agent
    Worktree,
    /// Dedicated plain directory per agent
    Isolated,
}

crate::simple_display! {
    WorkspaceMode {
        SharedRw => "shared_rw",
        SharedRo => "shared_ro",
        Worktree => "worktree",
        Isolated => "isolated",
    }
}

/// Whether one wrapper process serves many task lines or a fresh process is
/// expected per task. The process adapter implements the persistent contract;
/// the field is carried in the manifest for forward compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Oneshot,
    #[default]
    Persistent,
}

crate::simple_display! {
    ExecutionMode {
        Oneshot => "oneshot",
        Persistent => "persistent",
    }
}

fn default_count() -> u32 {
    1
}

fn default_workspace_mode() -> WorkspaceMode {
    WorkspaceMode::SharedRo
}

/// A recipe for spawning agents of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub role_id: String,
    pub role_type: RoleType,
    /// Which agent CLI to launch ("claude", "codex", "aider").
    pub backend: String,
    /// Model passed to the backend; empty means the tool's own default.
    #[serde(default)]
    pub model: String,
    /// Number of agent instances to spawn.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Gate for destructive operations (writable workspaces).
    #[serde(default)]
    pub write_access: bool,
    #[serde(default = "default_workspace_mode")]
    pub workspace_mode: WorkspaceMode,
    /// Task kinds this role accepts; empty accepts any kind.
    #[serde(default)]
    pub task_kinds: Vec<TaskKind>,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    /// Full command override replacing the built-in backend command.
    /// The override must implement the heartbeat wrapper protocol itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

impl Role {
    /// Whether this role's kind filter accepts the given task kind.
    pub fn accepts_kind(&self, kind: TaskKind) -> bool {
        self.task_kinds.is_empty() || self.task_kinds.contains(&kind)
    }

    /// Review roles contribute judge/critic tasks to the merge pipeline.
    pub fn is_review_role(&self) -> bool {
        matches!(self.role_type, RoleType::Judge | RoleType::Critic)
    }
}

crate::builder! {
    pub struct RoleBuilder => Role {
        into {
            role_id: String = "worker",
            backend: String = "claude",
            model: String = "",
        }
        set {
            role_type: RoleType = RoleType::Worker,
            count: u32 = 1,
            write_access: bool = true,
            workspace_mode: WorkspaceMode = WorkspaceMode::SharedRw,
            task_kinds: Vec<TaskKind> = Vec::new(),
            execution_mode: ExecutionMode = ExecutionMode::Persistent,
        }
        option {
            command: Vec<String> = None,
        }
    }
}

#[cfg(test)]
#[path = "role_tests.rs"]
mod tests;
