// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identifier and observable agent state.
//!
//! An agent is one worker subprocess instance spawned from a role recipe.
//! AgentId is distinct from the role id: a role with `count: 3` yields agents
//! `{role_id}-1` through `{role_id}-3`, each owning one working directory.

use crate::role::{ExecutionMode, RoleType};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::string_id! {
    /// Unique identifier for an agent instance, formatted `{role_id}-{index}`.
    pub struct AgentId;
}

impl AgentId {
    /// Build the conventional id for the `index`-th instance of a role
    /// (1-based, matching the spawn order).
    pub fn for_role(role_id: &str, index: u32) -> Self {
        Self(format!("{role_id}-{index}"))
    }
}

/// Coarse liveness of an agent process as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Running,
    Exited,
}

crate::simple_display! {
    AgentStatus {
        Running => "running",
        Exited => "exited",
    }
}

/// Snapshot row describing one live (or exited) agent.
///
/// Materialized into `state.json` so external observers can render the fleet
/// without touching per-agent files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: AgentId,
    pub role_id: String,
    pub role_type: RoleType,
    pub backend: String,
    pub execution_mode: ExecutionMode,
    pub status: AgentStatus,
    /// Task currently assigned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<crate::task::TaskId>,
    /// Monotonic milliseconds of the last observed heartbeat.
    pub last_heartbeat_ms: u64,
    pub cwd: PathBuf,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub restart_count: u32,
    /// Rolling tail of stderr, capped for snapshot hygiene.
    #[serde(default)]
    pub stderr_tail: String,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost_usd: f64,
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
