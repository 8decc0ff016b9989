// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run manifest: the durable record of what a run set out to do.
//!
//! Written once at bootstrap and rewritten atomically whenever the review
//! pipeline appends tasks. On resume the manifest is the source of truth for
//! the roster and the task set.

use crate::budget::BudgetSpec;
use crate::id::RunId;
use crate::role::{Role, RoleType};
use crate::task::{Task, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_quality_threshold() -> f64 {
    0.5
}

/// How approved work gets merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergePolicy {
    /// Role that owns auto-generated merge tasks.
    pub authority_role: String,
    /// Minimum fraction of review tasks that must succeed.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self { authority_role: "worker".to_string(), quality_threshold: 0.5 }
    }
}

/// Initial task set + role roster + budget + merge policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: RunId,
    pub goal: String,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<Role>,
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub budget: BudgetSpec,
    #[serde(default)]
    pub merge_policy: MergePolicy,
}

impl Manifest {
    pub fn find_task(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.task_id == task_id)
    }

    pub fn role(&self, role_id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.role_id == role_id)
    }

    /// Role type for a role id, defaulting to worker for unknown ids.
    pub fn role_type(&self, role_id: &str) -> RoleType {
        self.role(role_id).map(|r| r.role_type).unwrap_or(RoleType::Worker)
    }

    /// First worker role in roster order, if any.
    pub fn worker_role(&self) -> Option<&Role> {
        self.roles.iter().find(|r| r.role_type == RoleType::Worker)
    }

    /// Judge and critic roles, in roster order.
    pub fn review_roles(&self) -> Vec<&Role> {
        self.roles.iter().filter(|r| r.is_review_role()).collect()
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
