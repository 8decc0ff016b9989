// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk directory tree for a run.
//!
//! ```text
//! {root}/
//!   manifest.json            roles + initial task set + budget + merge policy
//!   state.json               latest snapshot (atomically replaced)
//!   events.jsonl             append-only journal
//!   index.snapshot.json      optional repo code-symbol index
//!   agents/{id}.inbox.json   per-agent inbox
//!   agents/{id}.outbox.json  per-agent outbox
//!   tasks/task-{id}.json     per-task record
//!   worktrees/{id}/          per-agent isolated tree (when configured)
//!   logs/agent-{id}.log      per-agent stdout+stderr capture
//!   locks/*.lock             advisory locks
//! ```

use fm_core::{AgentId, TaskId};
use std::io;
use std::path::{Path, PathBuf};

/// Path schema for a run directory.
#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory tree. Idempotent: an existing layout is reused,
    /// which is how resume finds its files again.
    pub fn ensure(&self) -> io::Result<()> {
        for dir in [
            self.root.clone(),
            self.agents_dir(),
            self.tasks_dir(),
            self.worktrees_dir(),
            self.logs_dir(),
            self.locks_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join("state.json")
    }

    pub fn events_path(&self) -> PathBuf {
        self.root.join("events.jsonl")
    }

    pub fn index_snapshot_path(&self) -> PathBuf {
        self.root.join("index.snapshot.json")
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.root.join("agents")
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.root.join("tasks")
    }

    pub fn worktrees_dir(&self) -> PathBuf {
        self.root.join("worktrees")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn inbox_path(&self, agent_id: &AgentId) -> PathBuf {
        self.agents_dir().join(format!("{agent_id}.inbox.json"))
    }

    pub fn outbox_path(&self, agent_id: &AgentId) -> PathBuf {
        self.agents_dir().join(format!("{agent_id}.outbox.json"))
    }

    pub fn inbox_lock_path(&self, agent_id: &AgentId) -> PathBuf {
        self.locks_dir().join(format!("{agent_id}.inbox.lock"))
    }

    pub fn outbox_lock_path(&self, agent_id: &AgentId) -> PathBuf {
        self.locks_dir().join(format!("{agent_id}.outbox.lock"))
    }

    pub fn task_path(&self, task_id: &TaskId) -> PathBuf {
        self.tasks_dir().join(format!("task-{task_id}.json"))
    }

    pub fn worktree_path(&self, agent_id: &AgentId) -> PathBuf {
        self.worktrees_dir().join(agent_id.as_str())
    }

    pub fn agent_log_path(&self, agent_id: &AgentId) -> PathBuf {
        self.logs_dir().join(format!("agent-{agent_id}.log"))
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
