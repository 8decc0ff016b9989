// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn ensure_creates_tree_idempotently() {
    let dir = tempdir().unwrap();
    let layout = RunLayout::new(dir.path().join("run"));

    layout.ensure().unwrap();
    layout.ensure().unwrap();

    assert!(layout.agents_dir().is_dir());
    assert!(layout.tasks_dir().is_dir());
    assert!(layout.worktrees_dir().is_dir());
    assert!(layout.logs_dir().is_dir());
    assert!(layout.locks_dir().is_dir());
}

#[test]
fn per_agent_paths() {
    let layout = RunLayout::new("/run");
    let agent = AgentId::new("coder-2");
    assert_eq!(layout.inbox_path(&agent), PathBuf::from("/run/agents/coder-2.inbox.json"));
    assert_eq!(layout.outbox_path(&agent), PathBuf::from("/run/agents/coder-2.outbox.json"));
    assert_eq!(layout.inbox_lock_path(&agent), PathBuf::from("/run/locks/coder-2.inbox.lock"));
    assert_eq!(layout.outbox_lock_path(&agent), PathBuf::from("/run/locks/coder-2.outbox.lock"));
    assert_eq!(layout.agent_log_path(&agent), PathBuf::from("/run/logs/agent-coder-2.log"));
    assert_eq!(layout.worktree_path(&agent), PathBuf::from("/run/worktrees/coder-2"));
}

#[test]
fn per_task_and_top_level_paths() {
    let layout = RunLayout::new("/run");
    assert_eq!(layout.task_path(&TaskId::new("t0")), PathBuf::from("/run/tasks/task-t0.json"));
    assert_eq!(layout.manifest_path(), PathBuf::from("/run/manifest.json"));
    assert_eq!(layout.state_path(), PathBuf::from("/run/state.json"));
    assert_eq!(layout.events_path(), PathBuf::from("/run/events.jsonl"));
    assert_eq!(layout.index_snapshot_path(), PathBuf::from("/run/index.snapshot.json"));
}
