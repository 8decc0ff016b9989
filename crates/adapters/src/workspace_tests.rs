// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[tokio::test]
async fn shared_modes_return_repo_root() {
    let repo = tempdir().unwrap();
    let trees = tempdir().unwrap();
    let agent = AgentId::new("w-1");

    for mode in [WorkspaceMode::SharedRw, WorkspaceMode::SharedRo] {
        let path = ensure_workspace_for_agent(repo.path(), trees.path(), &agent, mode)
            .await
            .unwrap();
        assert_eq!(path, repo.path());
    }
    assert!(!trees.path().join("w-1").exists());
}

#[tokio::test]
async fn isolated_mode_creates_dedicated_dir() {
    let repo = tempdir().unwrap();
    let trees = tempdir().unwrap();
    let agent = AgentId::new("w-2");

    let path =
        ensure_workspace_for_agent(repo.path(), trees.path(), &agent, WorkspaceMode::Isolated)
            .await
            .unwrap();
    assert_eq!(path, trees.path().join("w-2"));
    assert!(path.is_dir());
}

#[tokio::test]
async fn worktree_mode_outside_git_falls_back_to_plain_dir() {
    let repo = tempdir().unwrap(); // not a git repository
    let trees = tempdir().unwrap();
    let agent = AgentId::new("w-3");

    let path =
        ensure_workspace_for_agent(repo.path(), trees.path(), &agent, WorkspaceMode::Worktree)
            .await
            .unwrap();
    assert_eq!(path, trees.path().join("w-3"));
    assert!(path.is_dir());
}

#[tokio::test]
async fn existing_workspace_is_reused() {
    let repo = tempdir().unwrap();
    let trees = tempdir().unwrap();
    let agent = AgentId::new("w-4");
    let existing = trees.path().join("w-4");
    std::fs::create_dir_all(existing.join("work")).unwrap();

    let path =
        ensure_workspace_for_agent(repo.path(), trees.path(), &agent, WorkspaceMode::Worktree)
            .await
            .unwrap();
    assert_eq!(path, existing);
    assert!(path.join("work").is_dir());
}

#[tokio::test]
async fn cleanup_removes_plain_dirs() {
    let repo = tempdir().unwrap();
    let trees = tempdir().unwrap();
    std::fs::create_dir_all(trees.path().join("w-5")).unwrap();
    std::fs::create_dir_all(trees.path().join("w-6")).unwrap();

    cleanup_worktrees(repo.path(), trees.path()).await;

    assert!(!trees.path().join("w-5").exists());
    assert!(!trees.path().join("w-6").exists());
}

#[tokio::test]
async fn cleanup_tolerates_missing_root() {
    let repo = tempdir().unwrap();
    cleanup_worktrees(repo.path(), &repo.path().join("absent")).await;
}
