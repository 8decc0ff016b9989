// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent workspace provisioning.
//!
//! Shared modes hand every agent the repository checkout; worktree mode gives
//! each agent a dedicated `git worktree` (branch `fm/{agent_id}`) so parallel
//! edits cannot cross-contaminate; isolated mode is a plain directory. A
//! worktree that cannot be created (not a git repo, git missing) degrades to
//! an isolated directory; callers report the effective mode.

use crate::subprocess::{run_with_timeout, GIT_WORKTREE_TIMEOUT};
use crate::AgentAdapterError;
use fm_core::{AgentId, WorkspaceMode};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Resolve (creating if needed) the working directory for an agent.
pub async fn ensure_workspace_for_agent(
    repo_root: &Path,
    worktrees_root: &Path,
    agent_id: &AgentId,
    mode: WorkspaceMode,
) -> Result<PathBuf, AgentAdapterError> {
    match mode {
        WorkspaceMode::SharedRw | WorkspaceMode::SharedRo => Ok(repo_root.to_path_buf()),
        WorkspaceMode::Isolated => {
            let path = worktrees_root.join(agent_id.as_str());
            tokio::fs::create_dir_all(&path).await?;
            Ok(path)
        }
        WorkspaceMode::Worktree => {
            let path = worktrees_root.join(agent_id.as_str());
            if path.exists() {
                return Ok(path);
            }
            match create_worktree(repo_root, &path, agent_id).await {
                Ok(()) => Ok(path),
                Err(reason) => {
                    tracing::warn!(
                        agent_id = %agent_id,
                        reason,
                        "worktree creation failed, falling back to isolated directory"
                    );
                    tokio::fs::create_dir_all(&path).await?;
                    Ok(path)
                }
            }
        }
    }
}

async fn create_worktree(
    repo_root: &Path,
    path: &Path,
    agent_id: &AgentId,
) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("failed to create worktrees dir: {e}"))?;
    }

    let mut cmd = Command::new("git");
    cmd.args([
        "-C",
        &repo_root.display().to_string(),
        "worktree",
        "add",
        "-b",
        &format!("fm/{agent_id}"),
        &path.display().to_string(),
        "HEAD",
    ])
    .env_remove("GIT_DIR")
    .env_remove("GIT_WORK_TREE");

    let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree add")
        .await
        .map_err(|e| e.to_string())?;
    if !output.status.success() {
        return Err(format!(
            "git worktree add failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(())
}

/// Remove every agent worktree under `worktrees_root`. Best-effort: git
/// unregistration failures still fall through to directory removal, and a
/// final prune clears stale registrations.
pub async fn cleanup_worktrees(repo_root: &Path, worktrees_root: &Path) {
    let Ok(mut entries) = tokio::fs::read_dir(worktrees_root).await else {
        return;
    };
    let mut removed_any = false;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let dot_git = path.join(".git");
        let is_worktree = tokio::fs::symlink_metadata(&dot_git)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if is_worktree {
            let mut cmd = Command::new("git");
            cmd.args([
                "-C",
                &repo_root.display().to_string(),
                "worktree",
                "remove",
                "--force",
                &path.display().to_string(),
            ])
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE");
            let _ = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree remove").await;
            removed_any = true;
        }
        if path.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove workspace dir");
            }
        }
    }
    if removed_any {
        let mut cmd = Command::new("git");
        cmd.args(["-C", &repo_root.display().to_string(), "worktree", "prune"]);
        let _ = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree prune").await;
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
