// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded subprocess execution helpers.

use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Timeout for short git queries (diff, ls-files).
pub const GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for git worktree add/remove.
pub const GIT_WORKTREE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{label} timed out after {timeout:?}")]
    Timeout { label: String, timeout: Duration },
    #[error("{label} failed to run: {source}")]
    Io {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run a command to completion with a hard timeout. The child is killed when
/// the timeout fires.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, SubprocessError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(SubprocessError::Io { label: label.to_string(), source }),
        Err(_) => Err(SubprocessError::Timeout { label: label.to_string(), timeout }),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
