// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-adapters: Agent process management for the Foreman coordinator.
//!
//! The [`AgentAdapter`] trait is the coordinator's only view of a worker: a
//! uniform spawn / send / read / terminate surface over whichever agent CLI a
//! role configures. [`ProcessAdapter`] implements it with local subprocesses
//! wrapped in the heartbeat shell, so liveness and task outcomes are
//! observable as plain stdout markers.

pub mod process;
pub mod protocol;
pub mod subprocess;
pub mod usage;
pub mod workspace;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeAgentAdapter, ScriptedOutcome};

pub use process::{
    AgentAdapter, AgentProcessSpec, AgentProcessStatus, AgentStreamEvent, ProcessAdapter,
};
pub use protocol::{
    classify_line, heartbeat_wrapper, role_command, WireLine, HEARTBEAT_MARKER, TASK_DONE_MARKER,
    TASK_FAILED_MARKER,
};
pub use subprocess::{
    run_with_timeout, SubprocessError, GIT_COMMAND_TIMEOUT, GIT_WORKTREE_TIMEOUT,
};
pub use usage::{parse_usage, UsageSample};
pub use workspace::{cleanup_worktrees, ensure_workspace_for_agent};

use thiserror::Error;

/// Errors from agent adapter operations
#[derive(Debug, Error)]
pub enum AgentAdapterError {
    #[error("agent not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("subprocess error: {0}")]
    Subprocess(#[from] SubprocessError),
}
