// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-core: Core library for the Foreman (fm) swarm coordinator

pub mod macros;

pub mod agent;
pub mod budget;
pub mod clock;
pub mod config;
pub mod event;
pub mod id;
pub mod mailbox;
pub mod manifest;
pub mod role;
pub mod task;

pub use agent::{AgentId, AgentRecord, AgentStatus};
pub use budget::{BudgetCounter, BudgetSnapshot, BudgetSpec};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    Config, ConfigError, MergeConfig, OrchestrationConfig, RetryConfig, RunConfig, Strategy,
    WatchdogConfig,
};
pub use event::{Classification, DecisionEntry, ErrorEntry, Event, JournalEvent, TimelineEntry};
pub use id::RunId;
pub use mailbox::{AgentInbox, AgentOutbox, InboxMessage, MessageKind, OutboxEvent, OutboxEventKind};
pub use manifest::{Manifest, MergePolicy};
#[cfg(any(test, feature = "test-support"))]
pub use role::RoleBuilder;
pub use role::{ExecutionMode, Role, RoleType, WorkspaceMode};
#[cfg(any(test, feature = "test-support"))]
pub use task::TaskBuilder;
pub use task::{Task, TaskId, TaskKind, TaskStatus, TransitionRecord};
