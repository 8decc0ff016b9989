// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-engine: Execution engine of the Foreman coordinator.
//!
//! A single logically-serial control loop owns the task DAG, the scheduler,
//! the watchdog, and the review-and-merge queue, and talks to worker agents
//! only through the adapter seam and the file IPC bus. Per tick: harvest
//! worker outputs, enforce timeouts, advance the review queue, dispatch ready
//! tasks, evaluate the watchdog, write the state snapshot, sleep.

pub mod coordinator;
pub mod dag;
pub mod decompose;
pub mod error;
pub mod merge_queue;
pub mod prompt;
pub mod scheduler;
pub mod watchdog;

pub use coordinator::Coordinator;
pub use dag::{TaskGraph, TransitionError};
pub use decompose::{decompose, Decomposition};
pub use error::EngineError;
pub use merge_queue::{MergeItemStatus, MergeQueue, MergeQueueItem};
pub use prompt::build_task_prompt;
pub use scheduler::{assign_tasks, AgentSlot, Assignment};
pub use watchdog::{evaluate, WatchdogReport};
