// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error type.

use thiserror::Error;

/// Errors that can stop the coordinator.
///
/// Everything recoverable (worker failures, invalid transitions, watchdog
/// restarts) is handled in place and journaled; an `EngineError` escaping the
/// control loop means the run itself cannot continue.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bus error: {0}")]
    Bus(#[from] fm_bus::BusError),
    #[error("agent adapter error: {0}")]
    Adapter(#[from] fm_adapters::AgentAdapterError),
    #[error("config error: {0}")]
    Config(#[from] fm_core::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
