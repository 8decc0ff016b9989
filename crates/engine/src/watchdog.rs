// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stale-agent detection.
//!
//! A live process whose heartbeat lags past the threshold is stale and gets
//! terminated and respawned by the coordinator. Dead processes are not
//! restarted here; the harvest pass classifies their running task as a
//! silent failure and the usual retry machinery takes over.

use fm_core::AgentId;
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of one watchdog evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchdogReport {
    /// Agents whose heartbeat lags past the threshold.
    pub stale_agents: Vec<AgentId>,
    /// Stale agents that are still alive and should be restarted.
    pub restart_agents: Vec<AgentId>,
}

/// Evaluate heartbeat lag across the fleet.
pub fn evaluate(
    heartbeat_ms: &HashMap<AgentId, u64>,
    running: &HashMap<AgentId, bool>,
    now_ms: u64,
    timeout: Duration,
) -> WatchdogReport {
    let threshold = timeout.as_millis() as u64;
    let mut report = WatchdogReport::default();

    let mut agent_ids: Vec<&AgentId> = heartbeat_ms.keys().collect();
    agent_ids.sort();
    for agent_id in agent_ids {
        let last = heartbeat_ms.get(agent_id).copied().unwrap_or(0);
        if now_ms.saturating_sub(last) <= threshold {
            continue;
        }
        report.stale_agents.push(agent_id.clone());
        if running.get(agent_id).copied().unwrap_or(false) {
            report.restart_agents.push(agent_id.clone());
        }
    }
    report
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
