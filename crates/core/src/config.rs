// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run configuration, loaded once at startup and immutable for the run.
//!
//! Parsing is liberal (every field has a default) but validation is strict:
//! a roster that cannot work (empty, self-contradictory, or referencing
//! unknown roles) fails fast at startup instead of limping into a broken run.

use crate::budget::BudgetSpec;
use crate::role::Role;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Decomposition strategy for the initial task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Manual,
    Fast,
    #[default]
    Parallel,
    Hierarchical,
    /// Planner-backed decomposition; falls back to parallel when no planner
    /// is configured.
    Llm,
}

crate::simple_display! {
    Strategy {
        Manual => "manual",
        Fast => "fast",
        Parallel => "parallel",
        Hierarchical => "hierarchical",
        Llm => "llm",
    }
}

fn default_run_dir() -> PathBuf {
    PathBuf::from(".fm/run")
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_poll_interval_ms() -> u64 {
    150
}

fn default_max_runtime_seconds() -> u64 {
    3600
}

/// Run-level settings: directories, pacing, lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory holding the run layout (manifest, state, journal, mailboxes).
    pub run_dir: PathBuf,
    /// Repository the agents work on.
    pub working_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub max_runtime_seconds: u64,
    /// Rate limit for `state.json` rewrites.
    pub state_writes_per_second: f64,
    /// Emit `debug.*` journal events.
    pub debug: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            run_dir: default_run_dir(),
            working_dir: default_working_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            max_runtime_seconds: default_max_runtime_seconds(),
            state_writes_per_second: 4.0,
            debug: false,
        }
    }
}

impl RunConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(50))
    }

    pub fn max_runtime(&self) -> Duration {
        Duration::from_secs(self.max_runtime_seconds.max(10))
    }
}

fn default_max_tasks() -> usize {
    12
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    pub decomposition: Strategy,
    /// Cap on decomposer output; review/merge tasks are exempt.
    pub max_tasks: usize,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self { decomposition: Strategy::default(), max_tasks: default_max_tasks() }
    }
}

/// Liveness thresholds, all in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Agent heartbeat lag before terminate-and-respawn.
    pub heartbeat_timeout_seconds: f64,
    /// No outbox event for a running task before it fails.
    pub task_silence_timeout_seconds: f64,
    /// Hard ceiling on a single task attempt.
    pub task_max_duration_seconds: f64,
    /// Grace between SIGTERM and hard kill.
    pub termination_grace_seconds: f64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_seconds: 30.0,
            task_silence_timeout_seconds: 120.0,
            task_max_duration_seconds: 900.0,
            termination_grace_seconds: 5.0,
        }
    }
}

impl WatchdogConfig {
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.heartbeat_timeout_seconds.max(1.0))
    }

    pub fn task_silence_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.task_silence_timeout_seconds.max(1.0))
    }

    pub fn task_max_duration(&self) -> Duration {
        Duration::from_secs_f64(self.task_max_duration_seconds.max(1.0))
    }

    pub fn termination_grace(&self) -> Duration {
        Duration::from_secs_f64(self.termination_grace_seconds.max(0.1))
    }
}

fn default_max_task_attempts() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Dispatches allowed per task before terminal failure.
    pub max_task_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_task_attempts: default_max_task_attempts() }
    }
}

fn default_authority_role() -> String {
    "worker".to_string()
}

fn default_quality_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Role that owns auto-generated merge tasks.
    pub authority_role: String,
    /// Minimum fraction of reviews that must pass.
    pub quality_threshold: f64,
    /// Explicit review role ids, used when the roster has no judge/critic roles.
    pub review_roles: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            authority_role: default_authority_role(),
            quality_threshold: default_quality_threshold(),
            review_roles: Vec::new(),
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub retries: RetryConfig,
    #[serde(default)]
    pub budget: BudgetSpec,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Config {
    /// Parse and validate a YAML configuration document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    /// Reject configurations that cannot produce a working run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.roles.is_empty() {
            return invalid("roles roster is empty".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for role in &self.roles {
            if role.role_id.is_empty() {
                return invalid("role with empty role_id".to_string());
            }
            if !seen.insert(role.role_id.as_str()) {
                return invalid(format!("duplicate role_id: {}", role.role_id));
            }
            if role.count == 0 {
                return invalid(format!("role {} has count 0", role.role_id));
            }
            if role.backend.is_empty() && role.command.is_none() {
                return invalid(format!(
                    "role {} has neither a backend nor a command override",
                    role.role_id
                ));
            }
            if let Some(cmd) = &role.command {
                if cmd.is_empty() {
                    return invalid(format!("role {} has an empty command override", role.role_id));
                }
            }
        }
        if self.roles.iter().all(|r| r.role_id != self.merge.authority_role) {
            return invalid(format!(
                "merge authority_role {} is not in the roster",
                self.merge.authority_role
            ));
        }
        for review_role in &self.merge.review_roles {
            if self.roles.iter().all(|r| &r.role_id != review_role) {
                return invalid(format!("merge review role {review_role} is not in the roster"));
            }
        }
        if !(0.0..=1.0).contains(&self.merge.quality_threshold) {
            return invalid(format!(
                "quality_threshold {} outside [0, 1]",
                self.merge.quality_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.budget.reserve_ratio) {
            return invalid(format!(
                "budget reserve_ratio {} outside [0, 1]",
                self.budget.reserve_ratio
            ));
        }
        if self.budget.chars_per_token_fallback <= 0.0 {
            return invalid("budget chars_per_token_fallback must be positive".to_string());
        }
        if self.retries.max_task_attempts == 0 {
            return invalid("retries.max_task_attempts must be at least 1".to_string());
        }
        if self.run.poll_interval_ms == 0 {
            return invalid("run.poll_interval_ms must be positive".to_string());
        }
        if self.run.state_writes_per_second <= 0.0 {
            return invalid("run.state_writes_per_second must be positive".to_string());
        }
        if self.orchestration.max_tasks == 0 {
            return invalid("orchestration.max_tasks must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
