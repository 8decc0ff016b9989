// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures for the end-to-end specs.

use fm_adapters::heartbeat_wrapper;
use fm_core::{Config, Role, RoleType, Strategy};
use std::path::Path;

/// A role whose "backend" is a trivial shell command wrapped in the real
/// heartbeat protocol. `backend_cmd` runs once per task prompt; its exit
/// code decides `[TASK_DONE]` vs `[TASK_FAILED]`.
pub fn shell_role(role_id: &str, role_type: RoleType, count: u32, backend_cmd: &str) -> Role {
    Role {
        role_id: role_id.to_string(),
        role_type,
        backend: "custom".to_string(),
        model: String::new(),
        count,
        write_access: true,
        workspace_mode: fm_core::WorkspaceMode::SharedRw,
        task_kinds: Vec::new(),
        execution_mode: fm_core::ExecutionMode::Persistent,
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            heartbeat_wrapper(backend_cmd, false),
        ]),
    }
}

pub fn base_config(base_dir: &Path, strategy: Strategy, roles: Vec<Role>) -> Config {
    let working_dir = base_dir.join("repo");
    std::fs::create_dir_all(&working_dir).unwrap();

    let mut config = Config::default();
    config.run.run_dir = base_dir.join("run");
    config.run.working_dir = working_dir;
    config.run.poll_interval_ms = 50;
    config.run.max_runtime_seconds = 60;
    config.run.state_writes_per_second = 20.0;
    config.orchestration.decomposition = strategy;
    config.watchdog.heartbeat_timeout_seconds = 30.0;
    config.watchdog.task_silence_timeout_seconds = 20.0;
    config.watchdog.task_max_duration_seconds = 40.0;
    config.merge.authority_role = roles
        .iter()
        .find(|r| r.role_type == RoleType::Worker)
        .map(|r| r.role_id.clone())
        .unwrap_or_else(|| "worker".to_string());
    config.roles = roles;
    config.validate().unwrap();
    config
}
