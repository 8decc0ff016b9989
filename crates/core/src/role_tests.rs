// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_kind_filter_accepts_everything() {
    let role = Role::builder().build();
    assert!(role.accepts_kind(TaskKind::Implement));
    assert!(role.accepts_kind(TaskKind::Merge));
}

#[test]
fn kind_filter_restricts() {
    let role = Role::builder()
        .task_kinds(vec![TaskKind::Implement, TaskKind::Test])
        .build();
    assert!(role.accepts_kind(TaskKind::Test));
    assert!(!role.accepts_kind(TaskKind::Judge));
}

#[test]
fn review_roles() {
    let judge = Role::builder().role_id("judge").role_type(RoleType::Judge).build();
    let critic = Role::builder().role_id("critic").role_type(RoleType::Critic).build();
    let worker = Role::builder().build();
    assert!(judge.is_review_role());
    assert!(critic.is_review_role());
    assert!(!worker.is_review_role());
}

#[test]
fn role_serde_defaults() {
    let role: Role = serde_json::from_str(
        r#"{"role_id": "worker", "role_type": "worker", "backend": "claude"}"#,
    )
    .unwrap();
    assert_eq!(role.count, 1);
    assert_eq!(role.workspace_mode, WorkspaceMode::SharedRo);
    assert_eq!(role.execution_mode, ExecutionMode::Persistent);
    assert!(!role.write_access);
    assert!(role.command.is_none());
}

#[test]
fn workspace_mode_wire_names() {
    assert_eq!(serde_json::to_string(&WorkspaceMode::SharedRw).unwrap(), "\"shared_rw\"");
    assert_eq!(serde_json::to_string(&WorkspaceMode::Worktree).unwrap(), "\"worktree\"");
    assert_eq!(WorkspaceMode::SharedRo.to_string(), "shared_ro");
}
