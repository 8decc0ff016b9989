// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::RoleBuilder;
use yare::parameterized;

#[parameterized(
    heartbeat = { "[HEARTBEAT]", WireLine::Heartbeat },
    heartbeat_trailing_ws = { "[HEARTBEAT]  ", WireLine::Heartbeat },
    done = { "[TASK_DONE]", WireLine::TaskDone },
    failed = { "[TASK_FAILED]", WireLine::TaskFailed },
)]
fn classifies_markers(line: &str, expected: WireLine<'static>) {
    assert_eq!(classify_line(line), expected);
}

#[parameterized(
    plain_text = { "compiling crate foo" },
    marker_with_prefix = { "note: [TASK_DONE]" },
    debug_marker = { "[DEBUG:CMD_START] 1700000000" },
    json_line = { r#"{"type":"message","usage":{"input_tokens":10}}"# },
)]
fn other_lines_are_progress(line: &str) {
    assert!(matches!(classify_line(line), WireLine::Progress(_)));
}

#[test]
fn wrapper_emits_initial_heartbeat_and_reads_lines() {
    let script = heartbeat_wrapper("mytool \"$line\"", false);
    assert!(script.starts_with("echo \"[HEARTBEAT]\"; "));
    assert!(script.contains("while IFS= read -r line; do"));
    assert!(script.contains("mytool \"$line\" < /dev/null"));
    assert!(script.contains("if [ $_rc -eq 0 ]; then echo \"[TASK_DONE]\"; else echo \"[TASK_FAILED]\"; fi"));
    assert!(script.contains("sleep 5; echo \"[HEARTBEAT]\""));
    assert!(script.contains("kill $_hb"));
    assert!(!script.contains("[DEBUG:"));
}

#[test]
fn debug_wrapper_adds_trace_markers_and_merges_stderr() {
    let script = heartbeat_wrapper("mytool \"$line\"", true);
    assert!(script.contains("[DEBUG:STDIN_READ]"));
    assert!(script.contains("[DEBUG:CMD_START]"));
    assert!(script.contains("[DEBUG:CMD_EXIT]"));
    assert!(script.contains("mytool \"$line\" 2>&1 < /dev/null"));
}

#[test]
fn claude_backend_command() {
    let role = RoleBuilder::default().backend("claude").build();
    let cmd = role_command(&role, false).unwrap();
    assert_eq!(cmd[0], "sh");
    assert_eq!(cmd[1], "-c");
    assert!(cmd[2].contains("claude -p --dangerously-skip-permissions \"$line\""));
}

#[test]
fn model_flag_only_when_configured() {
    let with_model = RoleBuilder::default().backend("claude").model("opus-4").build();
    let cmd = role_command(&with_model, false).unwrap();
    assert!(cmd[2].contains("--model opus-4"));

    let without = RoleBuilder::default().backend("claude").build();
    let cmd = role_command(&without, false).unwrap();
    assert!(!cmd[2].contains("--model"));
}

#[test]
fn codex_backend_command() {
    let role = RoleBuilder::default().backend("codex").build();
    let cmd = role_command(&role, false).unwrap();
    assert!(cmd[2].contains("codex exec --json --skip-git-repo-check --sandbox workspace-write"));
}

#[test]
fn unsupported_backend_is_rejected() {
    let role = RoleBuilder::default().backend("hal9000").build();
    let err = role_command(&role, false).unwrap_err();
    assert!(matches!(err, AgentAdapterError::UnsupportedBackend(_)));
}

#[test]
fn command_override_is_verbatim() {
    let role = RoleBuilder::default()
        .backend("claude")
        .command(vec!["sh".to_string(), "-c".to_string(), "my-wrapper".to_string()])
        .build();
    let cmd = role_command(&role, false).unwrap();
    assert_eq!(cmd, vec!["sh", "-c", "my-wrapper"]);
}

#[test]
fn models_with_shell_metachars_are_quoted() {
    let role = RoleBuilder::default().backend("aider").model("weird model;rm").build();
    let cmd = role_command(&role, false).unwrap();
    assert!(cmd[2].contains("--model 'weird model;rm'"));
}
