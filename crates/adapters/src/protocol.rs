// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat wrapper protocol.
//!
//! Every backend CLI is launched through a small `sh` wrapper that makes the
//! agent observable over plain stdout:
//!
//! 1. Emits `[HEARTBEAT]` immediately on start.
//! 2. Reads one task-prompt line at a time from stdin.
//! 3. Per line: forks a background loop printing `[HEARTBEAT]` every 5 s,
//!    runs the backend with stdin redirected from /dev/null (so it cannot
//!    swallow the next prompt or block on an interactive read), then emits
//!    `[TASK_DONE]` on exit 0 or `[TASK_FAILED]` otherwise.
//! 4. Kills the heartbeat loop between tasks.
//!
//! Task prompts must never contain these markers; only the wrapper emits them.

use crate::AgentAdapterError;
use fm_core::Role;

pub const HEARTBEAT_MARKER: &str = "[HEARTBEAT]";
pub const TASK_DONE_MARKER: &str = "[TASK_DONE]";
pub const TASK_FAILED_MARKER: &str = "[TASK_FAILED]";

/// One classified line of wrapped agent stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireLine<'a> {
    Heartbeat,
    TaskDone,
    TaskFailed,
    Progress(&'a str),
}

/// Classify a raw stdout line from a wrapped agent.
pub fn classify_line(line: &str) -> WireLine<'_> {
    match line.trim_end() {
        HEARTBEAT_MARKER => WireLine::Heartbeat,
        TASK_DONE_MARKER => WireLine::TaskDone,
        TASK_FAILED_MARKER => WireLine::TaskFailed,
        _ => WireLine::Progress(line),
    }
}

/// Build the wrapper script around an already-quoted backend command.
///
/// The command sees each task prompt as `$line`. With `debug`, extra
/// `[DEBUG:*]` markers trace the wrapper's steps and the backend's stderr is
/// merged into stdout.
pub fn heartbeat_wrapper(agent_cmd: &str, debug: bool) -> String {
    if debug {
        return format!(
            concat!(
                "echo \"[HEARTBEAT]\"; ",
                "while IFS= read -r line; do ",
                "[ -z \"$line\" ] && continue; ",
                "echo \"[DEBUG:STDIN_READ] $(date +%s) len=${{#line}}\"; ",
                "(while true; do sleep 5; echo \"[HEARTBEAT]\"; done) & ",
                "_hb=$!; ",
                "echo \"[DEBUG:CMD_START] $(date +%s)\"; ",
                "{agent_cmd} 2>&1 < /dev/null; ",
                "_rc=$?; ",
                "echo \"[DEBUG:CMD_EXIT] $(date +%s) rc=$_rc\"; ",
                "kill $_hb 2>/dev/null; wait $_hb 2>/dev/null; ",
                "if [ $_rc -eq 0 ]; then echo \"[TASK_DONE]\"; else echo \"[TASK_FAILED]\"; fi; ",
                "done"
            ),
            agent_cmd = agent_cmd
        );
    }
    format!(
        concat!(
            "echo \"[HEARTBEAT]\"; ",
            "while IFS= read -r line; do ",
            "[ -z \"$line\" ] && continue; ",
            "(while true; do sleep 5; echo \"[HEARTBEAT]\"; done) & ",
            "_hb=$!; ",
            "{agent_cmd} < /dev/null; ",
            "_rc=$?; ",
            "kill $_hb 2>/dev/null; wait $_hb 2>/dev/null; ",
            "if [ $_rc -eq 0 ]; then echo \"[TASK_DONE]\"; else echo \"[TASK_FAILED]\"; fi; ",
            "done"
        ),
        agent_cmd = agent_cmd
    )
}

/// Quote a string for `sh` (single quotes, embedded quotes escaped).
fn sh_quote(s: &str) -> String {
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:=".contains(c)) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Built-in command line for a backend CLI, wrapped for heartbeats.
///
/// The model flag is only passed when the role configures one; an empty model
/// means the tool's own default.
fn backend_command(
    backend: &str,
    model: &str,
    debug: bool,
) -> Result<Vec<String>, AgentAdapterError> {
    let model_flag =
        if model.is_empty() { String::new() } else { format!("--model {} ", sh_quote(model)) };

    let agent_cmd = match backend {
        "claude" => format!("claude -p {model_flag}--dangerously-skip-permissions \"$line\""),
        "codex" => format!(
            "codex exec --json --skip-git-repo-check --sandbox workspace-write {model_flag}\"$line\""
        ),
        "aider" => format!("aider {model_flag}--message \"$line\""),
        other => return Err(AgentAdapterError::UnsupportedBackend(other.to_string())),
    };
    Ok(vec!["sh".to_string(), "-c".to_string(), heartbeat_wrapper(&agent_cmd, debug)])
}

/// Resolve the full command for a role: per-role override verbatim, otherwise
/// the built-in backend command. Overrides must speak the wrapper protocol
/// themselves.
pub fn role_command(role: &Role, debug: bool) -> Result<Vec<String>, AgentAdapterError> {
    if let Some(cmd) = &role.command {
        if !cmd.is_empty() {
            return Ok(cmd.clone());
        }
    }
    backend_command(&role.backend, &role.model, debug)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
