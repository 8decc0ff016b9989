// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local subprocess implementation of the agent adapter.
//!
//! Each spawned agent runs the role's (wrapper-enclosed) command with piped
//! stdio. A reader task classifies every stdout line: heartbeat markers
//! update liveness, terminal markers and progress lines become buffered
//! stream events with monotonic sequence numbers, and everything is teed to
//! the per-agent log file. Stderr feeds the same log plus a bounded tail used
//! in failure reasons.

use crate::protocol::{classify_line, WireLine};
use crate::usage::parse_usage;
use crate::AgentAdapterError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fm_core::{AgentId, Clock, OutboxEventKind};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};

/// Env vars that interfere with nested agent processes (running foreman from
/// inside an agent session would otherwise make the child CLI refuse to start).
pub const STRIP_ENV_VARS: &[&str] =
    &["CLAUDECODE", "CLAUDE_CODE_ENTRYPOINT", "CLAUDE_REPL", "CLAUDE_CODE_PACKAGE_DIR"];

/// Bytes of stderr kept for failure reasons.
pub const STDERR_TAIL_CAP: usize = 4000;

/// Everything needed to launch (or relaunch) one agent process.
#[derive(Debug, Clone)]
pub struct AgentProcessSpec {
    pub agent_id: AgentId,
    pub role_id: String,
    pub backend: String,
    pub model: String,
    /// Full argv, wrapper included.
    pub command: Vec<String>,
    pub cwd: PathBuf,
    /// Extra environment entries.
    pub env: Vec<(String, String)>,
    /// Variables to explicitly unset in the child.
    pub unset_env: Vec<String>,
    /// stdout+stderr capture file.
    pub log_path: PathBuf,
}

/// One parsed event from an agent's stdout stream.
///
/// Sequence numbers are monotonic per process lifetime and restart from 1
/// when an agent is respawned; callers track their own cursors per spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStreamEvent {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: OutboxEventKind,
    pub payload: serde_json::Value,
    pub token_usage: Option<u64>,
    pub cost_usd: Option<f64>,
}

/// Liveness snapshot of an agent process.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProcessStatus {
    pub running: bool,
    pub exit_code: Option<i32>,
    pub last_heartbeat_ms: u64,
    pub stderr_tail: String,
    pub pid: Option<u32>,
}

/// Uniform interface for spawning, feeding, reading from, and terminating a
/// worker subprocess, regardless of which backend CLI is behind it.
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Launch the agent. Replaces any previous process for the same id.
    async fn spawn(&self, spec: AgentProcessSpec) -> Result<(), AgentAdapterError>;

    /// Write one prompt line to the agent's stdin. Embedded newlines are
    /// flattened: the wrapper consumes exactly one line per task.
    async fn send(&self, agent_id: &AgentId, line: &str) -> Result<(), AgentAdapterError>;

    /// Events with `seq > since_seq`, in emission order.
    async fn read_events(
        &self,
        agent_id: &AgentId,
        since_seq: u64,
    ) -> Result<Vec<AgentStreamEvent>, AgentAdapterError>;

    async fn status(&self, agent_id: &AgentId) -> Result<AgentProcessStatus, AgentAdapterError>;

    /// Graceful termination escalating to a hard kill after `grace`.
    /// Returns the exit code when the process exited normally.
    async fn terminate(
        &self,
        agent_id: &AgentId,
        reason: &str,
        grace: Duration,
    ) -> Result<Option<i32>, AgentAdapterError>;
}

#[derive(Debug)]
struct Shared {
    events: Mutex<Vec<AgentStreamEvent>>,
    last_heartbeat_ms: AtomicU64,
    stderr_tail: Mutex<String>,
    log: Mutex<std::fs::File>,
}

impl Shared {
    fn append_log(&self, line: &str) {
        let mut log = self.log.lock();
        let _ = writeln!(log, "{line}");
    }

    fn push_event(
        &self,
        timestamp: DateTime<Utc>,
        kind: OutboxEventKind,
        payload: serde_json::Value,
        token_usage: Option<u64>,
        cost_usd: Option<f64>,
    ) {
        let mut events = self.events.lock();
        let seq = events.len() as u64 + 1;
        events.push(AgentStreamEvent { seq, timestamp, kind, payload, token_usage, cost_usd });
    }
}

#[derive(Clone)]
struct AgentProcess {
    child: Arc<tokio::sync::Mutex<Child>>,
    stdin: Arc<tokio::sync::Mutex<ChildStdin>>,
    pid: Option<u32>,
    shared: Arc<Shared>,
}

/// Process-backed [`AgentAdapter`].
pub struct ProcessAdapter<C: Clock + 'static> {
    clock: C,
    agents: Arc<Mutex<HashMap<AgentId, AgentProcess>>>,
}

impl<C: Clock + 'static> ProcessAdapter<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, agents: Arc::new(Mutex::new(HashMap::new())) }
    }

    fn get(&self, agent_id: &AgentId) -> Result<AgentProcess, AgentAdapterError> {
        self.agents
            .lock()
            .get(agent_id)
            .cloned()
            .ok_or_else(|| AgentAdapterError::NotFound(agent_id.to_string()))
    }
}

#[async_trait]
impl<C: Clock + 'static> AgentAdapter for ProcessAdapter<C> {
    async fn spawn(&self, spec: AgentProcessSpec) -> Result<(), AgentAdapterError> {
        let program = spec
            .command
            .first()
            .ok_or_else(|| AgentAdapterError::SpawnFailed("empty command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(&spec.command[1..])
            .current_dir(&spec.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for var in STRIP_ENV_VARS {
            cmd.env_remove(var);
        }
        for var in &spec.unset_env {
            cmd.env_remove(var);
        }
        cmd.env("FM_AGENT_ID", spec.agent_id.as_str());
        cmd.env("FM_MODEL", &spec.model);
        cmd.envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let mut child = cmd
            .spawn()
            .map_err(|e| AgentAdapterError::SpawnFailed(format!("{program}: {e}")))?;
        let pid = child.id();

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentAdapterError::SpawnFailed("no stdin pipe".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentAdapterError::SpawnFailed("no stdout pipe".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AgentAdapterError::SpawnFailed("no stderr pipe".to_string()))?;

        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&spec.log_path)?;

        let shared = Arc::new(Shared {
            events: Mutex::new(Vec::new()),
            // Spawn counts as liveness; the wrapper echoes its own heartbeat
            // right after.
            last_heartbeat_ms: AtomicU64::new(self.clock.epoch_ms()),
            stderr_tail: Mutex::new(String::new()),
            log: Mutex::new(log),
        });

        tracing::info!(
            agent_id = %spec.agent_id,
            pid = ?pid,
            cwd = %spec.cwd.display(),
            "agent process spawned"
        );

        // stdout reader: classify, tee to log, buffer events.
        {
            let shared = Arc::clone(&shared);
            let clock = self.clock.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    shared.append_log(&line);
                    match classify_line(&line) {
                        WireLine::Heartbeat => {
                            shared.last_heartbeat_ms.store(clock.epoch_ms(), Ordering::SeqCst);
                        }
                        WireLine::TaskDone => {
                            shared.push_event(
                                clock.utc(),
                                OutboxEventKind::TaskDone,
                                json!({}),
                                None,
                                None,
                            );
                        }
                        WireLine::TaskFailed => {
                            shared.push_event(
                                clock.utc(),
                                OutboxEventKind::TaskFailed,
                                json!({}),
                                None,
                                None,
                            );
                        }
                        WireLine::Progress(text) => {
                            let usage = parse_usage(text);
                            shared.push_event(
                                clock.utc(),
                                OutboxEventKind::Progress,
                                json!({ "line": text }),
                                usage.tokens,
                                usage.cost_usd,
                            );
                        }
                    }
                }
            });
        }

        // stderr reader: tee to log, keep a bounded tail.
        {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    shared.append_log(&line);
                    let mut tail = shared.stderr_tail.lock();
                    tail.push_str(&line);
                    tail.push('\n');
                    if tail.len() > STDERR_TAIL_CAP {
                        let cut = tail.len() - STDERR_TAIL_CAP;
                        // Trim on a char boundary.
                        let cut = tail
                            .char_indices()
                            .map(|(i, _)| i)
                            .find(|&i| i >= cut)
                            .unwrap_or(0);
                        tail.drain(..cut);
                    }
                }
            });
        }

        let process = AgentProcess {
            child: Arc::new(tokio::sync::Mutex::new(child)),
            stdin: Arc::new(tokio::sync::Mutex::new(stdin)),
            pid,
            shared,
        };
        self.agents.lock().insert(spec.agent_id.clone(), process);
        Ok(())
    }

    async fn send(&self, agent_id: &AgentId, line: &str) -> Result<(), AgentAdapterError> {
        let process = self.get(agent_id)?;
        let flattened = line.replace(['\n', '\r'], " ");
        let mut stdin = process.stdin.lock().await;
        stdin.write_all(flattened.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn read_events(
        &self,
        agent_id: &AgentId,
        since_seq: u64,
    ) -> Result<Vec<AgentStreamEvent>, AgentAdapterError> {
        let process = self.get(agent_id)?;
        let events = process.shared.events.lock();
        Ok(events.iter().filter(|e| e.seq > since_seq).cloned().collect())
    }

    async fn status(&self, agent_id: &AgentId) -> Result<AgentProcessStatus, AgentAdapterError> {
        let process = self.get(agent_id)?;
        let exit = process.child.lock().await.try_wait()?;
        let stderr_tail = process.shared.stderr_tail.lock().clone();
        let status = AgentProcessStatus {
            running: exit.is_none(),
            exit_code: exit.and_then(|status| status.code()),
            last_heartbeat_ms: process.shared.last_heartbeat_ms.load(Ordering::SeqCst),
            stderr_tail,
            pid: process.pid,
        };
        Ok(status)
    }

    async fn terminate(
        &self,
        agent_id: &AgentId,
        reason: &str,
        grace: Duration,
    ) -> Result<Option<i32>, AgentAdapterError> {
        let process = self.get(agent_id)?;
        tracing::info!(agent_id = %agent_id, reason, "terminating agent");

        if let Some(pid) = process.pid {
            let _ = nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(pid as i32),
                nix::sys::signal::Signal::SIGTERM,
            );
        }

        let mut child = process.child.lock().await;
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => Ok(status?.code()),
            Err(_) => {
                tracing::warn!(agent_id = %agent_id, "grace expired, hard killing");
                child.start_kill()?;
                Ok(child.wait().await?.code())
            }
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
