// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only rendering of a run directory: `fm status` and `fm events`.
//!
//! Everything here works from `state.json` and `events.jsonl` alone, the
//! same contract external dashboards rely on.

use anyhow::{bail, Context};
use fm_bus::{read_journal, read_json_opt, RunLayout, StateSnapshot};
use std::path::Path;

pub(crate) fn print_status(run_dir: &Path) -> anyhow::Result<()> {
    let layout = RunLayout::new(run_dir);
    let snapshot: Option<StateSnapshot> = read_json_opt(&layout.state_path())
        .with_context(|| format!("reading {}", layout.state_path().display()))?;
    let Some(snapshot) = snapshot else {
        bail!("no snapshot at {}", layout.state_path().display());
    };

    let status = &snapshot.status;
    println!("run {}  phase={}  seq={}", snapshot.run_id, status.phase, snapshot.state_seq);
    let q = &status.queue;
    println!(
        "tasks: {} total | {} pending {} ready {} running {} reviewing {} done {} failed",
        q.total, q.pending, q.ready, q.running, q.reviewing, q.done, q.failed
    );
    let b = &status.budget;
    if b.max_tokens > 0 || b.max_cost_usd > 0.0 {
        println!(
            "budget: {} tokens (cap {}), ${:.4} (cap ${:.2}){}",
            b.tokens_used,
            b.max_tokens,
            b.cost_used_usd,
            b.max_cost_usd,
            if b.hard_exceeded { "  HARD EXCEEDED" } else { "" }
        );
    }

    println!();
    for row in snapshot.tasks.values() {
        let agent = row
            .assigned_agent_id
            .as_ref()
            .map(|a| format!("  @{a}"))
            .unwrap_or_default();
        let failure = row
            .failure_mode
            .as_ref()
            .map(|f| format!("  [{f}]"))
            .unwrap_or_default();
        println!(
            "  {:<24} {:<10} {:<9} attempts={}{agent}{failure}",
            row.task_id, row.kind, row.status, row.attempts
        );
    }

    if !snapshot.agents.is_empty() {
        println!();
        for agent in &snapshot.agents {
            let task = agent
                .task_id
                .as_ref()
                .map(|t| format!("  on {t}"))
                .unwrap_or_default();
            println!(
                "  {:<16} {:<8} {} restarts={}{task}",
                agent.agent_id, agent.status, agent.backend, agent.restart_count
            );
        }
    }

    if !snapshot.errors.is_empty() {
        println!();
        println!("recent errors:");
        for error in snapshot.errors.iter().rev().take(5) {
            println!("  [{}] {}", error.category, error.message);
        }
    }
    Ok(())
}

pub(crate) fn print_events(run_dir: &Path, tail: usize) -> anyhow::Result<()> {
    let layout = RunLayout::new(run_dir);
    let events = read_journal(&layout.events_path())?;
    if events.is_empty() {
        bail!("no events at {}", layout.events_path().display());
    }
    let skip = events.len().saturating_sub(tail);
    for event in &events[skip..] {
        println!(
            "{}  {:<26} {}",
            event.timestamp.format("%H:%M:%S%.3f"),
            event.event.name(),
            event.event.log_summary()
        );
    }
    Ok(())
}
