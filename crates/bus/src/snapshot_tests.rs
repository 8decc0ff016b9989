// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::atomic::read_json_opt;
use fm_core::{BudgetCounter, BudgetSpec, FakeClock};
use tempfile::tempdir;

fn empty_snapshot(seq: u64) -> StateSnapshot {
    StateSnapshot {
        state_seq: seq,
        timestamp: DateTime::from_timestamp_millis(1_000_000).unwrap(),
        run_id: RunId::new("run_0123456789ab"),
        status: RunStatus {
            phase: Phase::Executing,
            wave: 0,
            queue: QueueStats::default(),
            budget: BudgetCounter::new(BudgetSpec::default()).snapshot(),
            watchdog: WatchdogStats::default(),
        },
        tasks: IndexMap::new(),
        edges: Vec::new(),
        agents: Vec::new(),
        merge_queue: MergeQueueSnapshot::default(),
        cursors: BTreeMap::new(),
        assignments: BTreeMap::new(),
        attempts: BTreeMap::new(),
        timeline: Vec::new(),
        errors: Vec::new(),
        decisions: Vec::new(),
        model_health: BTreeMap::new(),
        plan: None,
        verification: VerificationSummary::default(),
        artifact_inventory: Vec::new(),
        worker_log_files: BTreeMap::new(),
        quality_stats: QualityStats::default(),
        wave_reviews: Vec::new(),
        quality_results: Vec::new(),
    }
}

#[test]
fn queue_stats_sum_to_total() {
    let mut stats = QueueStats::default();
    for status in [
        TaskStatus::Pending,
        TaskStatus::Ready,
        TaskStatus::Running,
        TaskStatus::Done,
        TaskStatus::Done,
        TaskStatus::Failed,
        TaskStatus::Skipped,
    ] {
        stats.count(status);
    }
    assert_eq!(stats.total, 7);
    assert_eq!(
        stats.pending
            + stats.ready
            + stats.running
            + stats.reviewing
            + stats.done
            + stats.failed
            + stats.blocked
            + stats.skipped,
        stats.total
    );
    assert_eq!(stats.done, 2);
}

#[test]
fn first_schedule_writes_immediately() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let clock = FakeClock::new();
    let mut writer = StateWriter::new(&path, 2.0, clock);

    assert!(writer.schedule_write(empty_snapshot).unwrap());
    let snap: Option<StateSnapshot> = read_json_opt(&path).unwrap();
    assert_eq!(snap.unwrap().state_seq, 1);
}

#[test]
fn writes_within_cooldown_are_deferred_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let clock = FakeClock::new();
    let mut writer = StateWriter::new(&path, 2.0, clock.clone());

    assert!(writer.schedule_write(empty_snapshot).unwrap());
    // Within the 500ms cooldown: both calls defer, only one write is armed.
    assert!(!writer.schedule_write(empty_snapshot).unwrap());
    assert!(!writer.schedule_write(empty_snapshot).unwrap());
    assert!(writer.deferred_pending());

    // Not yet elapsed.
    clock.advance(Duration::from_millis(200));
    assert!(!writer.flush_deferred(empty_snapshot).unwrap());

    clock.advance(Duration::from_millis(400));
    assert!(writer.flush_deferred(empty_snapshot).unwrap());
    assert!(!writer.deferred_pending());

    let snap: StateSnapshot = read_json_opt(&path).unwrap().unwrap();
    assert_eq!(snap.state_seq, 2);
}

#[test]
fn state_seq_strictly_increases_across_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let clock = FakeClock::new();
    let mut writer = StateWriter::new(&path, 10.0, clock.clone());

    let mut last = 0;
    for _ in 0..5 {
        writer.schedule_write(empty_snapshot).unwrap();
        clock.advance(Duration::from_millis(150));
        let snap: StateSnapshot = read_json_opt(&path).unwrap().unwrap();
        assert!(snap.state_seq > last);
        last = snap.state_seq;
    }
}

#[test]
fn finalize_ignores_rate_limit_and_cancels_deferred() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let clock = FakeClock::new();
    let mut writer = StateWriter::new(&path, 1.0, clock);

    writer.schedule_write(empty_snapshot).unwrap();
    writer.schedule_write(empty_snapshot).unwrap(); // deferred
    assert!(writer.deferred_pending());

    writer.finalize(empty_snapshot).unwrap();
    assert!(!writer.deferred_pending());

    let snap: StateSnapshot = read_json_opt(&path).unwrap().unwrap();
    assert_eq!(snap.state_seq, 2);
}

#[test]
fn resume_continues_sequence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut writer = StateWriter::new(&path, 5.0, FakeClock::new());
    writer.resume_from_seq(41);

    writer.schedule_write(empty_snapshot).unwrap();
    let snap: StateSnapshot = read_json_opt(&path).unwrap().unwrap();
    assert_eq!(snap.state_seq, 42);
}

#[test]
fn snapshot_serde_round_trip() {
    let snapshot = empty_snapshot(7);
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: StateSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);
}
