// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn ts(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

fn transition(task_id: &str, n: i64) -> TransitionRecord {
    TransitionRecord {
        task_id: TaskId::new(task_id),
        from_state: TaskStatus::Ready,
        to_state: TaskStatus::Running,
        actor: "coordinator".to_string(),
        reason: format!("attempt {n}"),
        timestamp: ts(n),
    }
}

fn sample_record() -> TaskRecord {
    TaskRecord {
        task_id: TaskId::new("t0"),
        title: "Implement core changes".to_string(),
        description: "do the thing".to_string(),
        deps: vec![],
        role_hint: Some("worker".to_string()),
        kind: TaskKind::Implement,
        status: TaskStatus::Running,
        attempts: 1,
        last_error: None,
        assigned_agent_id: Some(AgentId::new("worker-1")),
        transitions: vec![transition("t0", 1)],
        validation: ValidationSnapshot::default(),
        updated_at: ts(1),
    }
}

#[test]
fn write_then_read_round_trips() {
    let dir = tempdir().unwrap();
    let layout = RunLayout::new(dir.path().join("run"));
    layout.ensure().unwrap();

    let record = sample_record();
    write_task_record(&layout, &record).unwrap();

    let back = read_task_record(&layout, &TaskId::new("t0")).unwrap().unwrap();
    assert_eq!(back, record);
}

#[test]
fn missing_record_reads_none() {
    let dir = tempdir().unwrap();
    let layout = RunLayout::new(dir.path().join("run"));
    layout.ensure().unwrap();

    assert!(read_task_record(&layout, &TaskId::new("ghost")).unwrap().is_none());
}

#[test]
fn rewrite_replaces_record() {
    let dir = tempdir().unwrap();
    let layout = RunLayout::new(dir.path().join("run"));
    layout.ensure().unwrap();

    let mut record = sample_record();
    write_task_record(&layout, &record).unwrap();

    record.status = TaskStatus::Done;
    record.attempts = 2;
    write_task_record(&layout, &record).unwrap();

    let back = read_task_record(&layout, &TaskId::new("t0")).unwrap().unwrap();
    assert_eq!(back.status, TaskStatus::Done);
    assert_eq!(back.attempts, 2);
}

#[test]
fn transition_tail_is_bounded() {
    let mut record = sample_record();
    record.transitions = (0..40).map(|n| transition("t0", n)).collect();
    record.trim_transitions();

    assert_eq!(record.transitions.len(), TRANSITION_TAIL);
    // Newest entries survive.
    assert_eq!(record.transitions.last().map(|t| t.timestamp), Some(ts(39)));
    assert_eq!(record.transitions.first().map(|t| t.timestamp), Some(ts(10)));
}

#[test]
fn validation_block_serializes() {
    let mut record = sample_record();
    record.validation = ValidationSnapshot {
        review_task_ids: vec![TaskId::new("review-t0-judge")],
        statuses: [(TaskId::new("review-t0-judge"), TaskStatus::Done)].into_iter().collect(),
    };

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["validation"]["review_task_ids"][0], "review-t0-judge");
    assert_eq!(json["validation"]["statuses"]["review-t0-judge"], "done");
}
