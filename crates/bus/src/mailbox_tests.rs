// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::tempdir;

fn ts(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

fn setup() -> (tempfile::TempDir, Mailboxes, AgentId) {
    let dir = tempdir().unwrap();
    let layout = RunLayout::new(dir.path().join("run"));
    layout.ensure().unwrap();
    let boxes = Mailboxes::new(layout);
    let agent = AgentId::new("coder-1");
    boxes.ensure(&agent).unwrap();
    (dir, boxes, agent)
}

#[test]
fn ensure_creates_empty_documents_once() {
    let (_dir, boxes, agent) = setup();

    // Write something, then ensure again. Existing docs must survive.
    boxes
        .push_inbox(&agent, ts(1), MessageKind::TaskAssign, Some(TaskId::new("t0")), json!({}), true)
        .unwrap();
    boxes.ensure(&agent).unwrap();

    let inbox = boxes.read_inbox(&agent).unwrap();
    assert_eq!(inbox.messages.len(), 1);
}

#[test]
fn inbox_sequences_survive_rewrites() {
    let (_dir, boxes, agent) = setup();

    for i in 0..3 {
        let task = TaskId::new(format!("t{i}"));
        boxes
            .push_inbox(&agent, ts(i), MessageKind::TaskAssign, Some(task), json!({"i": i}), true)
            .unwrap();
    }

    let inbox = boxes.read_inbox(&agent).unwrap();
    let seqs: Vec<u64> = inbox.messages.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
    assert_eq!(inbox.next_seq, 4);
}

#[test]
fn outbox_append_returns_sequenced_events() {
    let (_dir, boxes, agent) = setup();

    let written = boxes
        .append_outbox(
            &agent,
            vec![
                OutboxEntry {
                    timestamp: ts(1),
                    kind: OutboxEventKind::Progress,
                    task_id: Some(TaskId::new("t0")),
                    payload: json!({"line": "working"}),
                    token_usage: None,
                    cost_usd: None,
                },
                OutboxEntry {
                    timestamp: ts(2),
                    kind: OutboxEventKind::TaskDone,
                    task_id: Some(TaskId::new("t0")),
                    payload: json!({}),
                    token_usage: Some(50),
                    cost_usd: None,
                },
            ],
        )
        .unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(written[0].seq, 1);
    assert_eq!(written[1].seq, 2);
    assert_eq!(written[1].kind, OutboxEventKind::TaskDone);

    // Second batch continues the sequence.
    let more = boxes
        .append_outbox(
            &agent,
            vec![OutboxEntry {
                timestamp: ts(3),
                kind: OutboxEventKind::Progress,
                task_id: None,
                payload: json!({}),
                token_usage: None,
                cost_usd: None,
            }],
        )
        .unwrap();
    assert_eq!(more[0].seq, 3);
}

#[test]
fn empty_append_is_a_no_op() {
    let (_dir, boxes, agent) = setup();
    let written = boxes.append_outbox(&agent, vec![]).unwrap();
    assert!(written.is_empty());
    let outbox = boxes.read_outbox(&agent).unwrap();
    assert_eq!(outbox.next_seq, 1);
}

#[test]
fn distinct_agents_have_independent_sequences() {
    let (_dir, boxes, agent_a) = setup();
    let agent_b = AgentId::new("coder-2");
    boxes.ensure(&agent_b).unwrap();

    boxes
        .push_inbox(&agent_a, ts(1), MessageKind::TaskAssign, None, json!({}), false)
        .unwrap();
    let msg_b = boxes
        .push_inbox(&agent_b, ts(1), MessageKind::TaskAssign, None, json!({}), false)
        .unwrap();

    assert_eq!(msg_b.seq, 1);
    assert_eq!(msg_b.message_id, "coder-2-m1");
}
