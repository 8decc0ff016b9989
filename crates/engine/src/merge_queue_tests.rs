// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn enqueue_is_idempotent() {
    let mut queue = MergeQueue::new();
    assert!(queue.enqueue(TaskId::new("t0")));
    assert!(!queue.enqueue(TaskId::new("t0")));
    assert_eq!(queue.items().len(), 1);
    assert_eq!(queue.get(&TaskId::new("t0")).unwrap().status, MergeItemStatus::Pending);
}

#[test]
fn settled_items_block_re_enqueue() {
    let mut queue = MergeQueue::new();
    queue.enqueue(TaskId::new("t0"));
    queue.get_mut(&TaskId::new("t0")).unwrap().status = MergeItemStatus::Merged;
    assert!(!queue.enqueue(TaskId::new("t0")));
    assert!(MergeItemStatus::Merged.is_settled());
    assert!(MergeItemStatus::Rejected.is_settled());
    assert!(!MergeItemStatus::Approved.is_settled());
}

#[test]
fn snapshot_counts_by_status() {
    let mut queue = MergeQueue::new();
    for (id, status) in [
        ("t0", MergeItemStatus::Pending),
        ("t1", MergeItemStatus::InReview),
        ("t2", MergeItemStatus::Approved),
        ("t3", MergeItemStatus::Rejected),
        ("t4", MergeItemStatus::Merged),
        ("t5", MergeItemStatus::Merged),
    ] {
        queue.enqueue(TaskId::new(id));
        queue.get_mut(&TaskId::new(id)).unwrap().status = status;
    }

    let snap = queue.snapshot();
    assert_eq!(snap.pending, 1);
    assert_eq!(snap.in_review, 1);
    assert_eq!(snap.approved, 1);
    assert_eq!(snap.rejected, 1);
    assert_eq!(snap.merged, 2);
    assert_eq!(snap.items.len(), 6);
    assert_eq!(snap.items[4].status, "merged");
}

#[test]
fn snapshot_round_trips_through_rows() {
    let mut queue = MergeQueue::new();
    queue.enqueue(TaskId::new("t0"));
    {
        let item = queue.get_mut(&TaskId::new("t0")).unwrap();
        item.status = MergeItemStatus::Approved;
        item.judge_task_ids = vec![TaskId::new("review-t0-judge")];
        item.merge_task_id = Some(TaskId::new("merge-t0"));
        item.quality_score = Some(1.0);
        item.decision = Some("approved".to_string());
    }

    let rows = queue.snapshot().items;
    let restored = MergeQueue::from_rows(&rows);
    assert_eq!(restored, queue);
}

#[test]
fn unknown_status_rows_are_dropped_on_restore() {
    let rows = vec![MergeItemRow {
        task_id: TaskId::new("t0"),
        status: "exploded".to_string(),
        judge_task_ids: vec![],
        merge_task_id: None,
        quality_score: None,
        merge_attempts: 0,
        decision: None,
    }];
    assert!(MergeQueue::from_rows(&rows).is_empty());
}
