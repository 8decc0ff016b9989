// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merge queue data structure.
//!
//! One item per reviewable task that claimed completion. The coordinator's
//! review pass drives items pending → in_review → approved → merged (or
//! rejected); this module owns the item lifecycle bookkeeping and the
//! snapshot projection.

use fm_bus::{MergeItemRow, MergeQueueSnapshot};
use fm_core::TaskId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeItemStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
    Merged,
}

impl MergeItemStatus {
    /// Rejected and merged items are settled; their task ids may not be
    /// enqueued again.
    pub fn is_settled(self) -> bool {
        matches!(self, MergeItemStatus::Rejected | MergeItemStatus::Merged)
    }
}

fm_core::simple_display! {
    MergeItemStatus {
        Pending => "pending",
        InReview => "in_review",
        Approved => "approved",
        Rejected => "rejected",
        Merged => "merged",
    }
}

/// One task moving through the review-and-merge pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeQueueItem {
    pub task_id: TaskId,
    pub status: MergeItemStatus,
    #[serde(default)]
    pub judge_task_ids: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub merge_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
}

impl MergeQueueItem {
    fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: MergeItemStatus::Pending,
            judge_task_ids: Vec::new(),
            merge_task_id: None,
            quality_score: None,
            merge_attempts: 0,
            decision: None,
        }
    }
}

/// The review-and-merge pipeline queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeQueue {
    items: Vec<MergeQueueItem>,
}

impl MergeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a completion claim. Idempotent: a task with an unsettled item
    /// is not enqueued twice, and settled items stay settled.
    pub fn enqueue(&mut self, task_id: TaskId) -> bool {
        if self.items.iter().any(|i| i.task_id == task_id) {
            return false;
        }
        self.items.push(MergeQueueItem::new(task_id));
        true
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&MergeQueueItem> {
        self.items.iter().find(|i| &i.task_id == task_id)
    }

    pub fn get_mut(&mut self, task_id: &TaskId) -> Option<&mut MergeQueueItem> {
        self.items.iter_mut().find(|i| &i.task_id == task_id)
    }

    /// Replace the item with the same task id. Unknown items are ignored.
    pub fn replace(&mut self, item: MergeQueueItem) {
        if let Some(slot) = self.items.iter_mut().find(|i| i.task_id == item.task_id) {
            *slot = item;
        }
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.items.iter().map(|i| i.task_id.clone()).collect()
    }

    pub fn items(&self) -> &[MergeQueueItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Snapshot projection: status counts plus item rows.
    pub fn snapshot(&self) -> MergeQueueSnapshot {
        let mut snap = MergeQueueSnapshot::default();
        for item in &self.items {
            match item.status {
                MergeItemStatus::Pending => snap.pending += 1,
                MergeItemStatus::InReview => snap.in_review += 1,
                MergeItemStatus::Approved => snap.approved += 1,
                MergeItemStatus::Rejected => snap.rejected += 1,
                MergeItemStatus::Merged => snap.merged += 1,
            }
            snap.items.push(MergeItemRow {
                task_id: item.task_id.clone(),
                status: item.status.to_string(),
                judge_task_ids: item.judge_task_ids.clone(),
                merge_task_id: item.merge_task_id.clone(),
                quality_score: item.quality_score,
                merge_attempts: item.merge_attempts,
                decision: item.decision.clone(),
            });
        }
        snap
    }

    /// Rebuild the queue from snapshot rows (resume path). Rows with
    /// unrecognized statuses are dropped.
    pub fn from_rows(rows: &[MergeItemRow]) -> Self {
        let items = rows
            .iter()
            .filter_map(|row| {
                let status = match row.status.as_str() {
                    "pending" => MergeItemStatus::Pending,
                    "in_review" => MergeItemStatus::InReview,
                    "approved" => MergeItemStatus::Approved,
                    "rejected" => MergeItemStatus::Rejected,
                    "merged" => MergeItemStatus::Merged,
                    _ => return None,
                };
                Some(MergeQueueItem {
                    task_id: row.task_id.clone(),
                    status,
                    judge_task_ids: row.judge_task_ids.clone(),
                    merge_task_id: row.merge_task_id.clone(),
                    quality_score: row.quality_score,
                    merge_attempts: row.merge_attempts,
                    decision: row.decision.clone(),
                })
            })
            .collect();
        Self { items }
    }
}

#[cfg(test)]
#[path = "merge_queue_tests.rs"]
mod tests;
