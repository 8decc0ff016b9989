// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Review-and-merge queue advancement.
//!
//! Completion claims on reviewable tasks pass through judge/critic review
//! tasks and an authority-role merge task before the underlying task counts
//! as done. Item lifecycle: pending → in_review → approved → merged, with
//! rejection on insufficient quality or a terminally failed merge.

use super::Coordinator;
use crate::error::EngineError;
use crate::merge_queue::MergeItemStatus;
use fm_adapters::AgentAdapter;
use fm_bus::{QualityResult, WaveReview};
use fm_core::{Clock, RoleType, Task, TaskId, TaskKind, TaskStatus};

impl<A: AgentAdapter, C: Clock> Coordinator<A, C> {
    pub(crate) async fn process_review_queue(&mut self) -> Result<(), EngineError> {
        let authority = self.config.merge.authority_role.clone();
        let threshold = self.config.merge.quality_threshold;
        let review_roles = self.review_role_ids();

        for task_id in self.merge_queue.task_ids() {
            let Some(mut item) = self.merge_queue.get(&task_id).cloned() else {
                continue;
            };

            if item.status == MergeItemStatus::Pending {
                let mut created = Vec::new();
                for (role_id, role_type) in &review_roles {
                    let review_id = TaskId::new(format!("review-{task_id}-{role_id}"));
                    if !self.graph.contains(&review_id) {
                        let kind = if *role_type == RoleType::Judge {
                            TaskKind::Judge
                        } else {
                            TaskKind::Critic
                        };
                        let mut review = Task::new(
                            review_id.clone(),
                            format!("Review {task_id}"),
                            kind,
                        );
                        review.description = format!("Validate completion claim for {task_id}");
                        review.deps = vec![task_id.clone()];
                        review.role_hint = Some(role_id.clone());
                        self.append_task(review)?;
                        self.transition_task(
                            &review_id,
                            TaskStatus::Ready,
                            "coordinator",
                            "review_created",
                        )?;
                    }
                    created.push(review_id);
                }
                item.judge_task_ids = created;
                item.status = MergeItemStatus::InReview;
                item.decision = Some("reviewing".to_string());
            }

            if item.status == MergeItemStatus::InReview {
                if item.judge_task_ids.is_empty() {
                    item.status = MergeItemStatus::Approved;
                    item.decision = Some("approved_without_review_roles".to_string());
                    self.decide(
                        "review",
                        "approved",
                        format!("{task_id} approved without review roles"),
                    );
                } else {
                    let statuses: Vec<TaskStatus> = item
                        .judge_task_ids
                        .iter()
                        .filter_map(|id| self.graph.status(id))
                        .collect();
                    let all_terminal = statuses.len() == item.judge_task_ids.len()
                        && statuses.iter().all(|s| s.is_terminal());
                    if all_terminal {
                        let passed =
                            statuses.iter().filter(|s| **s == TaskStatus::Done).count();
                        let total = statuses.len().max(1);
                        let score = passed as f64 / total as f64;
                        item.quality_score = Some(score);
                        let approved = score >= threshold;
                        self.wave_reviews.push(WaveReview {
                            wave: self.wave,
                            task_id: task_id.clone(),
                            reviews_passed: passed,
                            reviews_total: statuses.len(),
                            approved,
                        });
                        if approved {
                            item.status = MergeItemStatus::Approved;
                            item.decision = Some("approved".to_string());
                            self.decide(
                                "review",
                                "approved",
                                format!("{task_id} quality {score:.2}"),
                            );
                        } else {
                            item.status = MergeItemStatus::Rejected;
                            item.decision = Some("rejected".to_string());
                            self.quality_results.push(QualityResult {
                                task_id: task_id.clone(),
                                score,
                                decision: "rejected".to_string(),
                            });
                            self.decide(
                                "review",
                                "rejected",
                                format!("{task_id} quality {score:.2} below {threshold:.2}"),
                            );
                            self.transition_task(
                                &task_id,
                                TaskStatus::Failed,
                                "review",
                                "insufficient_quality",
                            )?;
                        }
                    }
                }
            }

            if item.status == MergeItemStatus::Approved {
                match item.merge_task_id.clone() {
                    None => {
                        let merge_id = TaskId::new(format!("merge-{task_id}"));
                        if !self.graph.contains(&merge_id) {
                            let mut merge = Task::new(
                                merge_id.clone(),
                                format!("Merge {task_id}"),
                                TaskKind::Merge,
                            );
                            merge.description =
                                format!("Apply and reconcile outputs for {task_id}");
                            merge.deps = std::iter::once(task_id.clone())
                                .chain(item.judge_task_ids.iter().cloned())
                                .collect();
                            merge.role_hint = Some(authority.clone());
                            self.append_task(merge)?;
                            self.transition_task(
                                &merge_id,
                                TaskStatus::Ready,
                                "coordinator",
                                "merge_created",
                            )?;
                        }
                        item.merge_task_id = Some(merge_id);
                    }
                    Some(merge_id) => match self.graph.status(&merge_id) {
                        Some(TaskStatus::Done) => {
                            item.status = MergeItemStatus::Merged;
                            item.decision = Some("merged".to_string());
                            self.quality_results.push(QualityResult {
                                task_id: task_id.clone(),
                                score: item.quality_score.unwrap_or(1.0),
                                decision: "merged".to_string(),
                            });
                            self.decide("merger", "merged", format!("{task_id} merged"));
                            self.transition_task(
                                &task_id,
                                TaskStatus::Done,
                                "merger",
                                "merge_completed",
                            )?;
                        }
                        Some(TaskStatus::Failed) => {
                            // The merge task exhausted its own dispatch
                            // retries before landing here terminally.
                            item.merge_attempts = self.graph.attempts(&merge_id);
                            item.status = MergeItemStatus::Rejected;
                            item.decision = Some("merge_failed".to_string());
                            self.decide(
                                "review",
                                "rejected",
                                format!("{task_id} merge task failed"),
                            );
                            self.transition_task(
                                &task_id,
                                TaskStatus::Failed,
                                "review",
                                "merge_failed",
                            )?;
                        }
                        _ => {}
                    },
                }
            }

            self.merge_queue.replace(item);
        }
        Ok(())
    }
}
