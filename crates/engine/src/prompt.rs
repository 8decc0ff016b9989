// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task prompt synthesis.
//!
//! One template per task-kind family, interpolated from task fields. Prompts
//! deliberately contain no wrapper protocol markers; `[TASK_DONE]` and
//! friends come from the heartbeat wrapper, keyed on the backend's exit code.

use fm_core::{Task, TaskKind};

fn context_block(goal: &str, task: &Task) -> String {
    let goal_ctx = if goal.is_empty() { String::new() } else { format!("Project goal: {goal}\n\n") };
    let desc = task.description.replace('\n', " ").trim().to_string();

    let mut block = format!("{goal_ctx}Task {}: {}\n\n{desc}\n", task.task_id, task.title);
    if !task.target_files.is_empty() {
        block.push_str("\nTarget files:\n");
        for file in &task.target_files {
            block.push_str(&format!("  - {file}\n"));
        }
    }
    if !task.acceptance.is_empty() {
        block.push_str("\nAcceptance criteria:\n");
        for item in &task.acceptance {
            block.push_str(&format!("  - {item}\n"));
        }
    }
    block
}

/// Build the prompt handed to a worker for one task.
pub fn build_task_prompt(goal: &str, task: &Task) -> String {
    let context = context_block(goal, task);
    let instructions = match task.kind {
        TaskKind::Implement | TaskKind::Test | TaskKind::Integrate => {
            "You are a coding agent. Read the existing code in this working directory, \
             then create or modify the necessary files to complete this task. \
             Write clean, working code. Run any available tests to verify correctness."
        }
        TaskKind::Analysis | TaskKind::Design => {
            "Analyze the codebase in this working directory and produce a concrete \
             written plan or analysis. Include specific file paths, function names, \
             and implementation details."
        }
        TaskKind::Judge | TaskKind::Critic => {
            "Evaluate the work in this working directory. Check for correctness, \
             completeness, and adherence to the acceptance criteria. Report any issues found."
        }
        TaskKind::Merge => {
            "Complete this task using the files in the current working directory."
        }
    };
    format!("{context}\n{instructions}")
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
