// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inferred-task runner.
//!
//! Drains small batches of runnable queued tasks, executes each built-in
//! task type, and records the terminal status. Failed tasks stay
//! `failed`; there is no automatic retry.

use serde_json::Value;
use tracing::{info, warn};

use solace_core::types::Task;
use solace_core::{SolaceError, Store};

use crate::commit::now_iso;

/// Summary of one drain pass.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TaskRunReport {
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Claims up to `batch` runnable tasks and executes them sequentially.
pub async fn run_pending(store: &dyn Store, batch: i64) -> Result<TaskRunReport, SolaceError> {
    let now = now_iso();
    let claimed = store.dequeue_tasks(batch, &now).await?;
    let mut report = TaskRunReport {
        claimed: claimed.len(),
        completed: 0,
        failed: 0,
    };

    for task in &claimed {
        match execute(task) {
            Ok(result) => {
                store.complete_task(&task.id, &result).await?;
                report.completed += 1;
                info!(task_id = %task.id, task_type = %task.task_type, "task completed");
            }
            Err(reason) => {
                store.fail_task(&task.id, &reason).await?;
                report.failed += 1;
                warn!(task_id = %task.id, task_type = %task.task_type, reason = %reason, "task failed");
            }
        }
    }

    Ok(report)
}

/// Executes one task by type. Unknown types fail with a descriptive
/// message.
fn execute(task: &Task) -> Result<String, String> {
    match task.task_type.as_str() {
        "plan_day" => {
            let focus = param_str(task, "priority").unwrap_or("balance");
            Ok(format!("day plan drafted around {focus}"))
        }
        "reminder" => match param_str(task, "note") {
            Some(note) => Ok(format!("reminder noted: {note}")),
            None => Ok("reminder noted".to_string()),
        },
        "check_in" => Ok("check-in scheduled".to_string()),
        "journal_prompt" => Ok("journal prompt prepared".to_string()),
        other => Err(format!("unknown task type: {other}")),
    }
}

fn param_str<'a>(task: &'a Task, key: &str) -> Option<&'a str> {
    task.parameters.get(key).and_then(Value::as_str)
}
