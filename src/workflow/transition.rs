//! 任务状态迁移
//!
//! 把上游运行状态应用到处于 `Processing` 的任务上，纯同步逻辑

use tracing::{info, warn};

use crate::clients::gateway::RunStatus;
use crate::models::task::{Task, TaskError, TaskErrorKind, TaskStatus};
use crate::services::question_parser::parse_questions;

/// 应用上游状态后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// 上游仍在运行，或任务已是终止状态
    Unchanged,
    /// 任务进入终止状态
    Settled(TaskStatus),
}

/// 根据上游状态推进任务
///
/// 只有 `Processing` 状态的任务会被修改。
pub fn apply_run_status(task: &mut Task, status: RunStatus) -> Transition {
    if task.status != TaskStatus::Processing {
        return Transition::Unchanged;
    }

    match status {
        RunStatus::Running => Transition::Unchanged,
        RunStatus::Succeeded {
            output: Some(output),
        } => {
            let outcome = parse_questions(&output);

            if !outcome.errors.is_empty() {
                warn!(
                    "[任务 {}] ⚠️ {} 个题块解析失败",
                    task.id,
                    outcome.errors.len()
                );
            }

            task.status = if outcome.questions.is_empty() {
                TaskStatus::CompletedEmpty
            } else {
                TaskStatus::Completed
            };
            info!(
                "[任务 {}] ✓ 解析完成: {} 道题",
                task.id,
                outcome.questions.len()
            );

            task.raw_output = Some(output);
            task.questions = outcome.questions;
            task.parse_errors = outcome.errors;
            Transition::Settled(task.status)
        }
        RunStatus::Succeeded { output: None } => {
            task.status = TaskStatus::Failed;
            task.error = Some(TaskError {
                kind: TaskErrorKind::MalformedPayload,
                message: "上游报告成功但没有返回输出".to_string(),
            });
            Transition::Settled(TaskStatus::Failed)
        }
        RunStatus::Failed { error_text } => {
            task.status = TaskStatus::Failed;
            task.error = Some(TaskError {
                kind: TaskErrorKind::UpstreamFailed,
                message: error_text.unwrap_or_else(|| "上游未提供错误信息".to_string()),
            });
            Transition::Settled(TaskStatus::Failed)
        }
    }
}
