//! 生成任务模型
//!
//! 一个任务对应一次提交到工作流引擎的生成请求

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::question::{ParseError, Question};
use crate::models::request::GenerationRequest;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// 请求已构建但尚未提交，只在提交过程中短暂存在
    Pending,
    /// 已提交，等待上游完成
    Processing,
    /// 上游成功且至少解析出一道题
    Completed,
    /// 上游成功但没有解析出任何有效题目
    CompletedEmpty,
    /// 上游失败或返回了无法使用的结果
    Failed,
}

impl TaskStatus {
    /// 是否为终止状态
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::CompletedEmpty | TaskStatus::Failed
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Processing => "Processing",
            TaskStatus::Completed => "Completed",
            TaskStatus::CompletedEmpty => "CompletedEmpty",
            TaskStatus::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// 任务失败类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// 上游报告运行失败
    UpstreamFailed,
    /// 上游报告成功但缺少输出
    MalformedPayload,
}

/// 任务失败信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// 生成任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub request: GenerationRequest,
    pub created_at: DateTime<Local>,
    pub status: TaskStatus,
    pub raw_output: Option<String>,
    pub questions: Vec<Question>,
    pub parse_errors: Vec<ParseError>,
    pub error: Option<TaskError>,
}

impl Task {
    /// 网关接受提交后创建任务，初始状态为 `Processing`
    pub fn submitted(id: impl Into<String>, request: GenerationRequest) -> Self {
        Self {
            id: id.into(),
            request,
            created_at: Local::now(),
            status: TaskStatus::Processing,
            raw_output: None,
            questions: Vec::new(),
            parse_errors: Vec::new(),
            error: None,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[任务 {} {} {}]", self.id, self.request, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::CompletedEmpty.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }
}
