//! 工作流网关抽象
//!
//! 任务生命周期只依赖这个 trait，具体的 HTTP 实现见 `workflow_client`

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::models::request::GenerationRequest;

/// 提交成功后网关返回的回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub task_id: String,
}

/// 上游运行状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// 仍在排队或运行
    Running,
    /// 运行成功，`output` 为生成的原始文本
    Succeeded { output: Option<String> },
    /// 运行失败
    Failed { error_text: Option<String> },
}

/// 远程工作流引擎
#[async_trait]
pub trait WorkflowGateway: Send + Sync {
    /// 提交生成请求，返回上游任务 ID
    async fn submit(
        &self,
        request: &GenerationRequest,
        user_id: &str,
    ) -> Result<SubmitReceipt, GatewayError>;

    /// 查询任务状态
    async fn status(&self, task_id: &str) -> Result<RunStatus, GatewayError>;
}
