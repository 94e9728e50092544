//! 单个请求处理器 - 编排层
//!
//! ## 职责
//!
//! 负责一个生成请求从提交到结束的完整过程。
//!
//! 1. **提交**：委托 `TaskLifecycleController::submit`
//! 2. **轮询**：提交后立即轮询一次，之后按间隔轮询直到终止状态或达到次数上限
//! 3. **容错**：轮询时的网关错误只记录警告，继续下一轮

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::request::GenerationRequest;
use crate::models::task::Task;
use crate::utils::logging::{log_task_complete, log_task_start};
use crate::workflow::TaskLifecycleController;

/// 处理单个请求
///
/// # 参数
/// - `controller`: 任务生命周期控制器
/// - `request`: 生成请求
/// - `request_index`: 请求序号（仅用于日志）
/// - `config`: 配置
///
/// # 返回
/// 返回最后一次观察到的任务快照（可能仍为 `Processing`）
pub async fn run_request(
    controller: &TaskLifecycleController,
    request: GenerationRequest,
    request_index: usize,
    config: &Config,
) -> AppResult<Task> {
    log_task_start(request_index, &request);

    let task = controller.submit(request).await?;

    let task = wait_until_settled(
        controller,
        &task.id,
        request_index,
        config.max_poll_attempts,
        config.poll_interval(),
    )
    .await?;

    log_task_complete(request_index, &task);

    Ok(task)
}

/// 轮询直到任务结束或达到次数上限
pub async fn wait_until_settled(
    controller: &TaskLifecycleController,
    task_id: &str,
    request_index: usize,
    max_attempts: usize,
    interval: Duration,
) -> AppResult<Task> {
    for attempt in 1..=max_attempts {
        match controller.poll(task_id).await {
            Ok(task) if task.status.is_terminal() => return Ok(task),
            Ok(_) => debug!(
                "[请求 {}] 第 {}/{} 次轮询: 仍在处理中",
                request_index, attempt, max_attempts
            ),
            Err(e) if e.is_transient() => warn!(
                "[请求 {}] 第 {}/{} 次轮询失败: {}",
                request_index, attempt, max_attempts, e
            ),
            Err(e) => return Err(e),
        }

        if attempt < max_attempts {
            sleep(interval).await;
        }
    }

    warn!(
        "[请求 {}] ⚠️ 已轮询 {} 次，任务 {} 仍未结束",
        request_index, max_attempts, task_id
    );
    controller.task(task_id).await
}
