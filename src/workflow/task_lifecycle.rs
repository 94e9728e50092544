//! 任务生命周期 - 流程层
//!
//! 核心职责：提交 → 轮询 → 完成/失败
//!
//! - 提交前校验请求，提交失败时不创建任务
//! - 轮询只对 `Processing` 任务调用网关，终止状态的任务直接返回
//! - 轮询时网关出错不改变任务状态，错误返回给调用方以便重试

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::gateway::WorkflowGateway;
use crate::error::{AppError, AppResult};
use crate::infrastructure::task_store::TaskStore;
use crate::models::request::GenerationRequest;
use crate::models::task::{Task, TaskStatus};
use crate::workflow::transition::{apply_run_status, Transition};

/// 任务生命周期控制器
///
/// 不持有任务本身，只持有存储与网关的共享引用
pub struct TaskLifecycleController {
    store: Arc<TaskStore>,
    gateway: Arc<dyn WorkflowGateway>,
    user_id: String,
}

impl TaskLifecycleController {
    pub fn new(
        store: Arc<TaskStore>,
        gateway: Arc<dyn WorkflowGateway>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            user_id: user_id.into(),
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// 提交生成请求
    ///
    /// 成功时返回处于 `Processing` 的新任务；失败时不会存储任何任务。
    pub async fn submit(&self, request: GenerationRequest) -> AppResult<Task> {
        request.validate()?;

        debug!("{} {} → {}", request, TaskStatus::Pending, TaskStatus::Processing);

        let receipt = self.gateway.submit(&request, &self.user_id).await.map_err(|e| {
            warn!("❌ 提交失败 {}: {}", request, e);
            e
        })?;

        let task = Task::submitted(receipt.task_id, request);
        let snapshot = task.clone();
        self.store.insert(task).await?;

        info!("📤 {} 已提交", snapshot);

        Ok(snapshot)
    }

    /// 轮询任务状态
    ///
    /// 整个读-改-写过程持有该任务的锁，同一任务的并发轮询会依次执行。
    pub async fn poll(&self, task_id: &str) -> AppResult<Task> {
        let handle = self
            .store
            .get(task_id)
            .await
            .ok_or_else(|| AppError::task_not_found(task_id))?;

        let mut task = handle.lock().await;

        if task.status.is_terminal() {
            debug!("{} 已结束，跳过轮询", *task);
            return Ok(task.clone());
        }

        let status = match self.gateway.status(&task.id).await {
            Ok(status) => status,
            Err(e) => {
                warn!("[任务 {}] ⚠️ 轮询失败，稍后重试: {}", task.id, e);
                return Err(e.into());
            }
        };

        match apply_run_status(&mut task, status) {
            Transition::Unchanged => debug!("[任务 {}] 仍在处理中", task.id),
            Transition::Settled(status) => info!("[任务 {}] 🏁 进入 {}", task.id, status),
        }

        Ok(task.clone())
    }

    /// 并发轮询所有处理中的任务
    ///
    /// 返回每个任务的轮询结果，顺序与存储中的插入顺序一致
    pub async fn poll_processing(&self) -> Vec<(String, AppResult<Task>)> {
        let ids = self.store.processing_ids().await;

        let results = join_all(ids.iter().map(|id| self.poll(id))).await;

        ids.into_iter().zip(results).collect()
    }

    /// 获取任务快照
    pub async fn task(&self, task_id: &str) -> AppResult<Task> {
        self.store
            .snapshot(task_id)
            .await
            .ok_or_else(|| AppError::task_not_found(task_id))
    }

    /// 按插入顺序返回全部任务
    pub async fn tasks(&self) -> Vec<Task> {
        self.store.list().await
    }
}
