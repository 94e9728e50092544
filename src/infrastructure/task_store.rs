//! 任务存储 - 基础设施层
//!
//! 唯一持有所有 `Task` 的地方，按插入顺序展示，按 ID 查找

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::LookupError;
use crate::models::task::{Task, TaskStatus};

/// 单个任务的共享句柄
///
/// 持有锁期间对任务的读-改-写是原子的；不同任务的锁互不影响。
pub type TaskHandle = Arc<Mutex<Task>>;

#[derive(Default)]
struct Index {
    by_id: HashMap<String, TaskHandle>,
    order: Vec<String>,
}

/// 各状态的任务数量
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreSummary {
    pub processing: usize,
    pub completed: usize,
    pub completed_empty: usize,
    pub failed: usize,
    pub questions: usize,
}

impl StoreSummary {
    pub fn total(&self) -> usize {
        self.processing + self.completed + self.completed_empty + self.failed
    }
}

/// 任务存储
///
/// 只追加，不删除；会话结束时随之丢弃或导出到归档文件。
#[derive(Default)]
pub struct TaskStore {
    index: RwLock<Index>,
}

impl TaskStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 插入新任务，ID 重复时拒绝
    pub async fn insert(&self, task: Task) -> Result<TaskHandle, LookupError> {
        let mut index = self.index.write().await;

        if index.by_id.contains_key(&task.id) {
            return Err(LookupError::DuplicateTask { task_id: task.id });
        }

        let id = task.id.clone();
        let handle = Arc::new(Mutex::new(task));
        index.by_id.insert(id.clone(), handle.clone());
        index.order.push(id.clone());

        debug!("任务 {} 已加入存储，共 {} 个任务", id, index.order.len());

        Ok(handle)
    }

    /// 获取任务句柄
    pub async fn get(&self, task_id: &str) -> Option<TaskHandle> {
        self.index.read().await.by_id.get(task_id).cloned()
    }

    /// 获取任务快照
    pub async fn snapshot(&self, task_id: &str) -> Option<Task> {
        let handle = self.get(task_id).await?;
        let task = handle.lock().await;
        Some(task.clone())
    }

    /// 按插入顺序返回全部任务快照
    pub async fn list(&self) -> Vec<Task> {
        let mut tasks = Vec::new();
        for handle in self.handles().await {
            tasks.push(handle.lock().await.clone());
        }
        tasks
    }

    /// 仍在处理中的任务 ID（按插入顺序）
    pub async fn processing_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for handle in self.handles().await {
            let task = handle.lock().await;
            if task.status == TaskStatus::Processing {
                ids.push(task.id.clone());
            }
        }
        ids
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 统计各状态数量
    pub async fn summary(&self) -> StoreSummary {
        let mut summary = StoreSummary::default();
        for task in self.list().await {
            match task.status {
                TaskStatus::Pending | TaskStatus::Processing => summary.processing += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::CompletedEmpty => summary.completed_empty += 1,
                TaskStatus::Failed => summary.failed += 1,
            }
            summary.questions += task.questions.len();
        }
        summary
    }

    /// 先复制句柄再释放索引锁，避免在持有索引锁时等待任务锁
    async fn handles(&self) -> Vec<TaskHandle> {
        let index = self.index.read().await;
        index
            .order
            .iter()
            .filter_map(|id| index.by_id.get(id).cloned())
            .collect()
    }
}
