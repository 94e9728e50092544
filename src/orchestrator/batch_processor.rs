//! 批量请求处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量生成请求的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建工作流客户端、任务存储与控制器
//! 2. **历史恢复**：启动时读回归档中的历史题目，无效记录跳过不影响本次运行
//! 3. **并发控制**：使用 Semaphore 限制同时处理的任务数量
//! 4. **收尾轮询**：对仍在处理中的任务并发再轮询一次
//! 5. **归档导出**：按提交顺序把完成任务的题目追加到 CSV
//! 6. **全局统计**：汇总所有任务的处理结果

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::{WorkflowClient, WorkflowGateway};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::task_store::{StoreSummary, TaskStore};
use crate::models::request::GenerationRequest;
use crate::models::task::TaskStatus;
use crate::orchestrator::task_runner;
use crate::services::question_archive::{ArchivedQuestion, QuestionArchive};
use crate::utils::logging::{
    log_history_loaded, log_requests_loaded, log_startup, print_final_stats,
};
use crate::workflow::TaskLifecycleController;

/// 一次运行的统计结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// 各状态任务数量
    pub summary: StoreSummary,
    /// 校验失败或提交失败、未创建任务的请求数
    pub rejected: usize,
    /// 本次写入归档的题目数
    pub exported: usize,
    /// 启动时从归档恢复的历史题目
    pub history: Vec<ArchivedQuestion>,
    /// 归档中被跳过的无效记录数
    pub skipped_history: usize,
}

/// 应用主结构
pub struct App {
    config: Config,
    controller: Arc<TaskLifecycleController>,
    archive: QuestionArchive,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);

        let gateway = WorkflowClient::new(&config)?;
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    /// 使用指定网关创建应用
    pub fn with_gateway(config: Config, gateway: Arc<dyn WorkflowGateway>) -> Self {
        let controller = Arc::new(TaskLifecycleController::new(
            TaskStore::new(),
            gateway,
            config.user_id.clone(),
        ));
        let archive = QuestionArchive::new(&config.archive_file);

        Self {
            config,
            controller,
            archive,
        }
    }

    pub fn controller(&self) -> &Arc<TaskLifecycleController> {
        &self.controller
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> AppResult<RunReport> {
        let loaded = self.archive.load()?;
        log_history_loaded(&loaded.questions, loaded.skipped.len(), &self.config.archive_file);
        let mut report = RunReport {
            history: loaded.questions,
            skipped_history: loaded.skipped.len(),
            ..Default::default()
        };

        // 解析配置中的请求，无效请求直接计入未提交
        let mut requests = Vec::new();
        for (idx, raw) in self.config.requests.iter().enumerate() {
            match raw.to_request() {
                Ok(request) => requests.push((idx + 1, request)),
                Err(e) => {
                    error!("[请求 {}] ❌ 请求无效: {}", idx + 1, e);
                    report.rejected += 1;
                }
            }
        }

        if requests.is_empty() {
            warn!("⚠️ 没有可提交的请求，程序结束");
            report.summary = self.controller.store().summary().await;
            return Ok(report);
        }

        log_requests_loaded(requests.len(), self.config.max_concurrent_tasks);

        report.rejected += self.process_all_requests(requests).await;

        self.sweep_processing().await;

        report.exported = self.export_completed().await?;
        report.summary = self.controller.store().summary().await;

        print_final_stats(
            &report.summary,
            &report.history,
            report.rejected,
            report.exported,
            &self.config.archive_file,
        );

        Ok(report)
    }

    /// 并发处理所有请求，返回未能创建任务的请求数
    async fn process_all_requests(&self, requests: Vec<(usize, GenerationRequest)>) -> usize {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_tasks.max(1)));
        let mut handles = Vec::new();

        for (request_index, request) in requests {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("[请求 {}] 无法获取并发许可: {}", request_index, e);
                    continue;
                }
            };

            let controller = self.controller.clone();
            let config = self.config.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                task_runner::run_request(&controller, request, request_index, &config).await
            });
            handles.push((request_index, handle));
        }

        let mut rejected = 0;
        for (request_index, handle) in handles {
            match handle.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    // 轮询错误在 run_request 内部消化，这里只会是提交阶段的错误
                    error!("[请求 {}] ❌ 提交失败: {}", request_index, e);
                    rejected += 1;
                }
                Err(e) => {
                    error!("[请求 {}] 任务执行失败: {}", request_index, e);
                    rejected += 1;
                }
            }
        }

        rejected
    }

    /// 对仍在处理中的任务并发轮询一次
    async fn sweep_processing(&self) {
        for (task_id, result) in self.controller.poll_processing().await {
            match result {
                Ok(task) if task.status.is_terminal() => {
                    info!("[任务 {}] 收尾轮询时进入 {}", task_id, task.status)
                }
                Ok(_) => warn!("[任务 {}] ⏳ 仍在处理中，本次运行不再等待", task_id),
                Err(e) => warn!("[任务 {}] 收尾轮询失败: {}", task_id, e),
            }
        }
    }

    /// 按提交顺序导出已完成任务的题目
    async fn export_completed(&self) -> AppResult<usize> {
        let mut exported = 0;
        for task in self.controller.tasks().await {
            if task.status == TaskStatus::Completed {
                exported += self.archive.append_task(&task)?;
            }
        }
        Ok(exported)
    }
}
