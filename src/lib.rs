//! # Question Generator
//!
//! 向远程工作流引擎提交选择题生成请求，跟踪每个请求的异步任务，
//! 并把引擎返回的自由文本解析为结构化的选择题
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有共享资源，只暴露能力
//! - `TaskStore` - 唯一的任务持有者，按插入顺序保存，按 ID 查找
//!
//! ### ② 能力层（Services / Clients）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `parse_questions` - 题块解析能力
//! - `QuestionArchive` - CSV 归档读写能力
//! - `clients/` - `WorkflowGateway` 抽象及其 HTTP 实现 `WorkflowClient`
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个任务"的生命周期
//! - `TaskLifecycleController` - 提交 → 轮询 → 完成/失败
//! - `apply_run_status` - 状态迁移
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量请求处理器，管理资源和并发
//! - `orchestrator/task_runner` - 单个请求处理器，提交后按间隔轮询
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{RunStatus, SubmitReceipt, WorkflowClient, WorkflowGateway};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::TaskStore;
pub use models::{GenerationRequest, Question, Task, TaskStatus};
pub use orchestrator::{App, RunReport};
pub use services::{parse_questions, QuestionArchive};
pub use workflow::TaskLifecycleController;
