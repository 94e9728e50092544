//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量请求的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量请求处理器
//! - 管理应用生命周期（初始化、运行、统计）
//! - 读回归档历史、导出新题目
//! - 控制并发数量（Semaphore）
//!
//! ### `task_runner` - 单个请求处理器
//! - 提交一个请求
//! - 按间隔轮询直到任务结束
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<GenerationRequest>)
//!     ↓
//! task_runner (处理单个请求)
//!     ↓
//! workflow::TaskLifecycleController (提交 / 轮询 / 状态迁移)
//!     ↓
//! services (能力层：解析 / 归档)  clients (工作流网关)
//!     ↓
//! infrastructure (基础设施：TaskStore)
//! ```

pub mod batch_processor;
pub mod task_runner;

// 重新导出主要类型
pub use batch_processor::{App, RunReport};
pub use task_runner::{run_request, wait_until_settled};
