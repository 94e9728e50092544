/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::task_store::StoreSummary;
use crate::models::request::{GenerationRequest, Subject};
use crate::models::task::{Task, TaskStatus};
use crate::services::question_archive::ArchivedQuestion;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题目生成任务模式");
    info!("🌐 工作流地址: {}", config.api_base_url);
    info!("📊 最大并发数: {}", config.max_concurrent_tasks);
    info!(
        "⏱️ 轮询间隔: {} 秒, 最多 {} 次",
        config.poll_interval_secs, config.max_poll_attempts
    );
    info!("{}", "=".repeat(60));
}

/// 记录历史归档加载信息
pub fn log_history_loaded(history: &[ArchivedQuestion], skipped: usize, archive_path: &str) {
    if history.is_empty() {
        info!("📁 归档 {} 中暂无历史题目", archive_path);
    } else {
        info!(
            "📁 从 {} 恢复了 {} 道历史题目 ({})",
            archive_path,
            history.len(),
            subject_breakdown(history)
        );
    }
    if skipped > 0 {
        warn!("⚠️ 归档中有 {} 条无效记录已跳过", skipped);
    }
}

/// 记录请求加载信息
pub fn log_requests_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待生成的请求", total);
    info!("📋 最多同时处理 {} 个任务\n", max_concurrent);
}

/// 记录单个请求开始
pub fn log_task_start(request_index: usize, request: &GenerationRequest) {
    info!("\n[请求 {}] {}", request_index, "─".repeat(30));
    info!("[请求 {}] 开始生成 {}", request_index, request);
    if !request.keywords.is_empty() {
        info!(
            "[请求 {}] 关键词: {}",
            request_index,
            truncate_text(&request.keywords, 60)
        );
    }
}

/// 记录单个任务结束
pub fn log_task_complete(request_index: usize, task: &Task) {
    match task.status {
        TaskStatus::Completed => {
            info!(
                "[请求 {}] ✅ 任务 {} 完成: {} 道题, {} 个题块被跳过",
                request_index,
                task.id,
                task.questions.len(),
                task.parse_errors.len()
            );
            if let Some(first) = task.questions.first() {
                info!(
                    "[请求 {}] 首题: {}",
                    request_index,
                    truncate_text(&first.text, 80)
                );
            }
        }
        TaskStatus::CompletedEmpty => {
            warn!(
                "[请求 {}] ⚠️ 任务 {} 完成但没有解析出题目",
                request_index, task.id
            );
        }
        TaskStatus::Failed => {
            let reason = task
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();
            warn!("[请求 {}] ❌ 任务 {} 失败: {}", request_index, task.id, reason);
        }
        TaskStatus::Pending | TaskStatus::Processing => {
            warn!(
                "[请求 {}] ⏳ 任务 {} 仍在处理中，已停止轮询",
                request_index, task.id
            );
        }
    }
}

/// 打印最终统计信息
pub fn print_final_stats(
    summary: &StoreSummary,
    history: &[ArchivedQuestion],
    rejected: usize,
    exported: usize,
    archive_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 完成: {}/{}", summary.completed, summary.total());
    info!("📭 无题目: {}", summary.completed_empty);
    info!("❌ 失败: {}", summary.failed);
    info!("⏳ 未结束: {}", summary.processing);
    info!("🚫 未提交: {}", rejected);
    info!("📝 本次题目: {}", summary.questions);
    if !history.is_empty() {
        info!("📚 历史题目: {} ({})", history.len(), subject_breakdown(history));
    }
    info!("{}", "=".repeat(60));
    info!("\n{} 道题已归档至: {}", exported, archive_path);
}

/// 按科目统计题目数，例如 `Economics 3, History 1`
pub fn subject_breakdown(history: &[ArchivedQuestion]) -> String {
    Subject::ALL
        .iter()
        .filter_map(|subject| {
            let count = history.iter().filter(|q| q.subject == *subject).count();
            (count > 0).then(|| format!("{} {}", subject, count))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
