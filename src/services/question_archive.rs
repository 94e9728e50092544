//! 题目归档服务 - 业务能力层
//!
//! 只负责"把题目追加写入 CSV / 启动时读回"能力，不关心任务流程
//!
//! 列顺序是与外部表格互通的约定，不能改动：
//! `Timestamp, Subject, Question, Option 1-4, Correct Option, Explanation`

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::FileError;
use crate::models::question::Question;
use crate::models::request::Subject;
use crate::models::task::Task;

/// 归档文件列名
pub const ARCHIVE_COLUMNS: [&str; 9] = [
    "Timestamp",
    "Subject",
    "Question",
    "Option 1",
    "Option 2",
    "Option 3",
    "Option 4",
    "Correct Option",
    "Explanation",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 归档文件中的一行（一道题）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Option 1")]
    pub option_1: String,
    #[serde(rename = "Option 2")]
    pub option_2: String,
    #[serde(rename = "Option 3")]
    pub option_3: String,
    #[serde(rename = "Option 4")]
    pub option_4: String,
    #[serde(rename = "Correct Option")]
    pub correct_option: String,
    #[serde(rename = "Explanation")]
    pub explanation: String,
}

impl ArchiveRow {
    /// 把任务中的题目展开为表格行
    pub fn from_task(task: &Task) -> Vec<Self> {
        let timestamp = task.created_at.format(TIMESTAMP_FORMAT).to_string();
        task.questions
            .iter()
            .map(|q| {
                let [option_1, option_2, option_3, option_4] = q.options.clone();
                Self {
                    timestamp: timestamp.clone(),
                    subject: task.request.subject.name().to_string(),
                    question: q.text.clone(),
                    option_1,
                    option_2,
                    option_3,
                    option_4,
                    correct_option: q.correct_option.clone(),
                    explanation: q.explanation.clone(),
                }
            })
            .collect()
    }

    fn into_question(self) -> Result<(String, Subject, Question), String> {
        let subject: Subject = self.subject.parse().map_err(|e| format!("{}", e))?;

        let question = Question {
            text: self.question,
            options: [self.option_1, self.option_2, self.option_3, self.option_4],
            correct_option: self.correct_option,
            explanation: self.explanation,
        };

        if question.correct_index().is_none() {
            return Err(format!(
                "正确选项 '{}' 不在选项中",
                question.correct_option
            ));
        }

        Ok((self.timestamp, subject, question))
    }
}

/// 从归档读回的题目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedQuestion {
    pub timestamp: String,
    pub subject: Subject,
    pub question: Question,
}

/// 读回的归档内容
#[derive(Debug, Default)]
pub struct LoadedArchive {
    pub questions: Vec<ArchivedQuestion>,
    /// 被跳过的无效行
    pub skipped: Vec<FileError>,
}

/// 题目归档
///
/// 职责：
/// - 追加写入已完成任务的题目
/// - 启动时读回历史题目
pub struct QuestionArchive {
    path: PathBuf,
}

impl QuestionArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加任务中的全部题目，返回写入的行数
    ///
    /// 文件不存在或为空时先写表头
    pub fn append_task(&self, task: &Task) -> Result<usize, FileError> {
        let rows = ArchiveRow::from_task(task);
        if rows.is_empty() {
            debug!("任务 {} 没有题目，跳过归档", task.id);
            return Ok(0);
        }

        let path = self.path_string();
        let write_failed = |source| FileError::WriteFailed {
            path: path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_failed)?;
        let needs_header = file.metadata().map_err(write_failed)?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        for row in &rows {
            writer.serialize(row).map_err(|source| FileError::CsvFailed {
                path: path.clone(),
                source,
            })?;
        }
        writer.flush().map_err(write_failed)?;

        info!("💾 任务 {} 的 {} 道题已写入 {}", task.id, rows.len(), path);

        Ok(rows.len())
    }

    /// 读回归档中的全部题目，文件不存在时返回空结果
    ///
    /// 表头不匹配或文件无法读取时返回错误；单行无效时跳过该行并记录在 `skipped` 中
    pub fn load(&self) -> Result<LoadedArchive, FileError> {
        if !self.path.exists() {
            debug!("归档文件 {} 不存在，视为空", self.path.display());
            return Ok(LoadedArchive::default());
        }

        let path = self.path_string();
        let csv_failed = |source| FileError::CsvFailed {
            path: path.clone(),
            source,
        };

        let mut reader = csv::Reader::from_path(&self.path).map_err(csv_failed)?;

        let headers = reader.headers().map_err(csv_failed)?;
        if headers.iter().ne(ARCHIVE_COLUMNS.iter().copied()) {
            return Err(FileError::InvalidRow {
                path: path.clone(),
                row: 1,
                message: format!("表头不匹配: {:?}", headers),
            });
        }

        let mut loaded = LoadedArchive::default();
        for (index, row) in reader.deserialize::<ArchiveRow>().enumerate() {
            // 第 1 行是表头
            let row_number = index + 2;
            let parsed = match row {
                Ok(row) => row.into_question(),
                Err(e) if e.is_io_error() => return Err(csv_failed(e)),
                Err(e) => Err(e.to_string()),
            };

            match parsed {
                Ok((timestamp, subject, question)) => loaded.questions.push(ArchivedQuestion {
                    timestamp,
                    subject,
                    question,
                }),
                Err(message) => {
                    let error = FileError::InvalidRow {
                        path: path.clone(),
                        row: row_number,
                        message,
                    };
                    warn!("⚠️ 跳过归档记录: {}", error);
                    loaded.skipped.push(error);
                }
            }
        }

        Ok(loaded)
    }

    fn path_string(&self) -> String {
        self.path.display().to_string()
    }
}
