use serde::{Deserialize, Serialize};
use std::fmt;

/// 每道选择题固定的选项数量
pub const OPTION_COUNT: usize = 4;

/// 结构化的单选题
///
/// `correct_option` 始终保存选项的原文，而不是 "A" 之类的标号。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: [String; OPTION_COUNT],
    pub correct_option: String,
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    /// 正确选项在 `options` 中的位置
    pub fn correct_index(&self) -> Option<usize> {
        self.options.iter().position(|o| *o == self.correct_option)
    }
}

/// 题块被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorReason {
    /// 缺少 `Question:` 行
    MissingQuestion,
    /// `Question:` 后没有内容
    EmptyQuestion,
    /// 缺少 `Correct Answer:` 行
    MissingCorrectAnswer,
    /// 选项数量不是 4
    OptionCountMismatch,
    /// 某个选项去掉标号后为空
    EmptyOption,
    /// 正确答案无法对应到任何选项
    UnresolvedCorrectAnswer,
}

impl ParseErrorReason {
    /// 稳定的错误代码
    pub fn code(self) -> &'static str {
        match self {
            ParseErrorReason::MissingQuestion => "missing_question",
            ParseErrorReason::EmptyQuestion => "empty_question",
            ParseErrorReason::MissingCorrectAnswer => "missing_correct_answer",
            ParseErrorReason::OptionCountMismatch => "option_count_mismatch",
            ParseErrorReason::EmptyOption => "empty_option",
            ParseErrorReason::UnresolvedCorrectAnswer => "unresolved_correct_answer",
        }
    }
}

impl fmt::Display for ParseErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 单个题块的解析错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    /// 题块序号（从 0 开始，只统计非空题块）
    pub block_index: usize,
    pub reason: ParseErrorReason,
    /// 便于排查的补充说明
    pub detail: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "题块 #{} 被跳过: {}", self.block_index, self.reason)?;
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}
