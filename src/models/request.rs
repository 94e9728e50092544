//! 生成请求模型
//!
//! 表单收集到的字段在这里被解析为强类型的 `GenerationRequest`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// 单次请求允许的最小题目数量
pub const MIN_COUNT: u8 = 1;
/// 单次请求允许的最大题目数量
pub const MAX_COUNT: u8 = 15;

/// 科目枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Economics,
    Geography,
    History,
    #[serde(rename = "Miscellaneous- Factual, Static GK")]
    Miscellaneous,
    Polity,
}

impl Subject {
    /// 全部科目（与表单下拉框顺序一致）
    pub const ALL: [Subject; 5] = [
        Subject::Economics,
        Subject::Geography,
        Subject::History,
        Subject::Miscellaneous,
        Subject::Polity,
    ];

    /// 获取上游工作流使用的名称
    pub fn name(self) -> &'static str {
        match self {
            Subject::Economics => "Economics",
            Subject::Geography => "Geography",
            Subject::History => "History",
            Subject::Miscellaneous => "Miscellaneous- Factual, Static GK",
            Subject::Polity => "Polity",
        }
    }
}

impl FromStr for Subject {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Subject::ALL
            .into_iter()
            .find(|subject| subject.name() == trimmed)
            .ok_or_else(|| ValidationError::UnknownSubject {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 难度枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Complexity {
    Easy,
    Medium,
    Hard,
}

impl Complexity {
    pub const ALL: [Complexity; 3] = [Complexity::Easy, Complexity::Medium, Complexity::Hard];

    pub fn name(self) -> &'static str {
        match self {
            Complexity::Easy => "Easy",
            Complexity::Medium => "Medium",
            Complexity::Hard => "Hard",
        }
    }
}

impl FromStr for Complexity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Complexity::ALL
            .into_iter()
            .find(|c| c.name() == trimmed)
            .ok_or_else(|| ValidationError::UnknownComplexity {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 题型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "Simple Statement MCQ")]
    SimpleStatement,
    #[serde(rename = "Fill-in-the-Blanks MCQ")]
    FillInTheBlanks,
    #[serde(rename = "Match-the-Column")]
    MatchTheColumn,
    #[serde(rename = "Multi-Statement Validation")]
    MultiStatementValidation,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::SimpleStatement,
        QuestionType::FillInTheBlanks,
        QuestionType::MatchTheColumn,
        QuestionType::MultiStatementValidation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            QuestionType::SimpleStatement => "Simple Statement MCQ",
            QuestionType::FillInTheBlanks => "Fill-in-the-Blanks MCQ",
            QuestionType::MatchTheColumn => "Match-the-Column",
            QuestionType::MultiStatementValidation => "Multi-Statement Validation",
        }
    }
}

impl FromStr for QuestionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        QuestionType::ALL
            .into_iter()
            .find(|t| t.name() == trimmed)
            .ok_or_else(|| ValidationError::UnknownQuestionType {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 题目生成请求
///
/// 由用户输入构建，之后不再修改。`count` 保持为宽类型，
/// 以便在提交前由 [`GenerationRequest::validate`] 给出明确的范围错误。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub subject: Subject,
    pub count: i64,
    pub complexity: Complexity,
    pub keywords: String,
    pub question_type: QuestionType,
}

impl GenerationRequest {
    /// 从已解析的字段创建请求（会校验数量范围）
    pub fn new(
        subject: Subject,
        count: i64,
        complexity: Complexity,
        keywords: impl Into<String>,
        question_type: QuestionType,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            subject,
            count,
            complexity,
            keywords: keywords.into(),
            question_type,
        };
        request.validate()?;
        Ok(request)
    }

    /// 从表单原始字符串创建请求
    pub fn from_raw(
        subject: &str,
        count: i64,
        complexity: &str,
        keywords: &str,
        question_type: &str,
    ) -> Result<Self, ValidationError> {
        Self::new(
            subject.parse()?,
            count,
            complexity.parse()?,
            keywords,
            question_type.parse()?,
        )
    }

    /// 校验请求不变量
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.count < i64::from(MIN_COUNT) || self.count > i64::from(MAX_COUNT) {
            return Err(ValidationError::CountOutOfRange {
                count: self.count,
                min: MIN_COUNT,
                max: MAX_COUNT,
            });
        }
        Ok(())
    }
}

impl fmt::Display for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} x{} {} | {}]",
            self.subject, self.count, self.complexity, self.question_type
        )
    }
}
