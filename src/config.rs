use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, ValidationError};
use crate::models::request::GenerationRequest;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_FILE: &str = "question_gen.toml";

/// 程序配置
///
/// 加载顺序：默认值 → TOML 配置文件（可选）→ 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 工作流 API 配置 ---
    pub api_base_url: String,
    pub api_key: String,
    /// 上游要求的用户标识
    pub user_id: String,
    /// `blocking` 时提交接口会等待运行结束
    pub response_mode: String,
    /// 生成文本在 outputs 中的字段名
    pub output_key: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    // --- 轮询配置 ---
    pub poll_interval_secs: u64,
    pub max_poll_attempts: usize,
    /// 同时处理的任务数量
    pub max_concurrent_tasks: usize,
    /// 题目归档 CSV 文件
    pub archive_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 待生成的请求列表
    pub requests: Vec<RequestConfig>,
}

/// 配置文件中的单个生成请求（原始表单值）
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub subject: String,
    pub count: i64,
    pub complexity: String,
    pub keywords: String,
    pub question_type: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            subject: "Economics".to_string(),
            count: 10,
            complexity: "Easy".to_string(),
            keywords: "BB-Economics_part1 Keywords".to_string(),
            question_type: "Simple Statement MCQ".to_string(),
        }
    }
}

impl RequestConfig {
    /// 转换为经过校验的生成请求
    pub fn to_request(&self) -> Result<GenerationRequest, ValidationError> {
        GenerationRequest::from_raw(
            &self.subject,
            self.count,
            &self.complexity,
            &self.keywords,
            &self.question_type,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://testing.drishtigpt.com/v1".to_string(),
            api_key: String::new(),
            user_id: "abc-123".to_string(),
            response_mode: "blocking".to_string(),
            output_key: "result".to_string(),
            request_timeout_secs: 300,
            connect_timeout_secs: 10,
            poll_interval_secs: 5,
            max_poll_attempts: 60,
            max_concurrent_tasks: 4,
            archive_file: "questions.csv".to_string(),
            verbose_logging: false,
            requests: vec![RequestConfig::default()],
        }
    }
}

impl Config {
    /// 加载配置：配置文件（`QUESTION_GEN_CONFIG` 或默认路径，存在时）+ 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("QUESTION_GEN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let base = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        base.with_env_overrides()
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_string(),
            source,
        })?;

        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(v) = std::env::var("WORKFLOW_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Ok(v) = std::env::var("DIFY_API_KEY") {
            self.api_key = v;
        }
        if let Ok(v) = std::env::var("WORKFLOW_USER_ID") {
            self.user_id = v;
        }
        if let Ok(v) = std::env::var("WORKFLOW_RESPONSE_MODE") {
            self.response_mode = v;
        }
        if let Ok(v) = std::env::var("WORKFLOW_OUTPUT_KEY") {
            self.output_key = v;
        }
        if let Ok(v) = std::env::var("ARCHIVE_FILE") {
            self.archive_file = v;
        }
        if let Some(v) = env_parse("REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = env_parse("CONNECT_TIMEOUT_SECS")? {
            self.connect_timeout_secs = v;
        }
        if let Some(v) = env_parse("POLL_INTERVAL_SECS")? {
            self.poll_interval_secs = v;
        }
        if let Some(v) = env_parse("MAX_POLL_ATTEMPTS")? {
            self.max_poll_attempts = v;
        }
        if let Some(v) = env_parse("MAX_CONCURRENT_TASKS")? {
            self.max_concurrent_tasks = v;
        }
        if let Some(v) = env_parse("VERBOSE_LOGGING")? {
            self.verbose_logging = v;
        }

        // 任一表单字段出现在环境变量中时，只运行这一个请求
        let subject = std::env::var("QUESTION_SUBJECT").ok();
        let count = env_parse::<i64>("QUESTION_COUNT")?;
        let complexity = std::env::var("QUESTION_COMPLEXITY").ok();
        let keywords = std::env::var("QUESTION_KEYWORDS").ok();
        let question_type = std::env::var("QUESTION_TYPE").ok();

        if subject.is_some()
            || count.is_some()
            || complexity.is_some()
            || keywords.is_some()
            || question_type.is_some()
        {
            let default = RequestConfig::default();
            self.requests = vec![RequestConfig {
                subject: subject.unwrap_or(default.subject),
                count: count.unwrap_or(default.count),
                complexity: complexity.unwrap_or(default.complexity),
                keywords: keywords.unwrap_or(default.keywords),
                question_type: question_type.unwrap_or(default.question_type),
            }];
        }

        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn env_parse<T: FromStr>(var_name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_is_valid() {
        let config = Config::default();
        assert_eq!(config.requests.len(), 1);

        let request = config.requests[0].to_request().unwrap();
        assert_eq!(request.count, 10);
        assert_eq!(request.keywords, "BB-Economics_part1 Keywords");
    }

    #[test]
    fn test_toml_overrides_only_given_fields() {
        let config = Config::from_toml_str(
            r#"
            poll_interval_secs = 2
            archive_file = "out/history.csv"

            [[requests]]
            subject = "Polity"
            count = 3

            [[requests]]
            subject = "History"
            complexity = "Hard"
            question_type = "Match-the-Column"
            "#,
        )
        .unwrap();

        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.archive_file, "out/history.csv");
        assert_eq!(config.response_mode, "blocking");
        assert_eq!(config.requests.len(), 2);
        assert_eq!(config.requests[0].count, 3);
        assert_eq!(config.requests[0].complexity, "Easy");
        assert_eq!(config.requests[1].question_type, "Match-the-Column");
    }

    #[test]
    fn test_invalid_toml_reports_error() {
        assert!(Config::from_toml_str("poll_interval_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_env_overrides_output_key_and_connect_timeout() {
        std::env::set_var("WORKFLOW_OUTPUT_KEY", "text");
        std::env::set_var("CONNECT_TIMEOUT_SECS", "3");
        let config = Config::from_env().unwrap();
        assert_eq!(config.output_key, "text");
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));

        std::env::set_var("CONNECT_TIMEOUT_SECS", "soon");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvVarParseFailed { ref var_name, .. } if var_name == "CONNECT_TIMEOUT_SECS"
        ));

        std::env::remove_var("WORKFLOW_OUTPUT_KEY");
        std::env::remove_var("CONNECT_TIMEOUT_SECS");
    }
}
