use std::time::Duration;

/// 应用程序错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 请求参数校验错误（发生在任何网络调用之前）
    #[error("请求校验失败: {0}")]
    Validation(#[from] ValidationError),
    /// 工作流网关错误
    #[error("工作流网关错误: {0}")]
    Gateway(#[from] GatewayError),
    /// 任务查找错误
    #[error("任务错误: {0}")]
    Lookup(#[from] LookupError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    /// 是否为可重试的暂时性错误（轮询时网关失败不会改变任务状态）
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Gateway(_))
    }
}

/// 生成请求校验错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// 题目数量超出范围
    #[error("题目数量 {count} 超出范围 [{min}, {max}]")]
    CountOutOfRange { count: i64, min: u8, max: u8 },
    /// 未知科目
    #[error("无法识别的科目: {value}")]
    UnknownSubject { value: String },
    /// 未知难度
    #[error("无法识别的难度: {value}")]
    UnknownComplexity { value: String },
    /// 未知题型
    #[error("无法识别的题型: {value}")]
    UnknownQuestionType { value: String },
}

/// 工作流网关错误
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 请求超时
    #[error("请求超时 ({endpoint}), 超时时间 {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
    /// 非成功的 HTTP 状态码
    #[error("返回错误状态 ({endpoint}): status={status}, body={body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 状态码成功但响应体缺少必要字段
    #[error("响应格式错误 ({endpoint}): {message}")]
    Protocol { endpoint: String, message: String },
}

impl GatewayError {
    /// 创建协议错误
    pub fn protocol(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Protocol {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// 将 reqwest 错误归类为超时或传输错误
    pub fn from_reqwest(endpoint: impl Into<String>, timeout: Duration, err: reqwest::Error) -> Self {
        let endpoint = endpoint.into();
        if err.is_timeout() {
            GatewayError::Timeout { endpoint, timeout }
        } else {
            GatewayError::Transport {
                endpoint,
                source: err,
            }
        }
    }
}

/// 任务存储相关错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// 任务不存在
    #[error("任务不存在: {task_id}")]
    TaskNotFound { task_id: String },
    /// 任务 ID 重复
    #[error("任务 ID 重复: {task_id}")]
    DuplicateTask { task_id: String },
}

/// 文件操作错误
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// CSV 读写失败
    #[error("CSV 处理失败 ({path}): {source}")]
    CsvFailed {
        path: String,
        #[source]
        source: csv::Error,
    },
    /// 归档行内容无效
    #[error("归档记录无效 ({path} 第 {row} 行): {message}")]
    InvalidRow {
        path: String,
        row: usize,
        message: String,
    },
}

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端构建失败: {0}")]
    HttpClient(#[source] reqwest::Error),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建任务不存在错误
    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        AppError::Lookup(LookupError::TaskNotFound {
            task_id: task_id.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
