/// 工作流 API 客户端
///
/// 封装提交运行与查询运行状态两个 HTTP 调用
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::gateway::{RunStatus, SubmitReceipt, WorkflowGateway};
use crate::config::Config;
use crate::error::{ConfigError, GatewayError};
use crate::models::request::GenerationRequest;

/// 工作流 API 客户端
pub struct WorkflowClient {
    http: Client,
    base_url: String,
    api_key: String,
    response_mode: String,
    output_key: String,
    timeout: Duration,
}

impl WorkflowClient {
    /// 创建新的工作流客户端，所有请求都带有超时
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            response_mode: config.response_mode.clone(),
            output_key: config.output_key.clone(),
            timeout: config.request_timeout(),
        })
    }

    /// 发送请求并读取 JSON 响应体，非 2xx 视为错误
    async fn send_json(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, GatewayError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(endpoint, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response.text().await);
            warn!("工作流 API 返回错误状态 {}: {}", status, body);
            return Err(GatewayError::BadStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| match GatewayError::from_reqwest(endpoint, self.timeout, e) {
                GatewayError::Transport { endpoint, source } => {
                    GatewayError::protocol(endpoint, format!("响应不是有效的 JSON: {}", source))
                }
                other => other,
            })
    }
}

/// 错误响应体，读取失败时记录失败原因
fn error_body(read: Result<String, reqwest::Error>) -> String {
    read.unwrap_or_else(|e| format!("<读取响应体失败: {}>", e))
}

#[async_trait]
impl WorkflowGateway for WorkflowClient {
    async fn submit(
        &self,
        request: &GenerationRequest,
        user_id: &str,
    ) -> Result<SubmitReceipt, GatewayError> {
        let endpoint = "/workflows/run";
        let payload = build_submit_payload(request, user_id, &self.response_mode);

        debug!("提交工作流: {}", payload);

        let body = self
            .send_json(
                endpoint,
                self.http
                    .post(format!("{}{}", self.base_url, endpoint))
                    .json(&payload),
            )
            .await?;

        let task_id = extract_run_id(&body)
            .ok_or_else(|| GatewayError::protocol(endpoint, "响应中缺少 workflow_run_id"))?;

        Ok(SubmitReceipt { task_id })
    }

    async fn status(&self, task_id: &str) -> Result<RunStatus, GatewayError> {
        let endpoint = format!("/workflows/run/{}", task_id);

        let body = self
            .send_json(
                &endpoint,
                self.http.get(format!("{}{}", self.base_url, endpoint)),
            )
            .await?;

        debug!("任务 {} 状态响应: {}", task_id, body);

        decode_run_status(&body, &self.output_key)
            .map_err(|message| GatewayError::protocol(endpoint, message))
    }
}

// ========== 辅助函数 ==========

/// 构建提交请求体，`count` 以字符串形式传递
fn build_submit_payload(request: &GenerationRequest, user_id: &str, response_mode: &str) -> Value {
    json!({
        "inputs": {
            "subject": request.subject.name(),
            "count": request.count.to_string(),
            "complexity": request.complexity.name(),
            "keywords": request.keywords,
            "question_type": request.question_type.name(),
        },
        "response_mode": response_mode,
        "user": user_id,
    })
}

/// 提取运行 ID：优先 `workflow_run_id`，其次 `data.id`
fn extract_run_id(body: &Value) -> Option<String> {
    body.get("workflow_run_id")
        .or_else(|| body.get("data").and_then(|d| d.get("id")))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// 解析运行状态响应，兼容顶层对象与 `data` 包装两种形式
fn decode_run_status(body: &Value, output_key: &str) -> Result<RunStatus, String> {
    let run = match body.get("data") {
        Some(data) if data.get("status").is_some() => data,
        _ => body,
    };

    let status = run
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "响应中缺少 status 字段".to_string())?;

    match status {
        "running" | "queued" | "pending" | "waiting" => Ok(RunStatus::Running),
        "succeeded" => Ok(RunStatus::Succeeded {
            output: extract_output(run.get("outputs"), output_key),
        }),
        "failed" | "stopped" => Ok(RunStatus::Failed {
            error_text: run
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
        }),
        other => Err(format!("未知的运行状态: {}", other)),
    }
}

/// outputs 可能是对象，也可能是 JSON 编码后的字符串
fn extract_output(outputs: Option<&Value>, output_key: &str) -> Option<String> {
    let value = match outputs? {
        Value::String(encoded) => serde_json::from_str::<Value>(encoded)
            .ok()?
            .get(output_key)?
            .clone(),
        Value::Object(map) => map.get(output_key)?.clone(),
        _ => return None,
    };

    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}
