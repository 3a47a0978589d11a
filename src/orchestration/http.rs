//! HTTP 步骤执行器
//!
//! 每个步骤调用一次 POST {base_url}/api/v1/agent/execute：
//! 400 → 调用方错误（按响应中的 kind 还原，不重试），5xx → AgentInternalError，网络错误 → Transport。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::OrchestrationSection;
use crate::core::{EngineError, ErrorKind, ExecutionResult};
use crate::orchestration::{Step, StepRunner};
use crate::wire::{ErrorResponse, ExecuteResponse, TaskRequest};

pub const EXECUTE_PATH: &str = "/api/v1/agent/execute";

pub struct HttpStepRunner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStepRunner {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(cfg: &OrchestrationSection) -> Result<Self, EngineError> {
        Self::new(
            cfg.base_url.clone(),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, EXECUTE_PATH)
    }
}

fn request_for(step: &Step) -> TaskRequest {
    TaskRequest {
        task: step.task.clone(),
        context: step.context.clone(),
        agent_config: step.effective_override(),
    }
}

#[async_trait]
impl StepRunner for HttpStepRunner {
    async fn run_step(&self, step: &Step) -> Result<ExecutionResult, EngineError> {
        let resp = self
            .client
            .post(self.endpoint())
            .json(&request_for(step))
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            let body: ExecuteResponse = resp
                .json()
                .await
                .map_err(|e| EngineError::Transport(format!("invalid response body: {e}")))?;
            return body.result.into_result();
        }

        let (detail, kind) = match resp.json::<ErrorResponse>().await {
            Ok(err) => (err.detail, err.kind),
            Err(_) => (status.to_string(), None),
        };
        Err(map_error_status(status, &detail, kind))
    }
}

/// 非 2xx 响应 → EngineError；4xx 时按 kind 还原具体的调用方错误
fn map_error_status(status: StatusCode, detail: &str, kind: Option<ErrorKind>) -> EngineError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => kind
            .and_then(|k| EngineError::caller_error_from(k, detail))
            .unwrap_or_else(|| EngineError::InvalidTask(detail.to_string())),
        s if s.is_server_error() => EngineError::AgentInternalError(detail.to_string()),
        _ => EngineError::Transport(format!("{status}: {detail}")),
    }
}
