//! 执行结果信封
//!
//! TaskExecutor 把 AgentOutcome 规范化为统一信封：{status, task, response, agent, model, context_provided, timestamp}。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Error,
}

/// 单次执行的规范化结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ResultStatus,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Agent 报告失败时的类别（如 "processing_error"、"timeout"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub agent: String,
    pub model: String,
    pub context_provided: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_keys: Option<Vec<String>>,
    /// Agent 回复中的附加字段
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub duration_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// 将 Agent 报告的失败转为 AgentInternalError；成功则原样返回
    pub fn into_result(self) -> Result<ExecutionResult, EngineError> {
        match self.status {
            ResultStatus::Success => Ok(self),
            ResultStatus::Error => Err(EngineError::AgentInternalError(
                self.error.unwrap_or_else(|| "agent reported an error".to_string()),
            )),
        }
    }
}
