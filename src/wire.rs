//! HTTP 请求 / 响应体
//!
//! 服务端（server 模块）与 HttpStepRunner 共用，保证两端字段一致。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentConfigOverride;
use crate::core::{ErrorKind, ExecutionResult, TaskContext};
use crate::history::ExecutionRecord;

/// POST /api/v1/agent/execute
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<TaskContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_config: Option<AgentConfigOverride>,
}

impl TaskRequest {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_config(mut self, over: AgentConfigOverride) -> Self {
        self.agent_config = Some(over);
        self
    }
}

/// POST /api/v1/agent/analyze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub data: String,
}

/// POST /api/v1/agent/generate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// execute / analyze / generate 的成功响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub status: String,
    pub result: ExecutionResult,
}

impl ExecuteResponse {
    pub fn success(result: ExecutionResult) -> Self {
        Self {
            status: "success".to_string(),
            result,
        }
    }
}

/// GET /api/v1/agent/history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub status: String,
    pub count: usize,
    pub history: Vec<ExecutionRecord>,
}

/// 错误响应体，不含调用栈
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub detail: String,
    /// 引擎错误类别；请求体解析失败等非引擎错误时缺省
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            detail: detail.into(),
            kind: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}
