//! 引擎错误类型
//!
//! 调用方错误（InvalidTask / UnknownAgent / DuplicateAgentName / InvalidConfig / UnroutedInput）立即返回、不重试；
//! 执行错误（ExecutionTimeout / AgentInternalError / Transport）写入执行历史，在重试算法下可重试。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 任务执行与编排过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Duplicate agent name: {0}")]
    DuplicateAgentName(String),

    /// 配置越界（拒绝，不做截断）
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Agent '{agent}' timed out after {timeout_secs}s")]
    ExecutionTimeout { agent: String, timeout_secs: u64 },

    /// Agent 在自身结果中报告的失败
    #[error("Agent internal error: {0}")]
    AgentInternalError(String),

    #[error("Retry exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        last: Box<EngineError>,
    },

    #[error("Unrouted input: {0}")]
    UnroutedInput(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// fail-fast 扇出中被取消的兄弟任务
    #[error("Cancelled")]
    Cancelled,

    /// HTTP 步骤执行器的网络错误
    #[error("Transport error: {0}")]
    Transport(String),
}

/// 错误类别标签，用于日志与序列化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidTask,
    UnknownAgent,
    DuplicateAgentName,
    InvalidConfig,
    ExecutionTimeout,
    AgentInternalError,
    RetryExhausted,
    UnroutedInput,
    PersistenceError,
    Cancelled,
    Transport,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidTask(_) => ErrorKind::InvalidTask,
            EngineError::UnknownAgent(_) => ErrorKind::UnknownAgent,
            EngineError::DuplicateAgentName(_) => ErrorKind::DuplicateAgentName,
            EngineError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            EngineError::ExecutionTimeout { .. } => ErrorKind::ExecutionTimeout,
            EngineError::AgentInternalError(_) => ErrorKind::AgentInternalError,
            EngineError::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            EngineError::UnroutedInput(_) => ErrorKind::UnroutedInput,
            EngineError::PersistenceError(_) => ErrorKind::PersistenceError,
            EngineError::Cancelled => ErrorKind::Cancelled,
            EngineError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// 调用方错误：HTTP 层映射为 400，编排层不重试
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidTask(_)
                | EngineError::UnknownAgent(_)
                | EngineError::DuplicateAgentName(_)
                | EngineError::InvalidConfig(_)
                | EngineError::UnroutedInput(_)
        )
    }

    /// 由 HTTP 错误响应还原调用方错误；detail 为 Display 文本，去掉类别前缀后作为载荷
    pub fn caller_error_from(kind: ErrorKind, detail: &str) -> Option<EngineError> {
        let message = detail
            .split_once(": ")
            .map(|(_, m)| m)
            .unwrap_or(detail)
            .to_string();
        match kind {
            ErrorKind::InvalidTask => Some(EngineError::InvalidTask(message)),
            ErrorKind::UnknownAgent => Some(EngineError::UnknownAgent(message)),
            ErrorKind::DuplicateAgentName => Some(EngineError::DuplicateAgentName(message)),
            ErrorKind::InvalidConfig => Some(EngineError::InvalidConfig(message)),
            ErrorKind::UnroutedInput => Some(EngineError::UnroutedInput(message)),
            _ => None,
        }
    }

    /// 重试算法可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::ExecutionTimeout { .. }
                | EngineError::AgentInternalError(_)
                | EngineError::Transport(_)
        )
    }
}
