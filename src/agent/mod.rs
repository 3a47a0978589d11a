//! Agent 契约与注册表
//!
//! 所有 Agent 实现 Agent trait（name / config / execute），由 AgentRegistry 按名注册工厂、按请求解析实例；
//! execute 不允许向外抛错，内部失败以 AgentOutcome::Failure 返回。

pub mod config;
pub mod registry;
pub mod sample;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::TaskContext;

pub use config::{AgentConfig, AgentConfigOverride};
pub use registry::{AgentFactory, AgentRegistry};
pub use sample::{analyze_request, generate_request, SampleAgent};

/// Agent 成功时的回复：主文本 + 附加字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReply {
    pub response: String,
    pub data: Map<String, Value>,
}

impl AgentReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            data: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// Agent 执行结果：成功载荷或带类别的失败
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome {
    Success(AgentReply),
    Failure { kind: String, message: String },
}

impl AgentOutcome {
    pub fn success(response: impl Into<String>) -> Self {
        AgentOutcome::Success(AgentReply::new(response))
    }

    pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        AgentOutcome::Failure {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AgentOutcome::Success(_))
    }
}

/// Agent trait：构造时不做 I/O，execute 在调用方给定的期限内返回
#[async_trait]
pub trait Agent: Send + Sync {
    /// 注册名（执行历史中的 agent 字段）
    fn name(&self) -> &str;

    /// 构造时使用的配置快照
    fn config(&self) -> &AgentConfig;

    /// 执行任务；context 为 None 表示调用方未提供上下文
    async fn execute(&self, task: &str, context: Option<&TaskContext>) -> AgentOutcome;
}
