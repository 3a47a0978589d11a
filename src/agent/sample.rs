//! 示例 Agent（模板用）
//!
//! 模拟一段处理耗时后回显任务；可在此处接入真实模型推理。提供 analyze / generate 两个便捷入口。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{Agent, AgentConfig, AgentOutcome, AgentReply};
use crate::core::TaskContext;

/// 默认模拟处理耗时
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(500);

/// 示例 Agent：返回 "Processed task: <task>"
pub struct SampleAgent {
    config: AgentConfig,
    delay: Duration,
}

impl SampleAgent {
    pub fn new(config: AgentConfig) -> Self {
        tracing::info!(agent = %config.name, model = %config.model, "Initialized agent");
        Self {
            config,
            delay: DEFAULT_PROCESSING_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 注册表使用的工厂
    pub fn factory() -> impl Fn(AgentConfig) -> Arc<dyn Agent> + Send + Sync + 'static {
        Self::factory_with_delay(DEFAULT_PROCESSING_DELAY)
    }

    pub fn factory_with_delay(
        delay: Duration,
    ) -> impl Fn(AgentConfig) -> Arc<dyn Agent> + Send + Sync + 'static {
        move |cfg| Arc::new(SampleAgent::new(cfg).with_delay(delay)) as Arc<dyn Agent>
    }
}

/// 分析任务：task = "Analyze: <data>"，附带 operation 上下文
pub fn analyze_request(data: &str) -> (String, TaskContext) {
    (format!("Analyze: {data}"), operation_context("analyze"))
}

/// 生成任务：task = "Generate: <prompt>"
pub fn generate_request(prompt: &str) -> (String, TaskContext) {
    (format!("Generate: {prompt}"), operation_context("generate"))
}

fn operation_context(op: &str) -> TaskContext {
    let mut ctx = TaskContext::new();
    ctx.insert("operation".to_string(), Value::String(op.to_string()));
    ctx
}

#[async_trait]
impl Agent for SampleAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    async fn execute(&self, task: &str, context: Option<&TaskContext>) -> AgentOutcome {
        tracing::info!(agent = %self.config.name, "Executing task: {}", task);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut reply = AgentReply::new(format!("Processed task: {task}"))
            .with("temperature", json!(self.config.temperature));
        if let Some(op) = context.and_then(|c| c.get("operation")) {
            reply = reply.with("operation", op.clone());
        }
        AgentOutcome::Success(reply)
    }
}
