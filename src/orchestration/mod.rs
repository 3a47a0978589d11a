//! 编排客户端：把多次 TaskExecutor 调用组合成工作流
//!
//! 四种算法：顺序链（chain）、指数退避重试（retry）、有界并发扇出（fanout）、条件路由（router）。
//! 步骤通过 StepRunner 执行：进程内（AgentEngine）或经 HTTP（HttpStepRunner）。

pub mod chain;
pub mod client;
pub mod fanout;
pub mod http;
pub mod retry;
pub mod router;
pub mod types;
pub mod workflow;

use async_trait::async_trait;

use crate::core::{EngineError, ExecutionResult};

pub use chain::run_chain;
pub use client::OrchestrationClient;
pub use fanout::{fan_out, FanOutMode};
pub use http::HttpStepRunner;
pub use retry::{run_with_retry, Jitter, RetryPolicy};
pub use router::StepRouter;
pub use types::{OrchestrationRun, RunStatus, Step, StepOutcome, StepResult, StepState};
pub use workflow::Workflow;

/// 执行单个步骤（一次 TaskExecutor 调用）
///
/// 实现需把 Agent 报告的失败（信封 status = error）转为 AgentInternalError，编排层据此判断成败。
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run_step(&self, step: &Step) -> Result<ExecutionResult, EngineError>;
}
