//! Agent App - 可复用的 Agent 执行引擎
//!
//! 模块划分：
//! - **agent**: Agent trait、AgentConfig 与覆盖合并、注册表、示例 Agent
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、Task 状态机、执行结果信封
//! - **engine**: AgentEngine，组合默认配置 / 注册表 / 执行器 / 历史账本
//! - **executor**: 带超时与审计日志的 TaskExecutor
//! - **history**: 执行记录、HistoryStore（内存 / SQLite）与账本
//! - **orchestration**: 链式、重试、扇出、路由四种工作流组合
//! - **server**: axum HTTP 传输层（feature = "web"）

pub mod agent;
pub mod config;
pub mod core;
pub mod engine;
pub mod executor;
pub mod history;
pub mod observability;
pub mod orchestration;
#[cfg(feature = "web")]
pub mod server;
pub mod wire;

pub use crate::core::{EngineError, ExecutionResult};
pub use engine::AgentEngine;
