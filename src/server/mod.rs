//! HTTP 传输层（feature = "web"）
//!
//! 解析请求 → AgentEngine → 映射为 wire 响应。路由：
//! - POST /api/v1/agent/execute | analyze | generate
//! - GET  /api/v1/agent/history?limit=N
//! - GET  /health、/、/info

mod error;
mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::config::AppSection;
use crate::engine::AgentEngine;

pub use error::ApiError;

/// 所有 handler 共享的状态
pub struct AppState {
    pub engine: AgentEngine,
    pub app: AppSection,
}

impl AppState {
    pub fn new(engine: AgentEngine, app: AppSection) -> Self {
        Self { engine, app }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/info", get(handlers::info))
        .route("/api/v1/agent/execute", post(handlers::execute))
        .route("/api/v1/agent/analyze", post(handlers::analyze))
        .route("/api/v1/agent/generate", post(handlers::generate))
        .route("/api/v1/agent/history", get(handlers::history))
        .with_state(state)
}
