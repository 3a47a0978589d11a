use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::agent::{analyze_request, generate_request};
use crate::server::{ApiError, AppState};
use crate::wire::{
    AnalyzeRequest, ExecuteResponse, GenerateRequest, HealthResponse, HistoryResponse,
    TaskRequest,
};

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    limit: Option<usize>,
}

async fn run(state: &AppState, req: TaskRequest) -> Result<Json<ExecuteResponse>, ApiError> {
    // 信封 status = error 时按执行错误返回 500
    let result = state.engine.execute(&req).await?.into_result()?;
    Ok(Json(ExecuteResponse::success(result)))
}

pub(super) async fn execute(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let Json(req) = payload?;
    run(&state, req).await
}

pub(super) async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let Json(body) = payload?;
    let (task, context) = analyze_request(&body.data);
    run(&state, TaskRequest::new(task).with_context(context)).await
}

pub(super) async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let Json(body) = payload?;
    let (task, context) = generate_request(&body.prompt);
    run(&state, TaskRequest::new(task).with_context(context)).await
}

pub(super) async fn history(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(q) = query?;
    let history = state.engine.history(q.limit).await?;
    Ok(Json(HistoryResponse {
        status: "success".to_string(),
        count: history.len(),
        history,
    }))
}

pub(super) async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    if let Err(e) = state.engine.ledger().health_check().await {
        tracing::warn!(error = %e, "health check failed");
        return Err(ApiError::Unavailable(e.to_string()));
    }
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        environment: state.app.environment.clone(),
    }))
}

pub(super) async fn root() -> Json<Value> {
    Json(json!({
        "message": "Agent application is running",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
    }))
}

pub(super) async fn info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "app_name": state.app.name,
        "environment": state.app.environment,
        "debug": state.app.debug,
        "agents": state.engine.registry().agent_names(),
        "default_agent": state.engine.default_config(),
    }))
}
