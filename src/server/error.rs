//! HTTP 错误映射

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::core::EngineError;
use crate::wire::ErrorResponse;

/// 调用方错误 → 400，其余 → 500；响应体只含错误信息
#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    BadRequest(String),
    Unavailable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(e) if e.is_caller_error() => StatusCode::BAD_REQUEST,
            ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Engine(e) => e.to_string(),
            ApiError::BadRequest(msg) | ApiError::Unavailable(msg) => msg.clone(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, detail = %self.detail(), "request failed");
        }
        let mut body = ErrorResponse::new(self.detail());
        if let ApiError::Engine(e) = &self {
            body = body.with_kind(e.kind());
        }
        (status, Json(body)).into_response()
    }
}
