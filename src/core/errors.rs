use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::schema::DiagnosticResult;

/// A report that exhausted its retries without passing the guardrail.
#[derive(Debug, Clone, Serialize)]
pub struct DegradedReport {
    pub error: String,
    pub retry_count: u32,
    pub degraded_report: DiagnosticResult,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("report failed validation: {}", .0.error)]
    Unvalidated(Box<DegradedReport>),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unvalidated(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = match self {
            ApiError::Unauthorized => json!({ "error": "Unauthorized" }),
            ApiError::Unvalidated(degraded) => json!(*degraded),
            ApiError::BadRequest(msg) | ApiError::Timeout(msg) | ApiError::Internal(msg) => {
                json!({ "error": msg })
            }
        };

        (status, Json(body)).into_response()
    }
}
