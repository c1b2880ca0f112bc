//! # API Error Mapping
//!
//! Every handler returns [`AppError`]. Engine failures keep their taxonomy
//! code (`VALIDATION_ERROR`, `CONCURRENT_REASSESSMENT`, ...) and gain an HTTP
//! status; request-shape failures are reported before the engine is called.
//!
//! | Engine error              | Status |
//! |---------------------------|--------|
//! | `Validation`              | 422    |
//! | `Authorization`           | 403    |
//! | `ConcurrentReassessment`  | 409    |
//! | `NotFound`                | 404    |
//! | `UpstreamUnavailable`     | 503    |
//! | `Storage`, `Canonicalization` | 500, message withheld |
//!
//! A blocking engine task that panics or is cancelled is a 500 with code
//! `INTERNAL_ERROR`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use airc_core::{EngineError, ValidationError};

/// JSON error envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Code, message and optional structured details.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `CONCURRENT_REASSESSMENT`.
    pub code: String,
    pub message: String,
    /// `{expected, found}` for concurrency conflicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub(crate) fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Handler error.
#[derive(Error, Debug)]
pub enum AppError {
    /// Failure reported by the classification engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Body or path segment could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Body parsed but breaks a request rule (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// The blocking engine task did not return (500).
    #[error("engine task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Engine(e) => match e {
                EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::Authorization { .. } => StatusCode::FORBIDDEN,
                EngineError::ConcurrentReassessment { .. } => StatusCode::CONFLICT,
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::Storage(_) | EngineError::Canonicalization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::BadRequest(_) => ErrorBody::new("BAD_REQUEST", self.to_string()),
            Self::Validation(_) => ErrorBody::new("VALIDATION_ERROR", self.to_string()),
            Self::Join(e) => {
                tracing::error!(error = %e, "engine task failed");
                ErrorBody::new("INTERNAL_ERROR", "evaluation did not complete; nothing was sealed")
            }
            Self::Engine(e @ (EngineError::Storage(_) | EngineError::Canonicalization(_))) => {
                tracing::error!(error = %e, "engine failure");
                ErrorBody::new(e.code(), "evaluation did not complete; nothing was sealed")
            }
            Self::Engine(e) => {
                let mut body = ErrorBody::new(e.code(), e.to_string());
                if let EngineError::ConcurrentReassessment {
                    expected, found, ..
                } = e
                {
                    body.error.details =
                        Some(serde_json::json!({ "expected": expected, "found": found }));
                }
                body
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Engine(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
