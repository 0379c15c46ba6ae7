//! # API Error Envelope
//!
//! Every error response has the same JSON shape:
//!
//! ```json
//! { "code": "INSUFFICIENT_STOCK", "message": "insufficient stock for ..." }
//! ```
//!
//! `code` is a stable machine-readable discriminant; `message` is for
//! humans and may change wording between releases.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use novabill_core::CoreError;
use novabill_engine::EngineError;

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidLineItem,
    EmptyCart,
    UnknownItem,
    UnknownInvoice,
    InsufficientStock,
    AlreadyPaid,
    Busy,
    StoreError,
    Internal,
}

/// Error envelope returned by every failing route.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::ValidationError | ErrorCode::InvalidLineItem | ErrorCode::EmptyCart => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::UnknownItem | ErrorCode::UnknownInvoice => StatusCode::NOT_FOUND,
            ErrorCode::InsufficientStock | ErrorCode::AlreadyPaid => StatusCode::CONFLICT,
            ErrorCode::Busy => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::StoreError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(core) => core.into(),
            EngineError::Store(store) => {
                // Backend details stay in the log, not on the wire.
                error!(error = %store, "store failure surfaced to api");
                ApiError::new(ErrorCode::StoreError, "storage backend failure")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::Validation(_) => ErrorCode::ValidationError,
            CoreError::InvalidLineItem { .. } => ErrorCode::InvalidLineItem,
            CoreError::EmptyCart => ErrorCode::EmptyCart,
            CoreError::UnknownItem(_) => ErrorCode::UnknownItem,
            CoreError::UnknownInvoice(_) => ErrorCode::UnknownInvoice,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::AlreadyPaid(_) => ErrorCode::AlreadyPaid,
            CoreError::Busy => ErrorCode::Busy,
        };
        ApiError::new(code, err.to_string())
    }
}
