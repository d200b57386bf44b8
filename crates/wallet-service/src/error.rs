//! Error types for the service and its HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use wallet_core::{Rejection, Violation};
use wallet_store::StoreError;

/// Errors raised by the ledger lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Durable storage failed (open, recovery or write).
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),

    /// A background task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or wrong shared token.
    #[error("unauthorized")]
    Unauthorized,

    /// The request broke one or more ledger rules.
    #[error("rejected: {0}")]
    Rejected(Rejection),
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Wrong token value".to_string(),
                None,
            ),
            Self::Rejected(rejection) => {
                let (status, code) = rejection_status(rejection);
                (
                    status,
                    code,
                    rejection.to_string(),
                    Some(serde_json::json!({ "violations": rejection.violations() })),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Pick the status for a rejection from the most significant violation.
fn rejection_status(rejection: &Rejection) -> (StatusCode, &'static str) {
    let violations = rejection.violations();

    if violations.iter().any(|v| matches!(v, Violation::NotFound)) {
        (StatusCode::NOT_FOUND, "not_found")
    } else if violations
        .iter()
        .any(|v| matches!(v, Violation::AlreadyExists | Violation::OutOfSequence { .. }))
    {
        (StatusCode::CONFLICT, "conflict")
    } else if violations
        .iter()
        .any(|v| matches!(v, Violation::InsufficientFunds { .. }))
    {
        (StatusCode::PAYMENT_REQUIRED, "insufficient_funds")
    } else {
        (StatusCode::UNPROCESSABLE_ENTITY, "invalid_request")
    }
}
