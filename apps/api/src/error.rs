//! API error types and the HTTP error envelope.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError / DbError                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (this module) ← stable machine code + HTTP status            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  { "ok": false, "error": "insufficient_stock", "message": "..." }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `error` field is contract: clients branch on it, so codes never
//! change. `message` is human-readable and free to evolve. Auth failures
//! (signature, token) deliberately carry no detail beyond the code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use vendra_core::CoreError;
use vendra_db::DbError;

/// API-level error, one variant per envelope shape.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Domain error with a stable machine code.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// A required request header is missing or malformed.
    #[error("Missing or invalid header: {0}")]
    BadHeader(&'static str),

    /// Requested entity does not exist (or is invisible to this tenant).
    #[error("{entity} not found")]
    NotFound { entity: String },

    /// Anything we cannot attribute to the caller.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// Stable machine code for the envelope.
    fn code(&self) -> &'static str {
        match self {
            ApiError::Domain(err) => err.code(),
            ApiError::BadHeader(_) => "validation_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error.
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(err) => match err {
                // Missing resources
                CoreError::ProductNotFound { .. } | CoreError::BillNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                // Auth failures: uniform 401, no detail
                CoreError::InvalidSignature | CoreError::InvalidToken => StatusCode::UNAUTHORIZED,
                // Exchange replay is a conflict with existing state
                CoreError::SubscriptionAlreadyUsed { .. } => StatusCode::CONFLICT,
                // Everything else is a caller error against current state
                _ => StatusCode::BAD_REQUEST,
            },
            ApiError::BadHeader(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => ApiError::Domain(core),
            DbError::NotFound { entity, .. } => ApiError::NotFound { entity },
            DbError::UniqueViolation { field, .. } => {
                // Constraint races that repositories did not translate into
                // a domain error (e.g. duplicate SKU, duplicate role).
                ApiError::Domain(CoreError::Validation(
                    vendra_core::ValidationError::InvalidFormat {
                        field,
                        reason: "already exists".to_string(),
                    },
                ))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // Internal detail goes to the log, never to the client.
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Internal error");
                "Internal server error".to_string()
            }
            other => {
                warn!(code = code, status = %status, "Request failed: {other}");
                other.to_string()
            }
        };

        let body = Json(json!({
            "ok": false,
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for handler functions.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================
