//! Application error taxonomy and its HTTP mapping.
//!
//! Every request-path failure is one of the [`AppError`] variants. Store and
//! broker failures that are not classified otherwise become
//! [`AppError::Internal`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Machine-readable error payload returned to API clients.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input, e.g. an unparseable expiry timestamp.
    #[error("{message}")]
    InvalidArgument { message: String, details: Value },

    /// Custom alias taken, or a collision detected by the conditional insert.
    #[error("{message}")]
    AlreadyExists { message: String, details: Value },

    /// Unknown or expired short code.
    #[error("{message}")]
    NotFound { message: String, details: Value },

    /// Ownership violation on update.
    #[error("{message}")]
    PermissionDenied { message: String, details: Value },

    /// Random generation could not find a free code within the attempt bound.
    #[error("{message}")]
    AllocationExhausted { message: String, details: Value },

    /// Missing or invalid bearer token at the edge.
    #[error("{message}")]
    Unauthorized { message: String, details: Value },

    /// Store or broker failure not classified above.
    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn invalid_argument(message: impl Into<String>, details: Value) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            details,
        }
    }
    pub fn already_exists(message: impl Into<String>, details: Value) -> Self {
        Self::AlreadyExists {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn permission_denied(message: impl Into<String>, details: Value) -> Self {
        Self::PermissionDenied {
            message: message.into(),
            details,
        }
    }
    pub fn allocation_exhausted(message: impl Into<String>, details: Value) -> Self {
        Self::AllocationExhausted {
            message: message.into(),
            details,
        }
    }
    pub fn unauthorized(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthorized {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Stable error code exposed to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument { .. } => "invalid_argument",
            AppError::AlreadyExists { .. } => "already_exists",
            AppError::NotFound { .. } => "not_found",
            AppError::PermissionDenied { .. } => "permission_denied",
            AppError::AllocationExhausted { .. } => "allocation_exhausted",
            AppError::Unauthorized { .. } => "unauthorized",
            AppError::Internal { .. } => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            AppError::AlreadyExists { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AppError::AllocationExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_parts(self) -> (String, Value) {
        match self {
            AppError::InvalidArgument { message, details }
            | AppError::AlreadyExists { message, details }
            | AppError::NotFound { message, details }
            | AppError::PermissionDenied { message, details }
            | AppError::AllocationExhausted { message, details }
            | AppError::Unauthorized { message, details }
            | AppError::Internal { message, details } => (message, details),
        }
    }

    pub fn to_error_info(self) -> ErrorInfo {
        let code = self.code();
        let (message, details) = self.into_parts();
        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let AppError::Unauthorized { .. } = self {
            let body = ErrorBody {
                error: self.to_error_info(),
            };
            return (
                status,
                [(axum::http::header::WWW_AUTHENTICATE, "Bearer")],
                Json(body),
            )
                .into_response();
        }

        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return AppError::already_exists(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            );
        }

        tracing::error!(error = %e, "Database error");
        AppError::internal("Database error", json!({}))
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        AppError::internal("Store call timed out", json!({}))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&e).unwrap_or_else(|_| json!({}));
        AppError::invalid_argument("Validation failed", details)
    }
}
