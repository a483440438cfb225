use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, AppError>;

/// Application error taxonomy.
///
/// The four business kinds surface to callers as distinct responses and are
/// never retried internally:
/// - `NotFound`: missing resource, or wrong ownership (indistinguishable on
///   purpose, so existence never leaks to unauthorized callers)
/// - `EligibilityDenied`: redemption creation blocked by a business rule
/// - `InvalidTransition`: right identity, wrong status for the operation
/// - `Integrity`: an invariant the code must uphold was violated; a defect,
///   reported loudly as a server error
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    EligibilityDenied(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::EligibilityDenied(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::Integrity(_)
            | AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Forbidden(_) => "forbidden",
            AppError::EligibilityDenied(_) => "eligibility_denied",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::Integrity(_) => "integrity_violation",
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side faults are logged with detail; the client sees a
        // generic message for anything that isn't theirs to act on.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "Internal server error".to_string()
            }
            AppError::Pool(e) => {
                tracing::error!(error = %e, "connection pool error");
                "Internal server error".to_string()
            }
            AppError::Integrity(msg) => {
                tracing::error!(error = %msg, "integrity violation");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
