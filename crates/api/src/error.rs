//! API error types with HTTP response mapping.

use analytics::AnalyticsError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request the domain never saw, such as an unparseable path id.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Reporting error.
    Analytics(AnalyticsError),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::BadRequest(_) => ErrorKind::InvalidInput,
            ApiError::Domain(err) => err.kind(),
            ApiError::Analytics(err) => err.kind(),
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidTransition | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::DependencyFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Domain(err) => err.to_string(),
            ApiError::Analytics(err) => err.to_string(),
            ApiError::Internal(msg) => msg,
        };

        metrics::counter!("http_errors_total", "kind" => kind.as_str()).increment(1);
        match kind {
            ErrorKind::Internal => {
                tracing::error!(error = %message, "internal server error");
            }
            ErrorKind::DependencyFailure => {
                tracing::warn!(error = %message, "upstream dependency failed");
            }
            _ => {}
        }

        let body = serde_json::json!({ "error": kind.as_str(), "message": message });
        (status_for(kind), axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        ApiError::Analytics(err)
    }
}
