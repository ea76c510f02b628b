//! Analytics error types.

use domain::{DomainError, ErrorKind};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while computing a report.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The caller may not see reports, or a domain rule failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The requested window or timezone is unusable.
    #[error("Invalid report parameters: {0}")]
    InvalidParameters(String),

    /// A revenue sum left the representable range.
    #[error("Revenue overflow while aggregating {0}")]
    Overflow(&'static str),
}

impl AnalyticsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyticsError::Domain(e) => e.kind(),
            AnalyticsError::Store(_) | AnalyticsError::Overflow(_) => ErrorKind::Internal,
            AnalyticsError::InvalidParameters(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
