//! Domain error types.

use common::OrderStatus;
use store::StoreError;
use thiserror::Error;

/// Caller-facing classification of a [`DomainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No credential, or the credential did not verify.
    Unauthenticated,
    /// Valid identity, insufficient capability or ownership.
    Forbidden,
    NotFound,
    InvalidInput,
    InvalidTransition,
    Conflict,
    /// An external collaborator was unreachable or failed.
    DependencyFailure,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Conflict => "conflict",
            ErrorKind::DependencyFailure => "dependency_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid transition: cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{dependency} unavailable: {reason}")]
    DependencyFailure {
        dependency: &'static str,
        reason: String,
    },

    /// A store failure that is neither a conflict nor a missing record.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::InvalidInput(_) => ErrorKind::InvalidInput,
            DomainError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::DependencyFailure { .. } => ErrorKind::DependencyFailure,
            DomainError::Store(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        DomainError::InvalidInput(message.into())
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::UniqueViolation { .. }
            | StoreError::ConcurrencyConflict { .. }
            | StoreError::StillReferenced { .. } => {
                DomainError::Conflict(e.to_string())
            }
            StoreError::InsufficientStock { .. } => DomainError::InvalidInput(e.to_string()),
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use common::ProductId;
    use store::Version;

    use super::*;

    #[test]
    fn store_conflicts_surface_as_conflict() {
        let err: DomainError = StoreError::ConcurrencyConflict {
            entity: "Product",
            id: "p".to_string(),
            expected: Version::first(),
            actual: Version::new(2),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: DomainError = StoreError::UniqueViolation {
            field: "email",
            value: "a@b.c".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: DomainError = StoreError::StillReferenced {
            entity: "User",
            id: "u".to_string(),
            by: "products",
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn insufficient_stock_is_invalid_input() {
        let err: DomainError = StoreError::InsufficientStock {
            product_id: ProductId::new(),
            requested: 3,
            available: 1,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn missing_record_is_not_found() {
        let err: DomainError = StoreError::NotFound {
            entity: "Order",
            id: "o".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Order not found: o");
    }

    #[test]
    fn unauthenticated_and_forbidden_are_distinct() {
        assert_ne!(
            DomainError::Unauthenticated("x".into()).kind(),
            DomainError::Forbidden("x".into()).kind()
        );
    }

    #[test]
    fn transition_message_names_both_statuses() {
        let err = DomainError::InvalidTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot move order from Shipped to Cancelled"
        );
    }
}
