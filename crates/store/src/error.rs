use thiserror::Error;

use crate::{ProductId, Version};

/// Errors that can occur when interacting with the domain store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An optimistic version check failed: the record changed since it was read.
    #[error(
        "Concurrency conflict for {entity} {id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        entity: &'static str,
        id: String,
        expected: Version,
        actual: Version,
    },

    /// A uniqueness constraint was violated.
    #[error("Duplicate {field}: {value}")]
    UniqueViolation { field: &'static str, value: String },

    /// The referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The record cannot be removed while other records point at it.
    #[error("{entity} {id} is still referenced by {by}")]
    StillReferenced {
        entity: &'static str,
        id: String,
        by: &'static str,
    },

    /// A stock decrement would drive a product's count below zero.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A stored value could not be decoded into its domain type.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
