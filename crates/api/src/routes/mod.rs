//! HTTP route handlers.

pub mod analytics;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod users;

use crate::error::ApiError;

/// Parses a path id, mapping failures to `400 Bad Request`.
pub(crate) fn parse_id<T, E: std::fmt::Display>(
    entity: &str,
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ApiError> {
    parse(raw).map_err(|e| ApiError::BadRequest(format!("invalid {entity} id {raw:?}: {e}")))
}
