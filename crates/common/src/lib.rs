//! Shared value types for the storefront core.
//!
//! Identifiers, exact money amounts, roles, catalog categories and the
//! order status state machine are used by every other crate.

mod catalog;
mod money;
mod status;
mod types;

pub use catalog::{Category, Role};
pub use money::Money;
pub use status::OrderStatus;
pub use types::{OrderId, ProductId, UserId};

use thiserror::Error;

/// Error returned when parsing one of the enumerated value types from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

impl ParseError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
