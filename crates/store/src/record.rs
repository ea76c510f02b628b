//! Persisted record types.

use chrono::{DateTime, Utc};
use common::{Category, Money, OrderId, OrderStatus, ProductId, Role, UserId};
use serde::{Deserialize, Serialize};

/// Version number of a stored record, used for optimistic concurrency control.
///
/// A freshly inserted record is at version 1; every write increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a freshly inserted record.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// An identity record, provisioned on the first authentication handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Subject id issued by the credential verifier. Globally unique.
    pub external_subject_id: String,

    pub display_name: String,

    /// Lowercased email. Globally unique.
    pub email: String,

    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: Version,
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: Category,
    pub description: Option<String>,
    pub image_url: String,
    pub price: Money,

    /// Units on hand. Unsigned, so never negative.
    pub count_in_stock: u32,

    /// The user who created (and owns) this product.
    pub created_by: UserId,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: Version,
}

/// One line of an order: a value snapshot of the product at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns `quantity * unit_price`, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// A point-in-time purchase record. Only `status` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub purchaser_id: UserId,

    /// Purchaser display name at order time. Kept when the user is later deleted.
    pub purchaser_name: String,

    pub items: Vec<OrderLine>,

    /// Sum of the line totals, computed once at creation.
    pub total_amount: Money,

    pub status: OrderStatus,

    /// Whether placing the order took the items out of stock. Cancelling
    /// gives stock back only when this is set.
    #[serde(default)]
    pub stock_reserved: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: Version,
}

impl Order {
    /// Sums the line totals, returning `None` on overflow.
    pub fn total_of(items: &[OrderLine]) -> Option<Money> {
        items
            .iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line.line_total()?))
    }
}

/// A change to one product's stock, applied atomically with an order write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl StockChange {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}
