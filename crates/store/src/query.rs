use common::{Category, OrderStatus, UserId};
use serde::{Deserialize, Serialize};

/// Sort direction on `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Filters for listing products.
///
/// Results are always ordered by creation time, then id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Only products in this category.
    pub category: Option<Category>,

    /// Case-insensitive substring match on the product name.
    pub name_contains: Option<String>,

    /// Only products created by this user.
    pub created_by: Option<UserId>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn name_contains(mut self, needle: impl Into<String>) -> Self {
        self.name_contains = Some(needle.into());
        self
    }

    pub fn created_by(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }
}

/// Filters for listing orders.
///
/// Results are ordered by creation time (then id) in `sort` direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// Only orders placed by this user.
    pub purchaser: Option<UserId>,

    /// Only orders in this status.
    pub status: Option<OrderStatus>,

    pub sort: SortDirection,
}

impl OrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for all orders placed by a user.
    pub fn for_purchaser(user_id: UserId) -> Self {
        Self {
            purchaser: Some(user_id),
            ..Default::default()
        }
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn sort(mut self, sort: SortDirection) -> Self {
        self.sort = sort;
        self
    }
}
