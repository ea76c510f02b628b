use std::pin::Pin;

use async_trait::async_trait;
use common::{OrderId, OrderStatus, ProductId, UserId};
use futures_core::Stream;

use crate::{
    Order, OrderQuery, Product, ProductQuery, Result, StockChange, StoreError, User, Version,
};

/// Options for overwriting an existing record.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Expected stored version for optimistic concurrency control.
    /// If None, no version check is performed (use with caution).
    pub expected_version: Option<Version>,
}

impl WriteOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the record to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Fails with `ConcurrencyConflict` if `actual` does not match the expectation.
    pub(crate) fn check(&self, entity: &'static str, id: impl ToString, actual: Version) -> Result<()> {
        match self.expected_version {
            Some(expected) if expected != actual => Err(StoreError::ConcurrencyConflict {
                entity,
                id: id.to_string(),
                expected,
                actual,
            }),
            _ => Ok(()),
        }
    }
}

/// A stream of orders.
pub type OrderStream = Pin<Box<dyn Stream<Item = Result<Order>> + Send>>;

/// Durable storage for users, products and orders.
///
/// The store exclusively owns all three record types. Every write to a single
/// record is applied in one total order; `set_stock`, `place_order` and
/// `transition_order` are atomic with respect to the stock counts they touch.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DomainStore: Send + Sync {
    /// Inserts a new user.
    ///
    /// Fails with `UniqueViolation` if the subject id or (case-insensitive)
    /// email is already taken.
    async fn insert_user(&self, user: User) -> Result<User>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    async fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>>;

    /// Looks up a user by email, ignoring case.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Lists all users, oldest first.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Overwrites a user record, bumping its version.
    async fn update_user(&self, user: User, options: WriteOptions) -> Result<User>;

    /// Hard-deletes a user. Returns false if no such user existed.
    ///
    /// Fails with `StillReferenced` while any product names the user as its
    /// creator. Orders keep their purchaser snapshot and do not block.
    async fn delete_user(&self, id: UserId) -> Result<bool>;

    /// Inserts a new product. The creator must reference an existing user.
    async fn insert_product(&self, product: Product) -> Result<Product>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>>;

    /// Overwrites a product record, bumping its version.
    async fn update_product(&self, product: Product, options: WriteOptions) -> Result<Product>;

    /// Replaces a product's stock count in a single serialized write.
    async fn set_stock(&self, id: ProductId, count: u32) -> Result<Product>;

    /// Deletes a product. Returns false if no such product existed.
    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    /// Inserts an order and applies the given stock decrements atomically.
    ///
    /// Fails with `InsufficientStock` or `NotFound` without writing anything
    /// if any decrement cannot be applied.
    async fn place_order(&self, order: Order, decrements: &[StockChange]) -> Result<Order>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Writes a new order status and restores stock atomically.
    ///
    /// Restock entries for products that no longer exist are skipped.
    async fn transition_order(
        &self,
        id: OrderId,
        status: OrderStatus,
        options: WriteOptions,
        restock: &[StockChange],
    ) -> Result<Order>;

    /// Streams all orders, oldest first.
    async fn stream_orders(&self) -> Result<OrderStream>;
}

/// Extension trait providing convenience methods for domain stores.
#[async_trait]
pub trait DomainStoreExt: DomainStore {
    /// Loads a product, failing with `NotFound` if it does not exist.
    async fn require_product(&self, id: ProductId) -> Result<Product> {
        self.get_product(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    /// Loads an order, failing with `NotFound` if it does not exist.
    async fn require_order(&self, id: OrderId) -> Result<Order> {
        self.get_order(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Order", id))
    }

    /// Loads a user, failing with `NotFound` if it does not exist.
    async fn require_user(&self, id: UserId) -> Result<User> {
        self.get_user(id)
            .await?
            .ok_or_else(|| StoreError::not_found("User", id))
    }
}

// Blanket implementation for all DomainStore implementations
impl<T: DomainStore + ?Sized> DomainStoreExt for T {}

/// Sums stock changes per product so each product is touched once.
pub(crate) fn merge_stock_changes(changes: &[StockChange]) -> Result<Vec<StockChange>> {
    let mut merged: Vec<StockChange> = Vec::with_capacity(changes.len());
    for change in changes {
        match merged.iter_mut().find(|c| c.product_id == change.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(change.quantity)
                    .ok_or_else(|| {
                        StoreError::Corrupt(format!(
                            "stock change overflow for product {}",
                            change.product_id
                        ))
                    })?;
            }
            None => merged.push(*change),
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_options_without_expectation_always_pass() {
        assert!(WriteOptions::new().check("User", "u1", Version::new(7)).is_ok());
    }

    #[test]
    fn write_options_reject_stale_version() {
        let result = WriteOptions::expect_version(Version::first()).check(
            "Product",
            "p1",
            Version::new(2),
        );
        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { entity: "Product", .. })
        ));
    }

    #[test]
    fn merge_stock_changes_sums_duplicates() {
        let a = ProductId::new();
        let b = ProductId::new();
        let merged = merge_stock_changes(&[
            StockChange::new(a, 2),
            StockChange::new(b, 1),
            StockChange::new(a, 3),
        ])
        .unwrap();
        assert_eq!(merged, vec![StockChange::new(a, 5), StockChange::new(b, 1)]);
    }
}
