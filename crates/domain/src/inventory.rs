//! Inventory Guard.
//!
//! Stock counts are never negative. Adjustments go through the store's
//! per-product serialized `set_stock`; order placement re-checks every
//! decrement inside the store's atomic write.

use common::ProductId;
use store::{DomainStore, DomainStoreExt, Order, Product, StockChange};

use crate::auth::{Identity, require_owner_or_admin};
use crate::error::{DomainError, Result};
use crate::product::validate_stock;

#[derive(Clone)]
pub struct InventoryGuard<S: DomainStore> {
    store: S,
}

impl<S: DomainStore> InventoryGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Replaces a product's stock count.
    ///
    /// The new count is validated before the product is read, so a rejected
    /// request has no effect.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn adjust_stock(
        &self,
        identity: &Identity,
        product_id: ProductId,
        new_count: i64,
    ) -> Result<Product> {
        let count = validate_stock(new_count)?;

        let product = self.store.require_product(product_id).await?;
        require_owner_or_admin(identity, product.created_by)?;

        let updated = self.store.set_stock(product_id, count).await?;
        metrics::counter!("stock_adjustments_total").increment(1);
        tracing::info!(
            %product_id,
            from = product.count_in_stock,
            to = updated.count_in_stock,
            "stock adjusted"
        );
        Ok(updated)
    }

    /// Checks that `requested` units can be taken from the product right now.
    ///
    /// Advisory only: the authoritative check happens again when the store
    /// commits the order.
    pub async fn validate_decrement(
        &self,
        product_id: ProductId,
        requested: u32,
    ) -> Result<Product> {
        if requested == 0 {
            return Err(DomainError::invalid("quantity must be at least 1"));
        }
        let product = self.store.require_product(product_id).await?;
        if product.count_in_stock < requested {
            return Err(DomainError::invalid(format!(
                "insufficient stock for {}: requested {requested}, available {}",
                product.name, product.count_in_stock
            )));
        }
        Ok(product)
    }

    /// Stock to hand back when an order is cancelled.
    pub fn restock_for(order: &Order) -> Vec<StockChange> {
        order
            .items
            .iter()
            .map(|line| StockChange::new(line.product_id, line.quantity))
            .collect()
    }
}
