//! Order Lifecycle Manager.

use std::collections::HashMap;

use chrono::Utc;
use common::{OrderId, OrderStatus, ProductId, Role, UserId};
use store::{
    DomainStore, DomainStoreExt, Order, OrderLine, OrderQuery, Product, StockChange, Version,
    WriteOptions,
};

use super::commands::CartSnapshot;
use super::filters::OrderFilters;
use super::view::{LineView, OrderView, ProductRef};
use crate::auth::{Identity, require_owner_or_admin, require_role};
use crate::error::{DomainError, Result};
use crate::inventory::InventoryGuard;
use crate::settings::{InventoryPolicy, StorefrontSettings};

/// Service for placing orders and moving them through their lifecycle.
#[derive(Clone)]
pub struct OrderService<S: DomainStore + Clone> {
    store: S,
    inventory: InventoryGuard<S>,
    policy: InventoryPolicy,
}

impl<S: DomainStore + Clone> OrderService<S> {
    pub fn new(store: S, settings: &StorefrontSettings) -> Self {
        Self {
            inventory: InventoryGuard::new(store.clone()),
            store,
            policy: settings.inventory_policy,
        }
    }

    /// Places an order for the caller from a cart snapshot.
    ///
    /// Names, images and unit prices are copied from the live catalog and the
    /// total is computed here. With a tracked inventory the stock decrement
    /// commits atomically with the order.
    #[tracing::instrument(skip(self, identity, cart), fields(user_id = %identity.user_id))]
    pub async fn create_order(&self, identity: &Identity, cart: CartSnapshot) -> Result<Order> {
        let lines = cart.validate()?;
        let tracked = self.policy.is_tracked();

        let mut items = Vec::with_capacity(lines.len());
        let mut decrements = Vec::new();
        for (product_id, quantity) in lines {
            let product = if tracked {
                self.inventory
                    .validate_decrement(product_id, quantity)
                    .await?
            } else {
                self.store.require_product(product_id).await?
            };
            if tracked {
                decrements.push(StockChange::new(product_id, quantity));
            }
            items.push(OrderLine {
                product_id,
                product_name: product.name,
                image_url: product.image_url,
                quantity,
                unit_price: product.price,
            });
        }

        let total_amount = Order::total_of(&items)
            .ok_or_else(|| DomainError::invalid("order total is too large"))?;

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            purchaser_id: identity.user_id,
            purchaser_name: identity.display_name.clone(),
            items,
            total_amount,
            status: OrderStatus::Unprocessed,
            stock_reserved: tracked,
            created_at: now,
            updated_at: now,
            version: Version::default(),
        };

        let order = self.store.place_order(order, &decrements).await?;
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            total = %order.total_amount,
            lines = order.items.len(),
            "order placed"
        );
        Ok(order)
    }

    /// The caller's orders, newest first.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn list_my_orders(&self, identity: &Identity) -> Result<Vec<OrderView>> {
        let orders = self
            .store
            .list_orders(OrderQuery::for_purchaser(identity.user_id))
            .await?;
        let refs: Vec<&Order> = orders.iter().collect();
        let products = self.resolve_products(&refs).await?;

        Ok(orders
            .into_iter()
            .map(|order| view(order, identity.display_name.clone(), &products))
            .collect())
    }

    /// Every order, filtered. Admin only.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn list_all_orders(
        &self,
        identity: &Identity,
        filters: OrderFilters,
    ) -> Result<Vec<OrderView>> {
        require_role(identity, &[Role::Admin])?;

        let mut query = OrderQuery::new().sort(filters.sort_by_created_at);
        if let Some(status) = filters.status.as_status() {
            query = query.status(status);
        }
        let orders = self.store.list_orders(query).await?;

        let names: HashMap<UserId, String> = self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(|u| (u.id, u.display_name))
            .collect();

        let orders: Vec<(Order, String)> = orders
            .into_iter()
            .map(|order| {
                let name = names
                    .get(&order.purchaser_id)
                    .cloned()
                    .unwrap_or_else(|| order.purchaser_name.clone());
                (order, name)
            })
            .filter(|(_, name)| filters.matches_purchaser(name))
            .collect();

        let refs: Vec<&Order> = orders.iter().map(|(order, _)| order).collect();
        let products = self.resolve_products(&refs).await?;
        Ok(orders
            .into_iter()
            .map(|(order, name)| view(order, name, &products))
            .collect())
    }

    /// One order, for its purchaser or an admin.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn get_order(&self, identity: &Identity, order_id: OrderId) -> Result<OrderView> {
        let order = self.store.require_order(order_id).await?;
        require_owner_or_admin(identity, order.purchaser_id)?;

        let name = match self.store.get_user(order.purchaser_id).await? {
            Some(user) => user.display_name,
            None => order.purchaser_name.clone(),
        };
        let products = self.resolve_products(&[&order]).await?;
        Ok(view(order, name, &products))
    }

    /// Moves an order one step through the status machine. Admin only.
    ///
    /// Cancelling restores stock only when the order reserved it, whatever
    /// policy the service runs under now.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn set_status(
        &self,
        identity: &Identity,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order> {
        require_role(identity, &[Role::Admin])?;

        let order = self.store.require_order(order_id).await?;
        if !order.status.can_transition_to(status) {
            return Err(DomainError::InvalidTransition {
                from: order.status,
                to: status,
            });
        }

        // Only orders that took stock at placement give it back.
        let restock = if status == OrderStatus::Cancelled && order.stock_reserved {
            InventoryGuard::<S>::restock_for(&order)
        } else {
            Vec::new()
        };

        let from = order.status;
        let updated = self
            .store
            .transition_order(
                order_id,
                status,
                WriteOptions::expect_version(order.version),
                &restock,
            )
            .await?;
        metrics::counter!("order_status_changes_total", "status" => status.as_str()).increment(1);
        tracing::info!(%order_id, %from, to = %status, "order status changed");
        Ok(updated)
    }

    async fn resolve_products(&self, orders: &[&Order]) -> Result<HashMap<ProductId, Product>> {
        let mut products = HashMap::new();
        let mut missing = Vec::new();
        for order in orders {
            for line in &order.items {
                if products.contains_key(&line.product_id) || missing.contains(&line.product_id) {
                    continue;
                }
                match self.store.get_product(line.product_id).await? {
                    Some(product) => {
                        products.insert(line.product_id, product);
                    }
                    None => missing.push(line.product_id),
                }
            }
        }
        Ok(products)
    }
}

fn view(order: Order, purchaser_name: String, products: &HashMap<ProductId, Product>) -> OrderView {
    let lines = order
        .items
        .iter()
        .map(|line| LineView {
            line: line.clone(),
            product: products
                .get(&line.product_id)
                .map(ProductRef::from)
                .unwrap_or(ProductRef::Unavailable),
        })
        .collect();
    OrderView {
        order,
        purchaser_name,
        lines,
    }
}
