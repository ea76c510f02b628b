//! Order operation inputs.

use common::{OrderStatus, ProductId};
use serde::Deserialize;

use crate::error::{DomainError, Result};

pub const MAX_LINE_QUANTITY: u32 = 10_000;
pub const MAX_CART_LINES: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// What the purchaser wants to buy. Prices come from the catalog, never the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub items: Vec<CartLine>,
}

impl CartSnapshot {
    pub fn new(items: Vec<CartLine>) -> Self {
        Self { items }
    }

    /// Validates quantities and merges repeated products, keeping first-seen order.
    pub fn validate(&self) -> Result<Vec<(ProductId, u32)>> {
        if self.items.is_empty() {
            return Err(DomainError::invalid("order must contain at least one item"));
        }
        if self.items.len() > MAX_CART_LINES {
            return Err(DomainError::invalid(format!(
                "an order may hold at most {MAX_CART_LINES} lines"
            )));
        }

        let mut merged: Vec<(ProductId, u32)> = Vec::with_capacity(self.items.len());
        for line in &self.items {
            let quantity = check_quantity(line.quantity)?;
            match merged.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, total)) => {
                    *total = total
                        .checked_add(quantity)
                        .filter(|q| *q <= MAX_LINE_QUANTITY)
                        .ok_or_else(|| {
                            DomainError::invalid(format!(
                                "quantity for {} exceeds {MAX_LINE_QUANTITY}",
                                line.product_id
                            ))
                        })?;
                }
                None => merged.push((line.product_id, quantity)),
            }
        }
        Ok(merged)
    }
}

fn check_quantity(quantity: i64) -> Result<u32> {
    match u32::try_from(quantity) {
        Ok(q) if (1..=MAX_LINE_QUANTITY).contains(&q) => Ok(q),
        _ => Err(DomainError::invalid(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY} (got {quantity})"
        ))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetOrderStatus {
    pub status: String,
}

impl SetOrderStatus {
    pub fn new(status: OrderStatus) -> Self {
        Self {
            status: status.to_string(),
        }
    }

    pub fn parse(&self) -> Result<OrderStatus> {
        self.status
            .parse()
            .map_err(|e: common::ParseError| DomainError::invalid(e.to_string()))
    }
}
