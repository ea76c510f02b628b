//! Read models for order listings.

use common::Category;
use serde::Serialize;
use store::{Order, OrderLine, Product};

/// Current catalog data for an order line's product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ProductRef {
    #[serde(rename_all = "camelCase")]
    Available {
        name: String,
        image_url: String,
        category: Category,
    },
    /// The product was deleted after the order was placed.
    Unavailable,
}

impl From<&Product> for ProductRef {
    fn from(product: &Product) -> Self {
        ProductRef::Available {
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            category: product.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineView {
    pub line: OrderLine,
    pub product: ProductRef,
}

impl LineView {
    /// Name to display: the live product name, or the snapshot if it is gone.
    pub fn display_name(&self) -> &str {
        match &self.product {
            ProductRef::Available { name, .. } => name,
            ProductRef::Unavailable => &self.line.product_name,
        }
    }
}

/// An order with its purchaser name and product references resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub purchaser_name: String,
    pub lines: Vec<LineView>,
}
