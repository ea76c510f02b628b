//! Storefront-wide options passed to the services.

use std::str::FromStr;

use common::ParseError;
use serde::{Deserialize, Serialize};

/// Whether placing and cancelling orders moves product stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryPolicy {
    /// Orders are checked against stock and decrement it; cancellation restores it.
    #[default]
    Track,
    /// Stock is managed by hand and orders never touch it.
    Untracked,
}

impl InventoryPolicy {
    pub fn is_tracked(&self) -> bool {
        matches!(self, InventoryPolicy::Track)
    }
}

impl FromStr for InventoryPolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "track" | "tracked" => Ok(InventoryPolicy::Track),
            "untracked" | "none" => Ok(InventoryPolicy::Untracked),
            _ => Err(ParseError::new("inventory policy", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontSettings {
    pub inventory_policy: InventoryPolicy,
    /// Offset from UTC, in minutes, of the reporting calendar.
    pub reporting_offset_minutes: i32,
    pub top_products_limit: usize,
    pub payment_success_url: String,
    pub payment_cancel_url: String,
}

impl Default for StorefrontSettings {
    fn default() -> Self {
        Self {
            inventory_policy: InventoryPolicy::Track,
            reporting_offset_minutes: 0,
            top_products_limit: 10,
            payment_success_url: "http://localhost:3000/checkout/success".to_string(),
            payment_cancel_url: "http://localhost:3000/checkout/cancel".to_string(),
        }
    }
}
