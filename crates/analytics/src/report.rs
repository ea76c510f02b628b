//! Report parameters and rows.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use common::{Category, Money, OrderStatus, ParseError, ProductId};
use serde::{Deserialize, Serialize, Serializer};
use store::Order;

use crate::error::{AnalyticsError, Result};

/// Which orders a report looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesFilter {
    /// Inclusive lower bound on `created_at`.
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exclude_cancelled: bool,
}

impl SalesFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            exclude_cancelled: false,
        }
    }

    pub fn exclude_cancelled(mut self) -> Self {
        self.exclude_cancelled = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from >= to => Err(AnalyticsError::InvalidParameters(
                format!("window start {from} is not before its end {to}"),
            )),
            _ => Ok(()),
        }
    }

    pub fn admits(&self, order: &Order) -> bool {
        if self.exclude_cancelled && order.status == OrderStatus::Cancelled {
            return false;
        }
        self.from.is_none_or(|from| order.created_at >= from)
            && self.to.is_none_or(|to| order.created_at < to)
    }
}

/// Calendar bucket for time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    #[default]
    Day,
    Month,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Day => "day",
            Bucket::Month => "month",
        }
    }
}

impl FromStr for Bucket {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Bucket::Day),
            "month" | "monthly" => Ok(Bucket::Month),
            _ => Err(ParseError::new("bucket", s)),
        }
    }
}

/// Category a line is reported under. Products deleted since the order
/// have no current category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryKey {
    Current(Category),
    Unavailable,
}

impl CategoryKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKey::Current(category) => category.as_str(),
            CategoryKey::Unavailable => "unavailable",
        }
    }
}

impl Serialize for CategoryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: ProductId,
    /// Current catalog name, or the order-time name if the product is gone.
    pub name: String,
    pub available: bool,
    pub units_sold: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRevenue {
    pub category: CategoryKey,
    pub revenue: Money,
    pub units_sold: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRevenue {
    /// First calendar day of the bucket in the reporting timezone.
    pub bucket_start: NaiveDate,
    pub label: String,
    pub revenue: Money,
    pub order_count: u64,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use common::{OrderId, UserId};
    use store::Version;

    use super::*;

    fn order_at(created_at: DateTime<Utc>, status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(),
            purchaser_id: UserId::new(),
            purchaser_name: "p".to_string(),
            items: vec![],
            total_amount: Money::zero(),
            status,
            stock_reserved: false,
            created_at,
            updated_at: created_at,
            version: Version::first(),
        }
    }

    #[test]
    fn window_is_half_open() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = from + Duration::days(1);
        let filter = SalesFilter::between(from, to);

        assert!(filter.admits(&order_at(from, OrderStatus::Shipped)));
        assert!(!filter.admits(&order_at(to, OrderStatus::Shipped)));
        assert!(!filter.admits(&order_at(from - Duration::seconds(1), OrderStatus::Shipped)));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let at = Utc::now();
        assert!(SalesFilter::between(at, at).validate().is_err());
        assert!(SalesFilter::new().validate().is_ok());
    }

    #[test]
    fn cancelled_orders_can_be_excluded() {
        let order = order_at(Utc::now(), OrderStatus::Cancelled);
        assert!(SalesFilter::new().admits(&order));
        assert!(!SalesFilter::new().exclude_cancelled().admits(&order));
    }

    #[test]
    fn bucket_parses() {
        assert_eq!("Monthly".parse::<Bucket>().unwrap(), Bucket::Month);
        assert!("week".parse::<Bucket>().is_err());
    }

    #[test]
    fn category_key_serializes_as_name() {
        assert_eq!(
            serde_json::to_string(&CategoryKey::Current(Category::Tops)).unwrap(),
            "\"tops\""
        );
        assert_eq!(
            serde_json::to_string(&CategoryKey::Unavailable).unwrap(),
            "\"unavailable\""
        );
    }
}
