//! Group/sort stages behind the sales views.
//!
//! Each accumulator consumes orders one at a time and keeps only per-group
//! totals, so a report over a streamed order set holds O(groups) state.
//! `finish` joins the groups with current catalog data and sorts them.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{Datelike, FixedOffset, NaiveDate};
use common::{Money, ProductId};
use store::{Order, Product};

use crate::error::{AnalyticsError, Result};
use crate::report::{Bucket, CategoryKey, CategoryRevenue, PeriodRevenue, TopProduct};

/// Units sold per product.
#[derive(Debug, Default)]
pub struct TopSelling {
    units: HashMap<ProductId, u64>,
    /// Order-time name, used when the product no longer exists.
    snapshot_names: HashMap<ProductId, String>,
}

impl TopSelling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, order: &Order) {
        for line in &order.items {
            *self.units.entry(line.product_id).or_default() += u64::from(line.quantity);
            self.snapshot_names
                .entry(line.product_id)
                .or_insert_with(|| line.product_name.clone());
        }
    }

    /// Product ids of the `limit` best sellers, best first.
    ///
    /// Equal sums are ordered by ascending product id.
    pub fn ranked(&self, limit: usize) -> Vec<(ProductId, u64)> {
        let mut ranked: Vec<(ProductId, u64)> =
            self.units.iter().map(|(id, units)| (*id, *units)).collect();
        ranked.sort_by_key(|(id, units)| (Reverse(*units), *id));
        ranked.truncate(limit);
        ranked
    }

    pub fn finish(&self, limit: usize, catalog: &HashMap<ProductId, Product>) -> Vec<TopProduct> {
        self.ranked(limit)
            .into_iter()
            .map(|(product_id, units_sold)| match catalog.get(&product_id) {
                Some(product) => TopProduct {
                    product_id,
                    name: product.name.clone(),
                    available: true,
                    units_sold,
                },
                None => TopProduct {
                    product_id,
                    name: self
                        .snapshot_names
                        .get(&product_id)
                        .cloned()
                        .unwrap_or_default(),
                    available: false,
                    units_sold,
                },
            })
            .collect()
    }
}

/// Revenue per product, later regrouped by current category.
///
/// Lines are kept per product rather than per category so the category join
/// uses the catalog as it is when the report finishes.
#[derive(Debug, Default)]
pub struct CategorySales {
    per_product: HashMap<ProductId, (Money, u64)>,
}

impl CategorySales {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, order: &Order) -> Result<()> {
        for line in &order.items {
            let amount = line
                .line_total()
                .ok_or(AnalyticsError::Overflow("category revenue"))?;
            let entry = self
                .per_product
                .entry(line.product_id)
                .or_insert((Money::zero(), 0));
            entry.0 = entry
                .0
                .checked_add(amount)
                .ok_or(AnalyticsError::Overflow("category revenue"))?;
            entry.1 += u64::from(line.quantity);
        }
        Ok(())
    }

    /// Sorted by revenue, highest first; ties by category name.
    pub fn finish(&self, catalog: &HashMap<ProductId, Product>) -> Result<Vec<CategoryRevenue>> {
        let mut groups: HashMap<CategoryKey, (Money, u64)> = HashMap::new();
        for (product_id, (revenue, units)) in &self.per_product {
            let key = catalog
                .get(product_id)
                .map(|p| CategoryKey::Current(p.category))
                .unwrap_or(CategoryKey::Unavailable);
            let entry = groups.entry(key).or_insert((Money::zero(), 0));
            entry.0 = entry
                .0
                .checked_add(*revenue)
                .ok_or(AnalyticsError::Overflow("category revenue"))?;
            entry.1 += units;
        }

        let mut rows: Vec<CategoryRevenue> = groups
            .into_iter()
            .map(|(category, (revenue, units_sold))| CategoryRevenue {
                category,
                revenue,
                units_sold,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.revenue
                .cmp(&a.revenue)
                .then_with(|| a.category.as_str().cmp(b.category.as_str()))
        });
        Ok(rows)
    }
}

/// Order totals per calendar bucket in a fixed reporting timezone.
#[derive(Debug)]
pub struct RevenueOverTime {
    bucket: Bucket,
    offset: FixedOffset,
    buckets: HashMap<NaiveDate, (Money, u64)>,
}

impl RevenueOverTime {
    pub fn new(bucket: Bucket, offset: FixedOffset) -> Self {
        Self {
            bucket,
            offset,
            buckets: HashMap::new(),
        }
    }

    fn bucket_start(&self, order: &Order) -> Result<NaiveDate> {
        let local = order.created_at.with_timezone(&self.offset).date_naive();
        match self.bucket {
            Bucket::Day => Ok(local),
            Bucket::Month => NaiveDate::from_ymd_opt(local.year(), local.month(), 1).ok_or_else(
                || AnalyticsError::InvalidParameters(format!("no month start for {local}")),
            ),
        }
    }

    pub fn add(&mut self, order: &Order) -> Result<()> {
        let start = self.bucket_start(order)?;
        let entry = self.buckets.entry(start).or_insert((Money::zero(), 0));
        entry.0 = entry
            .0
            .checked_add(order.total_amount)
            .ok_or(AnalyticsError::Overflow("revenue over time"))?;
        entry.1 += 1;
        Ok(())
    }

    /// Sorted by bucket start, oldest first.
    pub fn finish(self) -> Vec<PeriodRevenue> {
        let bucket = self.bucket;
        let mut rows: Vec<PeriodRevenue> = self
            .buckets
            .into_iter()
            .map(|(bucket_start, (revenue, order_count))| PeriodRevenue {
                bucket_start,
                label: match bucket {
                    Bucket::Day => bucket_start.format("%Y-%m-%d").to_string(),
                    Bucket::Month => bucket_start.format("%Y-%m").to_string(),
                },
                revenue,
                order_count,
            })
            .collect();
        rows.sort_by_key(|row| row.bucket_start);
        rows
    }
}
