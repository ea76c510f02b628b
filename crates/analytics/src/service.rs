//! Admin-gated reporting over the order store.

use std::collections::HashMap;
use std::time::Instant;

use chrono::FixedOffset;
use common::{ProductId, Role};
use domain::{Identity, StorefrontSettings, require_role};
use futures_util::TryStreamExt;
use store::{DomainStore, Order, Product, ProductQuery};

use crate::error::{AnalyticsError, Result};
use crate::pipeline::{CategorySales, RevenueOverTime, TopSelling};
use crate::report::{Bucket, CategoryRevenue, PeriodRevenue, SalesFilter, TopProduct};

/// Computes the sales views on demand. Nothing is cached between calls.
#[derive(Clone)]
pub struct ReportingService<S: DomainStore> {
    store: S,
    offset: FixedOffset,
    top_limit: usize,
}

impl<S: DomainStore> ReportingService<S> {
    pub fn new(store: S, settings: &StorefrontSettings) -> Result<Self> {
        let offset = settings
            .reporting_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                AnalyticsError::InvalidParameters(format!(
                    "reporting offset of {} minutes is out of range",
                    settings.reporting_offset_minutes
                ))
            })?;
        Ok(Self {
            store,
            offset,
            top_limit: settings.top_products_limit,
        })
    }

    pub fn reporting_offset(&self) -> FixedOffset {
        self.offset
    }

    /// Feeds every admitted order through `sink`, one at a time.
    async fn fold_orders<F>(&self, filter: &SalesFilter, mut sink: F) -> Result<u64>
    where
        F: FnMut(&Order) -> Result<()>,
    {
        let mut stream = self.store.stream_orders().await?;
        let mut seen = 0;
        while let Some(order) = stream.try_next().await? {
            if filter.admits(&order) {
                sink(&order)?;
                seen += 1;
            }
        }
        Ok(seen)
    }

    fn gate(identity: &Identity, filter: &SalesFilter) -> Result<()> {
        require_role(identity, &[Role::Admin])?;
        filter.validate()
    }

    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn top_selling_products(
        &self,
        identity: &Identity,
        filter: SalesFilter,
    ) -> Result<Vec<TopProduct>> {
        Self::gate(identity, &filter)?;
        let started = Instant::now();

        let mut top = TopSelling::new();
        let orders = self
            .fold_orders(&filter, |order| {
                top.add(order);
                Ok(())
            })
            .await?;

        let mut catalog = HashMap::new();
        for (product_id, _) in top.ranked(self.top_limit) {
            if let Some(product) = self.store.get_product(product_id).await? {
                catalog.insert(product_id, product);
            }
        }
        let rows = top.finish(self.top_limit, &catalog);

        record("top_selling", started);
        tracing::debug!(orders, rows = rows.len(), "top-selling report computed");
        Ok(rows)
    }

    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn category_sales(
        &self,
        identity: &Identity,
        filter: SalesFilter,
    ) -> Result<Vec<CategoryRevenue>> {
        Self::gate(identity, &filter)?;
        let started = Instant::now();

        let mut sales = CategorySales::new();
        let orders = self.fold_orders(&filter, |order| sales.add(order)).await?;

        let catalog: HashMap<ProductId, Product> = self
            .store
            .list_products(ProductQuery::new())
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let rows = sales.finish(&catalog)?;

        record("category_sales", started);
        tracing::debug!(orders, rows = rows.len(), "category report computed");
        Ok(rows)
    }

    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn sales_over_time(
        &self,
        identity: &Identity,
        bucket: Bucket,
        filter: SalesFilter,
    ) -> Result<Vec<PeriodRevenue>> {
        Self::gate(identity, &filter)?;
        let started = Instant::now();

        let mut series = RevenueOverTime::new(bucket, self.offset);
        let orders = self.fold_orders(&filter, |order| series.add(order)).await?;
        let rows = series.finish();

        record(
            match bucket {
                Bucket::Day => "daily_sales",
                Bucket::Month => "monthly_sales",
            },
            started,
        );
        tracing::debug!(orders, rows = rows.len(), bucket = bucket.as_str(), "time series computed");
        Ok(rows)
    }
}

fn record(view: &'static str, started: Instant) {
    metrics::histogram!("report_duration_seconds", "view" => view)
        .record(started.elapsed().as_secs_f64());
}
