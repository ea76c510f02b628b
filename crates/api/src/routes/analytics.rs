//! Sales report endpoints. Admin only.

use std::sync::Arc;

use analytics::{Bucket, CategoryRevenue, PeriodRevenue, SalesFilter, TopProduct};
use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use store::DomainStore;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters shared by every report.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    /// Inclusive lower bound, RFC 3339.
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound, RFC 3339.
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exclude_cancelled: bool,
    /// Time series granularity; `day` when absent.
    #[serde(default)]
    pub bucket: Option<Bucket>,
}

impl ReportParams {
    fn filter(&self) -> SalesFilter {
        SalesFilter {
            from: self.from,
            to: self.to,
            exclude_cancelled: self.exclude_cancelled,
        }
    }
}

/// GET /analytics/top-products
pub async fn top_products<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Query(params): Query<ReportParams>,
) -> Result<Json<Vec<TopProduct>>, ApiError> {
    let rows = state
        .reports
        .top_selling_products(&identity, params.filter())
        .await?;
    Ok(Json(rows))
}

/// GET /analytics/category-sales
pub async fn category_sales<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Query(params): Query<ReportParams>,
) -> Result<Json<Vec<CategoryRevenue>>, ApiError> {
    let rows = state
        .reports
        .category_sales(&identity, params.filter())
        .await?;
    Ok(Json(rows))
}

/// GET /analytics/sales?bucket=day|month
pub async fn sales_over_time<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Query(params): Query<ReportParams>,
) -> Result<Json<Vec<PeriodRevenue>>, ApiError> {
    let bucket = params.bucket.unwrap_or_default();
    let rows = state
        .reports
        .sales_over_time(&identity, bucket, params.filter())
        .await?;
    Ok(Json(rows))
}
