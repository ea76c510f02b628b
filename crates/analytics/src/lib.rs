//! Sales analytics for the storefront core.
//!
//! Three read-only views over the order store, recomputed on every call:
//! - top-selling products by units sold
//! - revenue per current product category
//! - revenue and order counts per day or month in a fixed reporting timezone

pub mod error;
pub mod pipeline;
pub mod report;
pub mod service;

pub use error::{AnalyticsError, Result};
pub use pipeline::{CategorySales, RevenueOverTime, TopSelling};
pub use report::{
    Bucket, CategoryKey, CategoryRevenue, PeriodRevenue, SalesFilter, TopProduct,
};
pub use service::ReportingService;
