//! HTTP API server with observability for the storefront core.
//!
//! Exposes accounts, catalog, orders, checkout and sales reports over REST,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use analytics::AnalyticsError;
use axum::Router;
use axum::routing::{get, post, put};
use domain::{CredentialVerifier, PaymentSessionCreator, StorefrontSettings};
use metrics_exporter_prometheus::PrometheusHandle;
use store::DomainStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DomainStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/users",
            post(routes::users::provision::<S>).get(routes::users::list::<S>),
        )
        .route(
            "/users/me",
            get(routes::users::me::<S>).patch(routes::users::update_me::<S>),
        )
        .route("/users/{id}", axum::routing::delete(routes::users::delete::<S>))
        .route("/users/{id}/role", put(routes::users::set_role::<S>))
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route(
            "/products/{id}/stock",
            put(routes::products::adjust_stock::<S>),
        )
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/mine", get(routes::orders::mine::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", put(routes::orders::set_status::<S>))
        .route("/orders/{id}/checkout", post(routes::orders::checkout::<S>))
        .route(
            "/analytics/top-products",
            get(routes::analytics::top_products::<S>),
        )
        .route(
            "/analytics/category-sales",
            get(routes::analytics::category_sales::<S>),
        )
        .route(
            "/analytics/sales",
            get(routes::analytics::sales_over_time::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `store` with the given collaborators.
pub fn create_default_state<S: DomainStore + Clone + 'static>(
    store: S,
    verifier: Arc<dyn CredentialVerifier>,
    payments: Arc<dyn PaymentSessionCreator>,
    settings: &StorefrontSettings,
) -> Result<Arc<AppState<S>>, AnalyticsError> {
    Ok(Arc::new(AppState::new(store, verifier, payments, settings)?))
}
