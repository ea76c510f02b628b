//! Order placement, listing, status and checkout endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderStatus, ProductId, UserId};
use domain::{CartSnapshot, OrderFilters, OrderView, PaymentSession, ProductRef, SetOrderStatus};
use serde::Serialize;
use store::{DomainStore, Order, OrderLine};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::routes::parse_id;
use crate::state::AppState;

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub purchaser_id: UserId,
    pub purchaser_name: String,
    pub status: OrderStatus,
    /// Total in cents.
    pub total_amount: Money,
    pub items: Vec<OrderLineResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: String,
    pub quantity: u32,
    /// Unit price in cents, as charged when the order was placed.
    pub unit_price: Money,
    /// Current catalog state of the product, on read endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductRef>,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.product_name,
            image_url: line.image_url,
            quantity: line.quantity,
            unit_price: line.unit_price,
            product: None,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            purchaser_id: order.purchaser_id,
            purchaser_name: order.purchaser_name,
            status: order.status,
            total_amount: order.total_amount,
            items: order.items.into_iter().map(OrderLineResponse::from).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<OrderView> for OrderResponse {
    fn from(view: OrderView) -> Self {
        let items = view
            .lines
            .into_iter()
            .map(|line| {
                let product_name = line.display_name().to_string();
                OrderLineResponse {
                    product_name,
                    product: Some(line.product),
                    ..OrderLineResponse::from(line.line)
                }
            })
            .collect();
        Self {
            purchaser_name: view.purchaser_name,
            items,
            ..OrderResponse::from(view.order)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_ref: String,
    pub redirect_url: Option<String>,
}

impl From<PaymentSession> for CheckoutResponse {
    fn from(session: PaymentSession) -> Self {
        Self {
            session_ref: session.session_ref,
            redirect_url: session.redirect_url,
        }
    }
}

fn order_id(raw: &str) -> Result<OrderId, ApiError> {
    parse_id("order", raw, OrderId::parse)
}

fn views(views: Vec<OrderView>) -> Json<Vec<OrderResponse>> {
    Json(views.into_iter().map(OrderResponse::from).collect())
}

// -- Handlers --

/// POST /orders: places an order from the caller's cart.
#[tracing::instrument(skip_all)]
pub async fn create<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Json(cart): Json<CartSnapshot>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.orders.create_order(&identity, cart).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/mine: the caller's orders, newest first.
pub async fn mine<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    Ok(views(state.orders.list_my_orders(&identity).await?))
}

/// GET /orders: every order. Admin only.
///
/// Query parameters: `status`, `sortByCreatedAt` (`asc` or `desc`) and
/// `purchaserNameContains`.
pub async fn list<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let filters = OrderFilters::from_pairs(
        params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str())),
    )?;
    Ok(views(state.orders.list_all_orders(&identity, filters).await?))
}

/// GET /orders/{id}: purchaser or admin.
pub async fn get<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let view = state.orders.get_order(&identity, order_id(&id)?).await?;
    Ok(Json(view.into()))
}

/// PUT /orders/{id}/status: admin only.
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn set_status<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    Json(body): Json<SetOrderStatus>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = order_id(&id)?;
    let status = body.parse()?;
    let order = state.orders.set_status(&identity, order_id, status).await?;
    Ok(Json(order.into()))
}

/// POST /orders/{id}/checkout: opens a payment session for the caller's order.
pub async fn checkout<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let session = state
        .checkout
        .begin_checkout(&identity, order_id(&id)?)
        .await?;
    Ok(Json(session.into()))
}
