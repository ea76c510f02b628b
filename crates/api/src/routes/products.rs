//! Catalog and stock endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Category, Money, ProductId, UserId};
use domain::{AdjustStock, CreateProduct, ListProducts, UpdateProduct};
use serde::Serialize;
use store::{DomainStore, Product};

use crate::auth::{Caller, MaybeCaller};
use crate::error::ApiError;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub category: Category,
    pub description: Option<String>,
    pub image_url: String,
    /// Price in cents.
    pub price: Money,
    pub count_in_stock: u32,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            category: p.category,
            description: p.description,
            image_url: p.image_url,
            price: p.price,
            count_in_stock: p.count_in_stock,
            created_by: p.created_by,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

fn product_id(raw: &str) -> Result<ProductId, ApiError> {
    parse_id("product", raw, ProductId::parse)
}

/// GET /products: anonymous browsing; `?mine=true` needs a credential.
pub async fn list<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    MaybeCaller(identity): MaybeCaller,
    Query(filters): Query<ListProducts>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state
        .products
        .list_products(identity.as_ref(), filters)
        .await?;
    Ok(Json(
        products.into_iter().map(ProductResponse::from).collect(),
    ))
}

/// POST /products
pub async fn create<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Json(input): Json<CreateProduct>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state.products.create_product(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products/{id}
pub async fn get<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.products.get_product(product_id(&id)?).await?;
    Ok(Json(product.into()))
}

/// PUT /products/{id}: owner or admin.
pub async fn update<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    Json(update): Json<UpdateProduct>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .products
        .update_product(&identity, product_id(&id)?, update)
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /products/{id}: owner or admin.
pub async fn delete<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .products
        .delete_product(&identity, product_id(&id)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /products/{id}/stock: sets the absolute stock count.
pub async fn adjust_stock<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    Json(body): Json<AdjustStock>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .inventory
        .adjust_stock(&identity, product_id(&id)?, body.count_in_stock)
        .await?;
    Ok(Json(product.into()))
}
