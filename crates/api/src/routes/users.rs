//! Account provisioning and administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Role, UserId};
use domain::{ProvisionUser, SetUserRole, UpdateProfile};
use serde::Serialize;
use store::{DomainStore, User};

use crate::auth::{Caller, Credential};
use crate::error::ApiError;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// POST /users: provisions the account behind the bearer credential.
///
/// Returns `201 Created` for a new account and `200 OK` when the subject
/// already has one.
#[tracing::instrument(skip_all)]
pub async fn provision<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Credential(credential): Credential,
    Json(input): Json<ProvisionUser>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let provisioned = state.users.provision(credential, input).await?;
    let status = if provisioned.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(provisioned.user.into())))
}

/// GET /users/me
pub async fn me<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.get_own_user(&identity).await?;
    Ok(Json(user.into()))
}

/// PATCH /users/me
pub async fn update_me<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Json(update): Json<UpdateProfile>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.update_user(&identity, update).await?;
    Ok(Json(user.into()))
}

/// GET /users: every account. Admin only.
pub async fn list<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list_all_users(&identity).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// PUT /users/{id}/role: admin only.
pub async fn set_role<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    Json(body): Json<SetUserRole>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = parse_id("user", &id, UserId::parse)?;
    let user = state
        .users
        .set_user_role(&identity, user_id, body.role)
        .await?;
    Ok(Json(user.into()))
}

/// DELETE /users/{id}: admin only.
pub async fn delete<S: DomainStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_id("user", &id, UserId::parse)?;
    state.users.delete_user(&identity, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
