//! Bearer credential extractors.
//!
//! Handlers take a [`Caller`] when the route needs a provisioned account,
//! a [`MaybeCaller`] when anonymous access is allowed, and a [`Credential`]
//! for the provisioning handshake, which runs before the account exists.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domain::{Identity, VerifiedCredential};
use store::DomainStore;

use crate::error::ApiError;
use crate::state::AppState;

/// Returns the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// A caller with a provisioned account.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

/// A caller who may be anonymous.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Identity>);

/// A verified credential that may not have an account yet.
#[derive(Debug, Clone)]
pub struct Credential(pub VerifiedCredential);

impl<S> FromRequestParts<Arc<AppState<S>>> for Caller
where
    S: DomainStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let identity = state.gate.authenticate(bearer_token(&parts.headers)).await?;
        Ok(Caller(identity))
    }
}

impl<S> FromRequestParts<Arc<AppState<S>>> for MaybeCaller
where
    S: DomainStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let identity = state
            .gate
            .authenticate_optional(bearer_token(&parts.headers))
            .await?;
        Ok(MaybeCaller(identity))
    }
}

impl<S> FromRequestParts<Arc<AppState<S>>> for Credential
where
    S: DomainStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let credential = state
            .gate
            .verify_credential(bearer_token(&parts.headers))
            .await?;
        Ok(Credential(credential))
    }
}
