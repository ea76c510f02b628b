//! Authorization Gate.
//!
//! Authentication turns a bearer credential into an [`Identity`]; every
//! downstream operation receives that identity as an explicit argument and
//! checks capabilities with [`require_role`] or [`require_owner_or_admin`].

mod jwt;
mod verifier;

use std::sync::Arc;

use common::{Role, UserId};
use serde::Serialize;
use store::{DomainStore, User};

use crate::error::{DomainError, Result};

pub use jwt::{JwtCredentialVerifier, TokenClaims};
pub use verifier::{CredentialVerifier, StaticCredentialVerifier, VerifiedCredential, VerifyError};

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: UserId,
    pub subject: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            subject: user.external_subject_id.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

fn deny(kind: &'static str, identity: Option<&Identity>, reason: String) {
    metrics::counter!("authorization_denied_total", "kind" => kind).increment(1);
    match identity {
        Some(identity) => tracing::warn!(user_id = %identity.user_id, %reason, "access denied"),
        None => tracing::warn!(%reason, "access denied"),
    }
}

/// Fails with `Forbidden` unless the identity's role is one of `allowed`.
pub fn require_role(identity: &Identity, allowed: &[Role]) -> Result<()> {
    if allowed.contains(&identity.role) {
        return Ok(());
    }
    let reason = format!("role {} may not perform this operation", identity.role);
    deny("forbidden", Some(identity), reason.clone());
    Err(DomainError::Forbidden(reason))
}

/// Fails with `Forbidden` unless the identity owns the resource or is an admin.
pub fn require_owner_or_admin(identity: &Identity, owner: UserId) -> Result<()> {
    if identity.user_id == owner || identity.is_admin() {
        return Ok(());
    }
    let reason = "only the owner or an admin may perform this operation".to_string();
    deny("forbidden", Some(identity), reason.clone());
    Err(DomainError::Forbidden(reason))
}

/// Fails with `Forbidden` unless the identity owns the resource. Admins get no bypass.
pub fn require_owner(identity: &Identity, owner: UserId) -> Result<()> {
    if identity.user_id == owner {
        return Ok(());
    }
    let reason = "only the owner may perform this operation".to_string();
    deny("forbidden", Some(identity), reason.clone());
    Err(DomainError::Forbidden(reason))
}

/// Resolves bearer credentials into provisioned identities.
#[derive(Clone)]
pub struct AuthGate<S: DomainStore> {
    store: S,
    verifier: Arc<dyn CredentialVerifier>,
}

impl<S: DomainStore> AuthGate<S> {
    pub fn new(store: S, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Verifies the credential without requiring a provisioned account.
    ///
    /// Used by the provisioning handshake, which runs before a user record exists.
    pub async fn verify_credential(&self, token: Option<&str>) -> Result<VerifiedCredential> {
        let token = match token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => {
                let reason = "missing bearer credential".to_string();
                deny("unauthenticated", None, reason.clone());
                return Err(DomainError::Unauthenticated(reason));
            }
        };

        match self.verifier.verify(token).await {
            Ok(credential) => Ok(credential),
            Err(VerifyError::Invalid(reason)) => {
                deny("unauthenticated", None, reason.clone());
                Err(DomainError::Unauthenticated(reason))
            }
            Err(VerifyError::Unavailable(reason)) => {
                tracing::error!(%reason, "credential verifier unavailable");
                Err(DomainError::DependencyFailure {
                    dependency: "credential verifier",
                    reason,
                })
            }
        }
    }

    /// Verifies the credential and loads the caller's account.
    #[tracing::instrument(skip(self, token))]
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity> {
        let credential = self.verify_credential(token).await?;
        match self.store.find_user_by_subject(&credential.subject).await? {
            Some(user) => Ok(Identity::from(&user)),
            None => {
                let reason = "account has not been provisioned".to_string();
                deny("unauthenticated", None, reason.clone());
                Err(DomainError::Unauthenticated(reason))
            }
        }
    }

    /// Like [`AuthGate::authenticate`], but an absent credential yields `None`.
    ///
    /// A credential that is present but invalid is still rejected.
    pub async fn authenticate_optional(&self, token: Option<&str>) -> Result<Option<Identity>> {
        match token.map(str::trim) {
            None | Some("") => Ok(None),
            Some(token) => self.authenticate(Some(token)).await.map(Some),
        }
    }
}
