//! Credential verification seam.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Claims extracted from a verified bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedCredential {
    pub subject: String,
    pub email: String,
    pub role_claim: Option<Role>,
    pub name: Option<String>,
}

impl VerifiedCredential {
    pub fn new(subject: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
            role_claim: None,
            name: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role_claim = Some(role);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    /// The credential is malformed, expired or signed by someone else.
    #[error("invalid credential: {0}")]
    Invalid(String),

    /// The verifier could not be reached.
    #[error("credential verifier unavailable: {0}")]
    Unavailable(String),
}

/// Validates a bearer credential and yields the subject's claims.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedCredential, VerifyError>;
}

#[derive(Debug, Default)]
struct StaticState {
    tokens: HashMap<String, VerifiedCredential>,
    unavailable: bool,
}

/// Verifier backed by a fixed token table. Used for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialVerifier {
    state: Arc<RwLock<StaticState>>,
}

impl StaticCredentialVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, token: impl Into<String>, credential: VerifiedCredential) {
        self.state
            .write()
            .await
            .tokens
            .insert(token.into(), credential);
    }

    pub async fn revoke(&self, token: &str) {
        self.state.write().await.tokens.remove(token);
    }

    /// Makes every subsequent verification fail as if the provider were down.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentialVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedCredential, VerifyError> {
        let state = self.state.read().await;
        if state.unavailable {
            return Err(VerifyError::Unavailable(
                "static verifier switched off".to_string(),
            ));
        }
        state
            .tokens
            .get(token)
            .cloned()
            .ok_or_else(|| VerifyError::Invalid("unknown token".to_string()))
    }
}
