//! HS256 bearer token verification.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::Role;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::verifier::{CredentialVerifier, VerifiedCredential, VerifyError};

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(subject: impl Into<String>, email: impl Into<String>, ttl: Duration) -> Self {
        Self {
            sub: subject.into(),
            email: email.into(),
            name: None,
            role: None,
            iss: None,
            exp: (Utc::now() + ttl).timestamp(),
        }
    }
}

/// Verifies HS256 tokens signed with a shared secret.
#[derive(Clone)]
pub struct JwtCredentialVerifier {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
    issuer: Option<String>,
}

impl JwtCredentialVerifier {
    pub fn new(secret: &[u8], issuer: Option<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }
        Self {
            decoding: DecodingKey::from_secret(secret),
            encoding: EncodingKey::from_secret(secret),
            validation,
            issuer,
        }
    }

    /// Signs claims with the verifier's secret, filling in the issuer when configured.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, VerifyError> {
        let mut claims = claims.clone();
        if claims.iss.is_none() {
            claims.iss = self.issuer.clone();
        }
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| VerifyError::Invalid(format!("jwt encode: {e}")))
    }
}

impl std::fmt::Debug for JwtCredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCredentialVerifier")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialVerifier for JwtCredentialVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedCredential, VerifyError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| VerifyError::Invalid(e.to_string()))?;
        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(VerifyError::Invalid("empty subject".to_string()));
        }
        Ok(VerifiedCredential {
            subject: claims.sub,
            email: claims.email,
            role_claim: claims.role,
            name: claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-with-enough-bytes-for-hs256";

    #[tokio::test]
    async fn signed_token_verifies() {
        let verifier = JwtCredentialVerifier::new(SECRET, None);
        let mut claims = TokenClaims::new("auth0|42", "ada@example.com", Duration::minutes(5));
        claims.role = Some(Role::Admin);
        claims.name = Some("Ada".to_string());

        let token = verifier.sign(&claims).unwrap();
        let credential = verifier.verify(&token).await.unwrap();

        assert_eq!(credential.subject, "auth0|42");
        assert_eq!(credential.email, "ada@example.com");
        assert_eq!(credential.role_claim, Some(Role::Admin));
        assert_eq!(credential.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let verifier = JwtCredentialVerifier::new(SECRET, None);
        let claims = TokenClaims::new("auth0|42", "ada@example.com", Duration::hours(-2));
        let token = verifier.sign(&claims).unwrap();

        assert!(matches!(
            verifier.verify(&token).await,
            Err(VerifyError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let signer = JwtCredentialVerifier::new(b"another-secret-another-secret-xx", None);
        let verifier = JwtCredentialVerifier::new(SECRET, None);
        let token = signer
            .sign(&TokenClaims::new("s", "s@example.com", Duration::minutes(5)))
            .unwrap();

        assert!(verifier.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn issuer_is_enforced_when_configured() {
        let foreign = JwtCredentialVerifier::new(SECRET, Some("someone-else".to_string()));
        let verifier = JwtCredentialVerifier::new(SECRET, Some("storefront".to_string()));

        let good = verifier
            .sign(&TokenClaims::new("s", "s@example.com", Duration::minutes(5)))
            .unwrap();
        let bad = foreign
            .sign(&TokenClaims::new("s", "s@example.com", Duration::minutes(5)))
            .unwrap();

        assert!(verifier.verify(&good).await.is_ok());
        assert!(verifier.verify(&bad).await.is_err());
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let verifier = JwtCredentialVerifier::new(SECRET, None);
        assert!(verifier.verify("not.a.jwt").await.is_err());
    }
}
