//! User operation inputs.

use common::Role;
use serde::Deserialize;

use crate::error::{DomainError, Result};

pub const MAX_DISPLAY_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 254;

/// Body of the provisioning handshake. The credential supplies everything
/// else; a display name may be given to override the token's `name` claim.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionUser {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Changes a user makes to their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetUserRole {
    pub role: Role,
}

/// Trims and bounds a display name.
pub fn validate_display_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::invalid("display name must not be empty"));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(DomainError::invalid(format!(
            "display name must be at most {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Lowercases an email address and checks its basic shape.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.len() > MAX_EMAIL_LEN {
        return Err(DomainError::invalid("email address is too long"));
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace) =>
        {
            Ok(email)
        }
        _ => Err(DomainError::invalid(format!(
            "'{email}' is not a valid email address"
        ))),
    }
}
