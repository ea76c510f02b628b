//! User service.

use chrono::Utc;
use common::{Role, UserId};
use store::{DomainStore, DomainStoreExt, StoreError, User, Version, WriteOptions};

use super::commands::{ProvisionUser, UpdateProfile, normalize_email, validate_display_name};
use crate::auth::{Identity, VerifiedCredential, require_role};
use crate::error::{DomainError, Result};

/// Outcome of the provisioning handshake.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub user: User,
    /// False when the subject already had an account.
    pub created: bool,
}

/// Service for managing user accounts.
#[derive(Clone)]
pub struct UserService<S: DomainStore> {
    store: S,
}

impl<S: DomainStore> UserService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates the account for a verified credential, or returns the existing one.
    ///
    /// The subject lookup runs before the email lookup so a returning user is
    /// never mistaken for a duplicate registration.
    #[tracing::instrument(skip(self, credential, input), fields(subject = %credential.subject))]
    pub async fn provision(
        &self,
        credential: VerifiedCredential,
        input: ProvisionUser,
    ) -> Result<Provisioned> {
        if let Some(user) = self.store.find_user_by_subject(&credential.subject).await? {
            return Ok(Provisioned {
                user,
                created: false,
            });
        }

        let email = normalize_email(&credential.email)?;
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "email {email} is already registered"
            )));
        }

        let raw_name = input
            .display_name
            .or(credential.name)
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        let display_name = validate_display_name(&raw_name)?;

        let now = Utc::now();
        let candidate = User {
            id: UserId::new(),
            external_subject_id: credential.subject.clone(),
            display_name,
            email,
            role: credential.role_claim.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            version: Version::default(),
        };

        match self.store.insert_user(candidate).await {
            Ok(user) => {
                metrics::counter!("users_provisioned_total").increment(1);
                tracing::info!(user_id = %user.id, role = %user.role, "user provisioned");
                Ok(Provisioned {
                    user,
                    created: true,
                })
            }
            // A concurrent handshake for the same subject won the insert.
            Err(StoreError::UniqueViolation {
                field: "external_subject_id",
                ..
            }) => {
                let user = self
                    .store
                    .find_user_by_subject(&credential.subject)
                    .await?
                    .ok_or_else(|| DomainError::not_found("User", &credential.subject))?;
                Ok(Provisioned {
                    user,
                    created: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn get_own_user(&self, identity: &Identity) -> Result<User> {
        Ok(self.store.require_user(identity.user_id).await?)
    }

    /// Updates the caller's own display name and email.
    #[tracing::instrument(skip(self, identity, update), fields(user_id = %identity.user_id))]
    pub async fn update_user(&self, identity: &Identity, update: UpdateProfile) -> Result<User> {
        let display_name = update
            .display_name
            .as_deref()
            .map(validate_display_name)
            .transpose()?;
        let email = update.email.as_deref().map(normalize_email).transpose()?;

        let current = self.store.require_user(identity.user_id).await?;
        if let Some(email) = &email
            && *email != current.email
            && self.store.find_user_by_email(email).await?.is_some()
        {
            return Err(DomainError::Conflict(format!(
                "email {email} is already registered"
            )));
        }

        let expected = current.version;
        let mut user = current;
        if let Some(display_name) = display_name {
            user.display_name = display_name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        user.updated_at = Utc::now();

        let user = self
            .store
            .update_user(user, WriteOptions::expect_version(expected))
            .await?;
        tracing::info!("profile updated");
        Ok(user)
    }

    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn list_all_users(&self, identity: &Identity) -> Result<Vec<User>> {
        require_role(identity, &[Role::Admin])?;
        Ok(self.store.list_users().await?)
    }

    #[tracing::instrument(skip(self, identity), fields(admin_id = %identity.user_id))]
    pub async fn set_user_role(
        &self,
        identity: &Identity,
        user_id: UserId,
        role: Role,
    ) -> Result<User> {
        require_role(identity, &[Role::Admin])?;
        if user_id == identity.user_id && role != Role::Admin {
            return Err(DomainError::invalid("admins cannot demote themselves"));
        }

        let current = self.store.require_user(user_id).await?;
        if current.role == role {
            return Ok(current);
        }

        let expected = current.version;
        let mut user = current;
        user.role = role;
        user.updated_at = Utc::now();
        let user = self
            .store
            .update_user(user, WriteOptions::expect_version(expected))
            .await?;
        tracing::info!(%user_id, %role, "user role changed");
        Ok(user)
    }

    /// Hard-deletes an account. Orders keep their purchaser snapshot.
    ///
    /// An account that still owns products is refused with a conflict; its
    /// products have to be deleted first.
    #[tracing::instrument(skip(self, identity), fields(admin_id = %identity.user_id))]
    pub async fn delete_user(&self, identity: &Identity, user_id: UserId) -> Result<()> {
        require_role(identity, &[Role::Admin])?;
        if user_id == identity.user_id {
            return Err(DomainError::invalid("admins cannot delete themselves"));
        }
        if !self.store.delete_user(user_id).await? {
            return Err(DomainError::not_found("User", user_id));
        }
        tracing::info!(%user_id, "user deleted");
        Ok(())
    }
}
