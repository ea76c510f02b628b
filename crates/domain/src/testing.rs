//! Fixtures shared by the unit tests.

use chrono::Utc;
use common::{Role, UserId};
use store::{DomainStore, InMemoryStore, User, Version};

use crate::auth::Identity;

/// Inserts a user with the given role and returns its identity.
pub(crate) async fn member(store: &InMemoryStore, role: Role, name: &str) -> Identity {
    let id = UserId::new();
    let now = Utc::now();
    let user = store
        .insert_user(User {
            id,
            external_subject_id: format!("auth0|{name}-{id}"),
            display_name: name.to_string(),
            email: format!("{name}-{id}@example.com"),
            role,
            created_at: now,
            updated_at: now,
            version: Version::default(),
        })
        .await
        .unwrap();
    Identity::from(&user)
}
