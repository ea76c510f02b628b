//! Product catalog service.

use chrono::Utc;
use common::{ProductId, Role};
use store::{DomainStore, DomainStoreExt, Product, ProductQuery, Version, WriteOptions};

use super::commands::{CreateProduct, ListProducts, UpdateProduct};
use crate::auth::{Identity, require_owner_or_admin, require_role};
use crate::error::{DomainError, Result};

/// Service for managing the product catalog.
#[derive(Clone)]
pub struct ProductService<S: DomainStore> {
    store: S,
}

impl<S: DomainStore> ProductService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, identity, input), fields(user_id = %identity.user_id))]
    pub async fn create_product(
        &self,
        identity: &Identity,
        input: CreateProduct,
    ) -> Result<Product> {
        require_role(identity, &[Role::User, Role::Admin])?;
        let new = input.validate()?;

        let now = Utc::now();
        let product = self
            .store
            .insert_product(Product {
                id: ProductId::new(),
                name: new.name,
                category: new.category,
                description: new.description,
                image_url: new.image_url,
                price: new.price,
                count_in_stock: new.count_in_stock,
                created_by: identity.user_id,
                created_at: now,
                updated_at: now,
                version: Version::default(),
            })
            .await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Lists the catalog. Anonymous callers may list everything except `mine`.
    #[tracing::instrument(skip(self, caller))]
    pub async fn list_products(
        &self,
        caller: Option<&Identity>,
        filters: ListProducts,
    ) -> Result<Vec<Product>> {
        let mut query = ProductQuery::new();
        if let Some(category) = filters.category {
            query = query.category(category);
        }
        if let Some(needle) = filters.name_contains.filter(|n| !n.trim().is_empty()) {
            query = query.name_contains(needle.trim());
        }
        if filters.mine {
            let identity = caller.ok_or_else(|| {
                DomainError::Unauthenticated("listing your own products requires sign-in".into())
            })?;
            query = query.created_by(identity.user_id);
        }
        Ok(self.store.list_products(query).await?)
    }

    /// Reads one product. The only operation that needs no identity.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        Ok(self.store.require_product(id).await?)
    }

    #[tracing::instrument(skip(self, identity, update), fields(user_id = %identity.user_id))]
    pub async fn update_product(
        &self,
        identity: &Identity,
        id: ProductId,
        update: UpdateProduct,
    ) -> Result<Product> {
        let current = self.store.require_product(id).await?;
        require_owner_or_admin(identity, current.created_by)?;

        let expected = current.version;
        let mut product = current;
        update.apply_to(&mut product)?;
        product.updated_at = Utc::now();

        let product = self
            .store
            .update_product(product, WriteOptions::expect_version(expected))
            .await?;
        tracing::info!(product_id = %id, version = %product.version, "product updated");
        Ok(product)
    }

    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn delete_product(&self, identity: &Identity, id: ProductId) -> Result<()> {
        let current = self.store.require_product(id).await?;
        require_owner_or_admin(identity, current.created_by)?;

        if !self.store.delete_product(id).await? {
            return Err(DomainError::not_found("Product", id));
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::Category;
    use store::InMemoryStore;

    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::member;

    fn input(name: &str, category: Category) -> CreateProduct {
        CreateProduct {
            name: name.to_string(),
            category,
            description: None,
            image_url: "/img/p.png".to_string(),
            price: 1_000,
            count_in_stock: 5,
        }
    }

    #[tokio::test]
    async fn guests_cannot_create_products() {
        let store = InMemoryStore::new();
        let service = ProductService::new(store.clone());
        let guest = member(&store, Role::Guest, "guest").await;
        let err = service
            .create_product(&guest, input("Tee", Category::Tops))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn create_records_the_owner() {
        let store = InMemoryStore::new();
        let service = ProductService::new(store.clone());
        let owner = member(&store, Role::User, "owner").await;
        let product = service
            .create_product(&owner, input("Tee", Category::Tops))
            .await
            .unwrap();
        assert_eq!(product.created_by, owner.user_id);
        assert_eq!(product.version, Version::first());
        assert_eq!(service.get_product(product.id).await.unwrap(), product);
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_edit_or_delete() {
        let store = InMemoryStore::new();
        let service = ProductService::new(store.clone());
        let owner = member(&store, Role::User, "owner").await;
        let stranger = member(&store, Role::User, "stranger").await;
        let admin = member(&store, Role::Admin, "admin").await;
        let product = service
            .create_product(&owner, input("Tee", Category::Tops))
            .await
            .unwrap();

        let rename = UpdateProduct {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert_eq!(
            service
                .update_product(&stranger, product.id, rename.clone())
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            service
                .delete_product(&stranger, product.id)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(service.get_product(product.id).await.unwrap().name, "Tee");

        let updated = service
            .update_product(&admin, product.id, rename)
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");

        service.delete_product(&owner, product.id).await.unwrap();
        assert_eq!(
            service.get_product(product.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn listing_filters_and_requires_identity_for_mine() {
        let store = InMemoryStore::new();
        let service = ProductService::new(store.clone());
        let owner = member(&store, Role::User, "owner").await;
        let other = member(&store, Role::User, "other").await;
        service
            .create_product(&owner, input("Denim Jacket", Category::Outerwear))
            .await
            .unwrap();
        service
            .create_product(&other, input("Silk Top", Category::Tops))
            .await
            .unwrap();

        let all = service
            .list_products(None, ListProducts::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let tops = service
            .list_products(
                None,
                ListProducts {
                    category: Some(Category::Tops),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(tops.len(), 1);

        let jackets = service
            .list_products(
                None,
                ListProducts {
                    name_contains: Some("JACKET".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(jackets[0].name, "Denim Jacket");

        let mine = ListProducts {
            mine: true,
            ..Default::default()
        };
        assert_eq!(
            service
                .list_products(None, mine.clone())
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::Unauthenticated
        );
        let owned = service.list_products(Some(&owner), mine).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].created_by, owner.user_id);
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let store = InMemoryStore::new();
        let service = ProductService::new(store.clone());
        let owner = member(&store, Role::User, "owner").await;
        for name in ["A", "B", "C"] {
            service
                .create_product(&owner, input(name, Category::Shoes))
                .await
                .unwrap();
        }
        let first = serde_json::to_vec(
            &service
                .list_products(None, ListProducts::default())
                .await
                .unwrap(),
        )
        .unwrap();
        let second = serde_json::to_vec(
            &service
                .list_products(None, ListProducts::default())
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn creating_for_an_unprovisioned_identity_is_not_found() {
        let store = InMemoryStore::new();
        let service = ProductService::new(store.clone());
        let ghost = member(&store, Role::User, "ghost").await;
        store.delete_user(ghost.user_id).await.unwrap();

        let err = service
            .create_product(&ghost, input("Tee", Category::Tops))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(
            service
                .list_products(None, ListProducts::default())
                .await
                .unwrap()
                .is_empty()
        );
    }
}
