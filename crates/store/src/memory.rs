use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, OrderStatus, ProductId, UserId};
use tokio::sync::RwLock;

use crate::{
    Order, OrderQuery, Product, ProductQuery, Result, SortDirection, StockChange, StoreError, User,
    Version,
    store::{DomainStore, OrderStream, WriteOptions, merge_stock_changes},
};

/// In-memory domain store.
///
/// Provides the same interface and invariants as the PostgreSQL implementation.
/// Locks are always taken in the order users, products, orders.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        self.users.write().await.clear();
        self.products.write().await.clear();
        self.orders.write().await.clear();
    }
}

fn check_user_unique(users: &HashMap<UserId, User>, candidate: &User) -> Result<()> {
    for existing in users.values().filter(|u| u.id != candidate.id) {
        if existing.external_subject_id == candidate.external_subject_id {
            return Err(StoreError::UniqueViolation {
                field: "external_subject_id",
                value: candidate.external_subject_id.clone(),
            });
        }
        if existing.email.eq_ignore_ascii_case(&candidate.email) {
            return Err(StoreError::UniqueViolation {
                field: "email",
                value: candidate.email.clone(),
            });
        }
    }
    Ok(())
}

fn sort_orders(orders: &mut [Order], sort: SortDirection) {
    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    if sort == SortDirection::Desc {
        orders.reverse();
    }
}

#[async_trait]
impl DomainStore for InMemoryStore {
    async fn insert_user(&self, mut user: User) -> Result<User> {
        let mut users = self.users.write().await;
        check_user_unique(&users, &user)?;
        if users.contains_key(&user.id) {
            return Err(StoreError::UniqueViolation {
                field: "id",
                value: user.id.to_string(),
            });
        }
        user.version = Version::first();
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.external_subject_id == subject)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = self.users.read().await;
        let mut all: Vec<_> = users.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn update_user(&self, mut user: User, options: WriteOptions) -> Result<User> {
        let mut users = self.users.write().await;
        let current = users
            .get(&user.id)
            .ok_or_else(|| StoreError::not_found("User", user.id))?;
        options.check("User", user.id, current.version)?;
        check_user_unique(&users, &user)?;

        user.version = current.version.next();
        user.updated_at = Utc::now();
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut users = self.users.write().await;
        let products = self.products.read().await;
        if products.values().any(|p| p.created_by == id) {
            return Err(StoreError::StillReferenced {
                entity: "User",
                id: id.to_string(),
                by: "products",
            });
        }
        Ok(users.remove(&id).is_some())
    }

    async fn insert_product(&self, mut product: Product) -> Result<Product> {
        let users = self.users.read().await;
        if !users.contains_key(&product.created_by) {
            return Err(StoreError::not_found("User", product.created_by));
        }

        let mut products = self.products.write().await;
        if products.contains_key(&product.id) {
            return Err(StoreError::UniqueViolation {
                field: "id",
                value: product.id.to_string(),
            });
        }
        product.version = Version::first();
        products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        let needle = query.name_contains.as_deref().map(str::to_lowercase);

        let mut matched: Vec<_> = products
            .values()
            .filter(|p| {
                if let Some(category) = query.category
                    && p.category != category
                {
                    return false;
                }
                if let Some(creator) = query.created_by
                    && p.created_by != creator
                {
                    return false;
                }
                if let Some(ref needle) = needle
                    && !p.name.to_lowercase().contains(needle.as_str())
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(matched)
    }

    async fn update_product(&self, mut product: Product, options: WriteOptions) -> Result<Product> {
        let mut products = self.products.write().await;
        let current = products
            .get(&product.id)
            .ok_or_else(|| StoreError::not_found("Product", product.id))?;
        options.check("Product", product.id, current.version)?;

        product.version = current.version.next();
        product.updated_at = Utc::now();
        products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn set_stock(&self, id: ProductId, count: u32) -> Result<Product> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Product", id))?;

        product.count_in_stock = count;
        product.version = product.version.next();
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        Ok(self.products.write().await.remove(&id).is_some())
    }

    async fn place_order(&self, mut order: Order, decrements: &[StockChange]) -> Result<Order> {
        let decrements = merge_stock_changes(decrements)?;

        let mut products = self.products.write().await;
        let mut orders = self.orders.write().await;

        if orders.contains_key(&order.id) {
            return Err(StoreError::UniqueViolation {
                field: "id",
                value: order.id.to_string(),
            });
        }

        // Validate every decrement before touching anything
        for change in &decrements {
            let product = products
                .get(&change.product_id)
                .ok_or_else(|| StoreError::not_found("Product", change.product_id))?;
            if product.count_in_stock < change.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: change.product_id,
                    requested: change.quantity,
                    available: product.count_in_stock,
                });
            }
        }

        let now = Utc::now();
        for change in &decrements {
            if let Some(product) = products.get_mut(&change.product_id) {
                product.count_in_stock -= change.quantity;
                product.version = product.version.next();
                product.updated_at = now;
            }
        }

        order.version = Version::first();
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matched: Vec<_> = orders
            .values()
            .filter(|o| {
                if let Some(purchaser) = query.purchaser
                    && o.purchaser_id != purchaser
                {
                    return false;
                }
                if let Some(status) = query.status
                    && o.status != status
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        sort_orders(&mut matched, query.sort);
        Ok(matched)
    }

    async fn transition_order(
        &self,
        id: OrderId,
        status: OrderStatus,
        options: WriteOptions,
        restock: &[StockChange],
    ) -> Result<Order> {
        let restock = merge_stock_changes(restock)?;

        let mut products = self.products.write().await;
        let mut orders = self.orders.write().await;

        let order = orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Order", id))?;
        options.check("Order", id, order.version)?;

        // Restock cannot overflow past u32::MAX; reject before writing
        for change in &restock {
            if let Some(product) = products.get(&change.product_id)
                && product.count_in_stock.checked_add(change.quantity).is_none()
            {
                return Err(StoreError::Corrupt(format!(
                    "stock overflow for product {}",
                    change.product_id
                )));
            }
        }

        let now = Utc::now();
        for change in &restock {
            if let Some(product) = products.get_mut(&change.product_id) {
                product.count_in_stock += change.quantity;
                product.version = product.version.next();
                product.updated_at = now;
            }
        }

        order.status = status;
        order.version = order.version.next();
        order.updated_at = now;
        Ok(order.clone())
    }

    async fn stream_orders(&self) -> Result<OrderStream> {
        use futures_util::stream;

        let mut orders: Vec<_> = self.orders.read().await.values().cloned().collect();
        sort_orders(&mut orders, SortDirection::Asc);

        let stream = stream::iter(orders.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use common::{Category, Money, Role};

    use super::*;
    use crate::{DomainStoreExt, OrderLine};

    fn test_user(subject: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            external_subject_id: subject.to_string(),
            display_name: subject.to_string(),
            email: email.to_string(),
            role: Role::User,
            created_at: now,
            updated_at: now,
            version: Version::default(),
        }
    }

    fn test_product(owner: UserId, stock: u32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(),
            name: "Linen Shirt".to_string(),
            category: Category::Tops,
            description: None,
            image_url: "/img/shirt.png".to_string(),
            price: Money::from_cents(2500),
            count_in_stock: stock,
            created_by: owner,
            created_at: now,
            updated_at: now,
            version: Version::default(),
        }
    }

    fn test_order(purchaser: UserId, product: &Product, quantity: u32) -> Order {
        let now = Utc::now();
        let items = vec![OrderLine {
            product_id: product.id,
            product_name: product.name.clone(),
            image_url: product.image_url.clone(),
            quantity,
            unit_price: product.price,
        }];
        Order {
            id: OrderId::new(),
            purchaser_id: purchaser,
            purchaser_name: "buyer".to_string(),
            total_amount: Order::total_of(&items).unwrap(),
            items,
            status: OrderStatus::Unprocessed,
            stock_reserved: false,
            created_at: now,
            updated_at: now,
            version: Version::default(),
        }
    }

    async fn seeded() -> (InMemoryStore, User, Product) {
        let store = InMemoryStore::new();
        let user = store
            .insert_user(test_user("auth0|1", "a@example.com"))
            .await
            .unwrap();
        let product = store.insert_product(test_product(user.id, 10)).await.unwrap();
        (store, user, product)
    }

    #[tokio::test]
    async fn insert_user_assigns_first_version() {
        let store = InMemoryStore::new();
        let user = store
            .insert_user(test_user("auth0|1", "a@example.com"))
            .await
            .unwrap();
        assert_eq!(user.version, Version::first());
    }

    #[tokio::test]
    async fn duplicate_subject_is_rejected() {
        let store = InMemoryStore::new();
        store
            .insert_user(test_user("auth0|1", "a@example.com"))
            .await
            .unwrap();
        let result = store
            .insert_user(test_user("auth0|1", "b@example.com"))
            .await;
        assert!(matches!(
            result,
            Err(StoreError::UniqueViolation {
                field: "external_subject_id",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_ignoring_case() {
        let store = InMemoryStore::new();
        store
            .insert_user(test_user("auth0|1", "a@example.com"))
            .await
            .unwrap();
        let result = store
            .insert_user(test_user("auth0|2", "A@Example.com"))
            .await;
        assert!(matches!(
            result,
            Err(StoreError::UniqueViolation { field: "email", .. })
        ));
    }

    #[tokio::test]
    async fn find_user_by_email_ignores_case() {
        let (store, user, _) = seeded().await;
        let found = store.find_user_by_email("A@EXAMPLE.COM").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn update_user_with_stale_version_conflicts() {
        let (store, user, _) = seeded().await;

        let mut first = user.clone();
        first.display_name = "First".to_string();
        store
            .update_user(first, WriteOptions::expect_version(user.version))
            .await
            .unwrap();

        let mut second = user.clone();
        second.display_name = "Second".to_string();
        let result = store
            .update_user(second, WriteOptions::expect_version(user.version))
            .await;
        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { .. })
        ));

        let stored = store.require_user(user.id).await.unwrap();
        assert_eq!(stored.display_name, "First");
        assert_eq!(stored.version, Version::new(2));
    }

    #[tokio::test]
    async fn insert_product_requires_existing_creator() {
        let store = InMemoryStore::new();
        let result = store.insert_product(test_product(UserId::new(), 1)).await;
        assert!(matches!(result, Err(StoreError::NotFound { entity: "User", .. })));
    }

    #[tokio::test]
    async fn delete_user_is_refused_while_they_own_products() {
        let (store, user, product) = seeded().await;

        let result = store.delete_user(user.id).await;
        assert!(matches!(
            result,
            Err(StoreError::StillReferenced { entity: "User", by: "products", .. })
        ));
        assert!(store.get_user(user.id).await.unwrap().is_some());

        assert!(store.delete_product(product.id).await.unwrap());
        assert!(store.delete_user(user.id).await.unwrap());
        assert!(!store.delete_user(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn set_stock_replaces_count_and_bumps_version() {
        let (store, _, product) = seeded().await;
        let updated = store.set_stock(product.id, 3).await.unwrap();
        assert_eq!(updated.count_in_stock, 3);
        assert_eq!(updated.version, Version::new(2));
    }

    #[tokio::test]
    async fn concurrent_set_stock_applies_every_write() {
        let (store, _, product) = seeded().await;

        let mut handles = Vec::new();
        for count in 0..20u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set_stock(product.id, count).await.unwrap()
            }));
        }
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        // Every write got its own version: no lost updates
        let mut versions: Vec<_> = results.iter().map(|p| p.version.as_i64()).collect();
        versions.sort_unstable();
        assert_eq!(versions, (2..22).collect::<Vec<_>>());

        // The stored value is the one written last
        let last = results.iter().max_by_key(|p| p.version).unwrap();
        let stored = store.require_product(product.id).await.unwrap();
        assert_eq!(stored.count_in_stock, last.count_in_stock);
    }

    #[tokio::test]
    async fn place_order_decrements_stock() {
        let (store, user, product) = seeded().await;
        let order = test_order(user.id, &product, 4);

        store
            .place_order(order, &[StockChange::new(product.id, 4)])
            .await
            .unwrap();

        let stored = store.require_product(product.id).await.unwrap();
        assert_eq!(stored.count_in_stock, 6);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn place_order_with_insufficient_stock_writes_nothing() {
        let (store, user, product) = seeded().await;
        let other = store.insert_product(test_product(user.id, 5)).await.unwrap();
        let order = test_order(user.id, &product, 11);

        let result = store
            .place_order(
                order,
                &[StockChange::new(other.id, 1), StockChange::new(product.id, 11)],
            )
            .await;

        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock {
                requested: 11,
                available: 10,
                ..
            })
        ));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(
            store.require_product(other.id).await.unwrap().count_in_stock,
            5
        );
    }

    #[tokio::test]
    async fn transition_order_restocks_existing_products_only() {
        let (store, user, product) = seeded().await;
        let order = store
            .place_order(
                test_order(user.id, &product, 2),
                &[StockChange::new(product.id, 2)],
            )
            .await
            .unwrap();

        let updated = store
            .transition_order(
                order.id,
                OrderStatus::Cancelled,
                WriteOptions::expect_version(order.version),
                &[
                    StockChange::new(product.id, 2),
                    StockChange::new(ProductId::new(), 9),
                ],
            )
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Cancelled);
        assert_eq!(updated.version, Version::new(2));
        assert_eq!(
            store.require_product(product.id).await.unwrap().count_in_stock,
            10
        );
    }

    #[tokio::test]
    async fn transition_order_with_stale_version_conflicts() {
        let (store, user, product) = seeded().await;
        let order = store
            .place_order(test_order(user.id, &product, 1), &[])
            .await
            .unwrap();

        store
            .transition_order(
                order.id,
                OrderStatus::Processing,
                WriteOptions::expect_version(order.version),
                &[],
            )
            .await
            .unwrap();
        let result = store
            .transition_order(
                order.id,
                OrderStatus::Cancelled,
                WriteOptions::expect_version(order.version),
                &[],
            )
            .await;

        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn list_orders_filters_and_sorts() {
        let (store, user, product) = seeded().await;
        let other = UserId::new();

        let mut older = test_order(user.id, &product, 1);
        older.created_at = Utc::now() - Duration::hours(2);
        let newer = test_order(user.id, &product, 1);
        let foreign = test_order(other, &product, 1);

        for order in [older.clone(), newer.clone(), foreign] {
            store.place_order(order, &[]).await.unwrap();
        }

        let mine = store
            .list_orders(OrderQuery::for_purchaser(user.id).sort(SortDirection::Asc))
            .await
            .unwrap();
        let ids: Vec<_> = mine.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);

        let newest_first = store
            .list_orders(OrderQuery::for_purchaser(user.id))
            .await
            .unwrap();
        assert_eq!(newest_first[0].id, newer.id);
    }

    #[tokio::test]
    async fn list_products_is_stable_and_filtered() {
        let (store, user, product) = seeded().await;
        let mut shoe = test_product(user.id, 1);
        shoe.name = "Trail Runner".to_string();
        shoe.category = Category::Shoes;
        store.insert_product(shoe.clone()).await.unwrap();

        let first = store.list_products(ProductQuery::new()).await.unwrap();
        let second = store.list_products(ProductQuery::new()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);

        let shoes = store
            .list_products(ProductQuery::new().name_contains("RUNNER"))
            .await
            .unwrap();
        assert_eq!(shoes.len(), 1);
        assert_eq!(shoes[0].id, shoe.id);

        let tops = store
            .list_products(ProductQuery::new().category(Category::Tops))
            .await
            .unwrap();
        assert_eq!(tops[0].id, product.id);
    }

    #[tokio::test]
    async fn stream_orders_yields_oldest_first() {
        use futures_util::StreamExt;

        let (store, user, product) = seeded().await;
        let mut older = test_order(user.id, &product, 1);
        older.created_at = Utc::now() - Duration::days(1);
        let newer = test_order(user.id, &product, 1);
        store.place_order(newer.clone(), &[]).await.unwrap();
        store.place_order(older.clone(), &[]).await.unwrap();

        let stream = store.stream_orders().await.unwrap();
        let orders: Vec<_> = stream.collect().await;
        let ids: Vec<_> = orders.into_iter().map(|o| o.unwrap().id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);
    }
}
