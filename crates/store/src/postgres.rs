use async_trait::async_trait;
use chrono::Utc;
use common::{Money, OrderId, OrderStatus, ProductId, UserId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow, types::Json};
use uuid::Uuid;

use crate::{
    Order, OrderLine, OrderQuery, Product, ProductQuery, Result, SortDirection, StockChange,
    StoreError, User, Version,
    store::{DomainStore, OrderStream, WriteOptions, merge_stock_changes},
};

const USER_COLUMNS: &str =
    "id, external_subject_id, display_name, email, role, created_at, updated_at, version";

const PRODUCT_COLUMNS: &str = "id, name, category, description, image_url, price_cents, \
     count_in_stock, created_by, created_at, updated_at, version";

const ORDER_COLUMNS: &str = "id, purchaser_id, purchaser_name, items, total_cents, status, \
     stock_reserved, created_at, updated_at, version";

/// PostgreSQL-backed domain store.
///
/// Per-record write ordering comes from row locks: every write is a single
/// `UPDATE ... WHERE id = $1` (or a transaction of them), so concurrent
/// writers to the same row are serialized by the database.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        let role: String = row.try_get("role")?;
        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            external_subject_id: row.try_get("external_subject_id")?,
            display_name: row.try_get("display_name")?,
            email: row.try_get("email")?,
            role: role.parse().map_err(corrupt)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let category: String = row.try_get("category")?;
        let count: i64 = row.try_get("count_in_stock")?;
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            category: category.parse().map_err(corrupt)?,
            description: row.try_get("description")?,
            image_url: row.try_get("image_url")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            count_in_stock: u32::try_from(count).map_err(corrupt)?,
            created_by: UserId::from_uuid(row.try_get::<Uuid, _>("created_by")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let Json(items): Json<Vec<OrderLine>> = row.try_get("items")?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            purchaser_id: UserId::from_uuid(row.try_get::<Uuid, _>("purchaser_id")?),
            purchaser_name: row.try_get("purchaser_name")?,
            items,
            total_amount: Money::from_cents(row.try_get("total_cents")?),
            status: status.parse().map_err(corrupt)?,
            stock_reserved: row.try_get("stock_reserved")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    /// Explains why a versioned `UPDATE ... RETURNING` matched no row.
    async fn missed_write(
        &self,
        table: &'static str,
        entity: &'static str,
        id: Uuid,
        options: WriteOptions,
    ) -> StoreError {
        let sql = format!("SELECT version FROM {table} WHERE id = $1");
        let current: std::result::Result<Option<i64>, sqlx::Error> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

        match current {
            Ok(None) => StoreError::not_found(entity, id),
            Ok(Some(actual)) => StoreError::ConcurrencyConflict {
                entity,
                id: id.to_string(),
                expected: options.expected_version.unwrap_or_default(),
                actual: Version::new(actual),
            },
            Err(e) => StoreError::Database(e),
        }
    }

    async fn restock(
        tx: &mut Transaction<'_, Postgres>,
        changes: &[StockChange],
    ) -> Result<()> {
        for change in changes {
            sqlx::query(
                r#"
                UPDATE products
                SET count_in_stock = count_in_stock + $2, version = version + 1, updated_at = $3
                WHERE id = $1
                "#,
            )
            .bind(change.product_id.as_uuid())
            .bind(i64::from(change.quantity))
            .bind(Utc::now())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

fn corrupt(e: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

/// The products-to-creator foreign key rejected the statement.
fn is_creator_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db_err) if db_err.constraint() == Some("products_created_by_fkey")
    )
}

fn map_user_write_error(e: sqlx::Error, user: &User) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        match db_err.constraint() {
            Some("users_external_subject_id_key") => {
                return StoreError::UniqueViolation {
                    field: "external_subject_id",
                    value: user.external_subject_id.clone(),
                };
            }
            Some("users_email_lower_key") => {
                return StoreError::UniqueViolation {
                    field: "email",
                    value: user.email.clone(),
                };
            }
            Some("users_pkey") => {
                return StoreError::UniqueViolation {
                    field: "id",
                    value: user.id.to_string(),
                };
            }
            _ => {}
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl DomainStore for PostgresStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user.id.as_uuid())
            .bind(&user.external_subject_id)
            .bind(&user.display_name)
            .bind(&user.email)
            .bind(user.role.as_str())
            .bind(user.created_at)
            .bind(user.updated_at)
            .bind(Version::first().as_i64())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_user_write_error(e, &user))?;

        Self::row_to_user(row)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_user)
            .transpose()
    }

    async fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE external_subject_id = $1");
        sqlx::query(&sql)
            .bind(subject)
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_user)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_user)
            .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_user).collect()
    }

    async fn update_user(&self, user: User, options: WriteOptions) -> Result<User> {
        let sql = format!(
            "UPDATE users SET display_name = $2, email = $3, role = $4, updated_at = $5, \
             version = version + 1 \
             WHERE id = $1 AND ($6::BIGINT IS NULL OR version = $6) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user.id.as_uuid())
            .bind(&user.display_name)
            .bind(&user.email)
            .bind(user.role.as_str())
            .bind(Utc::now())
            .bind(options.expected_version.map(|v| v.as_i64()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_user_write_error(e, &user))?;

        match row {
            Some(row) => Self::row_to_user(row),
            None => Err(self
                .missed_write("users", "User", user.id.as_uuid(), options)
                .await),
        }
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_creator_violation(&e) {
                    StoreError::StillReferenced {
                        entity: "User",
                        id: id.to_string(),
                        by: "products",
                    }
                } else {
                    StoreError::Database(e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_product(&self, product: Product) -> Result<Product> {
        let sql = format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(product.id.as_uuid())
            .bind(&product.name)
            .bind(product.category.as_str())
            .bind(&product.description)
            .bind(&product.image_url)
            .bind(product.price.cents())
            .bind(i64::from(product.count_in_stock))
            .bind(product.created_by.as_uuid())
            .bind(product.created_at)
            .bind(product.updated_at)
            .bind(Version::first().as_i64())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_creator_violation(&e) {
                    StoreError::not_found("User", product.created_by)
                } else {
                    StoreError::Database(e)
                }
            })?;

        Self::row_to_product(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_product)
            .transpose()
    }

    async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::TEXT IS NULL OR category = $1) \
             AND ($2::TEXT IS NULL OR POSITION(LOWER($2) IN LOWER(name)) > 0) \
             AND ($3::UUID IS NULL OR created_by = $3) \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(query.category.map(|c| c.as_str()))
            .bind(query.name_contains)
            .bind(query.created_by.map(|id| id.as_uuid()))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn update_product(&self, product: Product, options: WriteOptions) -> Result<Product> {
        let sql = format!(
            "UPDATE products SET name = $2, category = $3, description = $4, image_url = $5, \
             price_cents = $6, count_in_stock = $7, updated_at = $8, version = version + 1 \
             WHERE id = $1 AND ($9::BIGINT IS NULL OR version = $9) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(product.id.as_uuid())
            .bind(&product.name)
            .bind(product.category.as_str())
            .bind(&product.description)
            .bind(&product.image_url)
            .bind(product.price.cents())
            .bind(i64::from(product.count_in_stock))
            .bind(Utc::now())
            .bind(options.expected_version.map(|v| v.as_i64()))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => Err(self
                .missed_write("products", "Product", product.id.as_uuid(), options)
                .await),
        }
    }

    async fn set_stock(&self, id: ProductId, count: u32) -> Result<Product> {
        let sql = format!(
            "UPDATE products SET count_in_stock = $2, updated_at = $3, version = version + 1 \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(i64::from(count))
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", id))?;

        Self::row_to_product(row)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn place_order(&self, order: Order, decrements: &[StockChange]) -> Result<Order> {
        let decrements = merge_stock_changes(decrements)?;
        let mut tx = self.pool.begin().await?;

        for change in &decrements {
            let applied: Option<Uuid> = sqlx::query_scalar(
                r#"
                UPDATE products
                SET count_in_stock = count_in_stock - $2, version = version + 1, updated_at = $3
                WHERE id = $1 AND count_in_stock >= $2
                RETURNING id
                "#,
            )
            .bind(change.product_id.as_uuid())
            .bind(i64::from(change.quantity))
            .bind(Utc::now())
            .fetch_optional(&mut *tx)
            .await?;

            if applied.is_none() {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT count_in_stock FROM products WHERE id = $1")
                        .bind(change.product_id.as_uuid())
                        .fetch_optional(&mut *tx)
                        .await?;
                // Dropping the transaction rolls back earlier decrements
                return Err(match available {
                    None => StoreError::not_found("Product", change.product_id),
                    Some(available) => StoreError::InsufficientStock {
                        product_id: change.product_id,
                        requested: change.quantity,
                        available: u32::try_from(available).map_err(corrupt)?,
                    },
                });
            }
        }

        let sql = format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(order.id.as_uuid())
            .bind(order.purchaser_id.as_uuid())
            .bind(&order.purchaser_name)
            .bind(Json(&order.items))
            .bind(order.total_amount.cents())
            .bind(order.status.as_str())
            .bind(order.stock_reserved)
            .bind(order.created_at)
            .bind(order.updated_at)
            .bind(Version::first().as_i64())
            .fetch_one(&mut *tx)
            .await?;
        let stored = Self::row_to_order(row)?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_order)
            .transpose()
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let direction = match query.sort {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::UUID IS NULL OR purchaser_id = $1) \
             AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at {direction}, id {direction}"
        );
        let rows = sqlx::query(&sql)
            .bind(query.purchaser.map(|id| id.as_uuid()))
            .bind(query.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn transition_order(
        &self,
        id: OrderId,
        status: OrderStatus,
        options: WriteOptions,
        restock: &[StockChange],
    ) -> Result<Order> {
        let restock = merge_stock_changes(restock)?;
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE orders SET status = $2, updated_at = $3, version = version + 1 \
             WHERE id = $1 AND ($4::BIGINT IS NULL OR version = $4) \
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(options.expected_version.map(|v| v.as_i64()))
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            drop(tx);
            return Err(self
                .missed_write("orders", "Order", id.as_uuid(), options)
                .await);
        };
        let order = Self::row_to_order(row)?;

        Self::restock(&mut tx, &restock).await?;
        tx.commit().await?;

        tracing::debug!(order_id = %id, %status, restocked = restock.len(), "order transitioned");
        Ok(order)
    }

    async fn stream_orders(&self) -> Result<OrderStream> {
        use futures_util::stream;

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let orders: Vec<Result<Order>> = rows.into_iter().map(Self::row_to_order).collect();

        Ok(Box::pin(stream::iter(orders)))
    }
}
