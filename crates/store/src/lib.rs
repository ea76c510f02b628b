//! Domain store for the storefront core.
//!
//! Holds the three durable collections (users, products, orders) behind the
//! [`DomainStore`] trait, with an in-memory implementation for tests and local
//! runs and a PostgreSQL implementation for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use common::{Category, Money, OrderId, OrderStatus, ProductId, Role, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{OrderQuery, ProductQuery, SortDirection};
pub use record::{Order, OrderLine, Product, StockChange, User, Version};
pub use store::{DomainStore, DomainStoreExt, OrderStream, WriteOptions};
