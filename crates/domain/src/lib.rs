//! Domain layer for the storefront core.
//!
//! This crate provides:
//! - The authorization gate and the credential verifier seam
//! - The inventory guard for stock adjustments
//! - The order lifecycle manager and checkout
//! - User and product services with validated operation inputs

pub mod auth;
pub mod error;
pub mod inventory;
pub mod order;
pub mod payment;
pub mod product;
pub mod settings;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{
    AuthGate, CredentialVerifier, Identity, JwtCredentialVerifier, StaticCredentialVerifier,
    TokenClaims, VerifiedCredential, VerifyError, require_owner, require_owner_or_admin,
    require_role,
};
pub use error::{DomainError, ErrorKind, Result};
pub use inventory::InventoryGuard;
pub use order::{
    CartLine, CartSnapshot, CheckoutService, LineView, OrderFilters, OrderService, OrderView,
    ProductRef, SetOrderStatus, StatusFilter,
};
pub use payment::{
    InMemoryPaymentSessions, PaymentError, PaymentLine, PaymentSession, PaymentSessionCreator,
    PaymentSessionRequest,
};
pub use product::{AdjustStock, CreateProduct, ListProducts, ProductService, UpdateProduct};
pub use settings::{InventoryPolicy, StorefrontSettings};
pub use user::{Provisioned, ProvisionUser, SetUserRole, UpdateProfile, UserService};
