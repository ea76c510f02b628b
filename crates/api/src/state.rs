//! Shared application state.

use std::sync::Arc;

use analytics::{AnalyticsError, ReportingService};
use domain::{
    AuthGate, CheckoutService, CredentialVerifier, InventoryGuard, OrderService,
    PaymentSessionCreator, ProductService, StorefrontSettings, UserService,
};
use store::DomainStore;

/// Services shared by every handler, all backed by the same store.
pub struct AppState<S: DomainStore + Clone> {
    pub gate: AuthGate<S>,
    pub users: UserService<S>,
    pub products: ProductService<S>,
    pub inventory: InventoryGuard<S>,
    pub orders: OrderService<S>,
    pub checkout: CheckoutService<S>,
    pub reports: ReportingService<S>,
}

impl<S: DomainStore + Clone> AppState<S> {
    /// Wires every service to `store`.
    ///
    /// Fails only if the reporting offset in `settings` is out of range.
    pub fn new(
        store: S,
        verifier: Arc<dyn CredentialVerifier>,
        payments: Arc<dyn PaymentSessionCreator>,
        settings: &StorefrontSettings,
    ) -> Result<Self, AnalyticsError> {
        Ok(Self {
            gate: AuthGate::new(store.clone(), verifier),
            users: UserService::new(store.clone()),
            products: ProductService::new(store.clone()),
            inventory: InventoryGuard::new(store.clone()),
            orders: OrderService::new(store.clone(), settings),
            checkout: CheckoutService::new(store.clone(), payments, settings),
            reports: ReportingService::new(store, settings)?,
        })
    }
}
