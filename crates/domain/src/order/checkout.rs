//! Hands an unpaid order to the payment provider.

use std::sync::Arc;

use common::{OrderId, OrderStatus};
use store::{DomainStore, DomainStoreExt};

use crate::auth::{Identity, require_owner};
use crate::error::{DomainError, Result};
use crate::payment::{PaymentLine, PaymentSession, PaymentSessionCreator, PaymentSessionRequest};
use crate::settings::StorefrontSettings;

#[derive(Clone)]
pub struct CheckoutService<S: DomainStore> {
    store: S,
    payments: Arc<dyn PaymentSessionCreator>,
    success_url: String,
    cancel_url: String,
}

impl<S: DomainStore> CheckoutService<S> {
    pub fn new(
        store: S,
        payments: Arc<dyn PaymentSessionCreator>,
        settings: &StorefrontSettings,
    ) -> Self {
        Self {
            store,
            payments,
            success_url: settings.payment_success_url.clone(),
            cancel_url: settings.payment_cancel_url.clone(),
        }
    }

    /// Opens a payment session for one of the caller's unprocessed orders.
    ///
    /// Line prices are the order's snapshots, so the provider charges exactly
    /// the stored total.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn begin_checkout(
        &self,
        identity: &Identity,
        order_id: OrderId,
    ) -> Result<PaymentSession> {
        let order = self.store.require_order(order_id).await?;
        require_owner(identity, order.purchaser_id)?;
        if order.status != OrderStatus::Unprocessed {
            return Err(DomainError::invalid(format!(
                "order {order_id} is {} and can no longer be paid",
                order.status
            )));
        }

        let request = PaymentSessionRequest {
            order_id,
            lines: order
                .items
                .iter()
                .map(|line| PaymentLine {
                    name: line.product_name.clone(),
                    unit_price: line.unit_price,
                    quantity: line.quantity,
                })
                .collect(),
            success_url: self.success_url.clone(),
            cancel_url: self.cancel_url.clone(),
        };

        let session = self.payments.create_session(request).await.map_err(|e| {
            tracing::error!(%order_id, error = %e, "payment session creation failed");
            DomainError::DependencyFailure {
                dependency: "payment provider",
                reason: e.to_string(),
            }
        })?;
        tracing::info!(%order_id, session = %session.session_ref, "checkout started");
        Ok(session)
    }
}
