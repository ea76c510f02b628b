//! Payment session creator trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, OrderId};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

/// One line of a checkout as presented to the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentLine {
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSessionRequest {
    pub order_id: OrderId,
    pub lines: Vec<PaymentLine>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Opaque session handle returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSession {
    pub session_ref: String,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),

    #[error("payment provider rejected the session: {0}")]
    Rejected(String),
}

/// Creates hosted checkout sessions with an external payment provider.
#[async_trait]
pub trait PaymentSessionCreator: Send + Sync {
    async fn create_session(
        &self,
        request: PaymentSessionRequest,
    ) -> Result<PaymentSession, PaymentError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    sessions: HashMap<String, PaymentSessionRequest>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment session creator for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentSessions {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the creator to fail as if the provider were unreachable.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    pub async fn session(&self, session_ref: &str) -> Option<PaymentSessionRequest> {
        self.state.read().await.sessions.get(session_ref).cloned()
    }
}

#[async_trait]
impl PaymentSessionCreator for InMemoryPaymentSessions {
    async fn create_session(
        &self,
        request: PaymentSessionRequest,
    ) -> Result<PaymentSession, PaymentError> {
        let mut state = self.state.write().await;

        if state.fail_on_create {
            return Err(PaymentError::Unavailable(
                "connection refused".to_string(),
            ));
        }

        state.next_id += 1;
        let session_ref = format!("CS-{:04}", state.next_id);
        let redirect_url = Some(format!("https://pay.invalid/session/{session_ref}"));
        state.sessions.insert(session_ref.clone(), request);

        Ok(PaymentSession {
            session_ref,
            redirect_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PaymentSessionRequest {
        PaymentSessionRequest {
            order_id: OrderId::new(),
            lines: vec![PaymentLine {
                name: "Scarf".to_string(),
                unit_price: Money::from_cents(1500),
                quantity: 2,
            }],
            success_url: "http://localhost/ok".to_string(),
            cancel_url: "http://localhost/cancel".to_string(),
        }
    }

    #[tokio::test]
    async fn sessions_get_sequential_refs() {
        let sessions = InMemoryPaymentSessions::new();
        let first = sessions.create_session(request()).await.unwrap();
        let second = sessions.create_session(request()).await.unwrap();

        assert_eq!(first.session_ref, "CS-0001");
        assert_eq!(second.session_ref, "CS-0002");
        assert_eq!(sessions.session_count().await, 2);
        assert_eq!(
            sessions.session("CS-0001").await.unwrap().lines[0].quantity,
            2
        );
    }

    #[tokio::test]
    async fn failing_provider_records_nothing() {
        let sessions = InMemoryPaymentSessions::new();
        sessions.set_fail_on_create(true).await;

        assert!(matches!(
            sessions.create_session(request()).await,
            Err(PaymentError::Unavailable(_))
        ));
        assert_eq!(sessions.session_count().await, 0);
    }
}
