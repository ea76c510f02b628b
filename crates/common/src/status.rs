//! Order status state machine.

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Unprocessed ──► Processing ──► Shipped
///      │              │
///      └──────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order was placed and not yet picked up by an administrator.
    #[default]
    Unprocessed,

    /// Order is being prepared.
    Processing,

    /// Order has left the warehouse (terminal state).
    Shipped,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Unprocessed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Cancelled,
    ];

    /// Returns true if `next` is reachable from this status in a single step.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Unprocessed, OrderStatus::Processing)
                | (OrderStatus::Processing, OrderStatus::Shipped)
                | (OrderStatus::Unprocessed, OrderStatus::Cancelled)
                | (OrderStatus::Processing, OrderStatus::Cancelled)
        )
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unprocessed => "Unprocessed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::new("order status", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_unprocessed() {
        assert_eq!(OrderStatus::default(), OrderStatus::Unprocessed);
    }

    #[test]
    fn test_forward_path() {
        assert!(OrderStatus::Unprocessed.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_unprocessed_cannot_skip_to_shipped() {
        assert!(!OrderStatus::Unprocessed.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_shipped_is_terminal() {
        for next in OrderStatus::ALL {
            assert!(!OrderStatus::Shipped.can_transition_to(next));
        }
        assert!(OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_cancelled_is_terminal() {
        for next in OrderStatus::ALL {
            assert!(!OrderStatus::Cancelled.can_transition_to(next));
        }
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_can_cancel_from_non_terminal_statuses() {
        assert!(OrderStatus::Unprocessed.can_cancel());
        assert!(OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_no_self_transitions() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            "processing".parse::<OrderStatus>().unwrap(),
            OrderStatus::Processing
        );
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"Processing\"");
        let back: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderStatus::Processing);
    }
}
