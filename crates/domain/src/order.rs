//! Order records and the order status lifecycle.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The status of an order in its lifecycle.
///
/// Transitions:
/// ```text
/// PROCESSING ──┬──► COMMITTED            (2PC)
///              ├──► CONFIRMED            (TCC, saga-orch, outbox, none)
///              ├──► PENDING ──► …        (saga-chor; terminal decision is external)
///              ├──► REJECTED             (compensated TCC/saga)
///              └──► ABORTED              (2PC abort)
/// ```
/// `CANCELLED` is reserved for external consumers that roll a pending
/// choreographed order back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Processing,
    Pending,
    Confirmed,
    Committed,
    Rejected,
    Aborted,
    Cancelled,
}

impl OrderStatus {
    /// Returns the status name as persisted and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Committed => "COMMITTED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Aborted => "ABORTED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parses a persisted status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PROCESSING" => Some(OrderStatus::Processing),
            "PENDING" => Some(OrderStatus::Pending),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "COMMITTED" => Some(OrderStatus::Committed),
            "REJECTED" => Some(OrderStatus::Rejected),
            "ABORTED" => Some(OrderStatus::Aborted),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Returns true if no further transition is expected from the
    /// coordinator. `PENDING` is not terminal: a choreographed consumer
    /// owns the remaining transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed
                | OrderStatus::Committed
                | OrderStatus::Rejected
                | OrderStatus::Aborted
                | OrderStatus::Cancelled
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: i32,
}

/// An order row with its lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    /// Total in minor currency units.
    pub total: i64,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validates a checkout submission before anything touches storage.
///
/// Rejects an empty item list, a negative total, blank product IDs and
/// non-positive quantities.
pub fn validate_checkout(total: i64, items: &[OrderItem]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::NoItems);
    }
    if total < 0 {
        return Err(ValidationError::NegativeTotal(total));
    }
    for item in items {
        if item.product_id.trim().is_empty() {
            return Err(ValidationError::BlankProductId);
        }
        if item.quantity <= 0 {
            return Err(ValidationError::InvalidQuantity {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            });
        }
    }
    Ok(())
}
