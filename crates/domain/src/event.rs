//! The event contract published on the bus.

use chrono::{DateTime, Utc};
use common::{EventId, OrderId, TxId};
use serde::{Deserialize, Serialize};

/// A domain event as it travels through the outbox onto the bus.
///
/// `event_id` is the unit of deduplication for downstream consumers; the
/// partition key on the bus is the order ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub txid: TxId,
    pub order_id: OrderId,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl Event {
    /// Creates an event stamped with the current time.
    pub fn new(
        event_id: EventId,
        txid: TxId,
        order_id: OrderId,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id,
            txid,
            order_id,
            created_at: Utc::now(),
            event_type: event_type.into(),
            payload,
        }
    }
}

/// The closed set of event types exchanged between the services on the
/// bus. The checkout coordinator itself emits only `OrderCreated` and
/// `OrderConfirmed` envelopes; the dotted names below are the contract
/// the participants and the notification consumer speak.
pub mod taxonomy {
    pub const ORDER_CREATED: &str = "order.created";
    pub const ORDER_CONFIRMED: &str = "order.confirmed";
    pub const ORDER_COMPLETED: &str = "order.completed";
    pub const ORDER_COMPENSATED: &str = "order.compensated";
    pub const ORDER_SHIPPED: &str = "order.shipped";
    pub const INVENTORY_SOFT_RESERVED: &str = "inventory.soft_reserved";
    pub const INVENTORY_HARD_RESERVED: &str = "inventory.hard_reserved";
    pub const INVENTORY_RELEASED: &str = "inventory.released";
    pub const INVENTORY_DEDUCTED: &str = "inventory.deducted";
    pub const PAYMENT_CREATED: &str = "payment.created";
    pub const PAYMENT_CAPTURED: &str = "payment.captured";
    pub const PAYMENT_REFUNDED: &str = "payment.refunded";
    pub const SHIPPING_CREATED: &str = "shipping.created";
    pub const SHIPPING_CANCELLED: &str = "shipping.cancelled";
    pub const SHIPPING_DELIVERED: &str = "shipping.delivered";
    pub const NOTIFICATION_EMITTED: &str = "notification.emitted";
}
