//! The storage trait and its record types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, OrderId, TxId};
use domain::{Order, OrderItem, OrderStatus, TxStatus};

use crate::error::Result;

/// Everything inserted atomically when a checkout creates an order.
///
/// The order row (status PROCESSING), its line items, the idempotency
/// binding when a key is present, and the coordinator log row when a
/// `txid` is present all land in one database transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub idempotency_key: Option<String>,
    pub items: Vec<OrderItem>,
    pub total: i64,
    pub txid: Option<TxId>,
    /// Participant names recorded in the coordinator log, in call order.
    pub participants: Vec<String>,
}

/// An event to append to the outbox.
#[derive(Debug, Clone)]
pub struct NewOutboxRecord {
    pub event_id: EventId,
    pub topic: String,
    /// Partition key on the bus; the order ID.
    pub key: String,
    pub payload: serde_json::Value,
}

/// An outbox row as fetched by the relay.
#[derive(Debug, Clone)]
pub struct OutboxRecord {
    pub id: i64,
    pub event_id: EventId,
    pub topic: String,
    pub key: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// A coordinator transaction log row.
#[derive(Debug, Clone)]
pub struct TxLogEntry {
    pub txid: TxId,
    pub order_id: OrderId,
    pub status: TxStatus,
    pub participants: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Storage operations backing the checkout coordinator and the outbox
/// relay.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Verifies the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Creates an order atomically per [`NewOrder`]. Fails with
    /// [`StoreError::IdempotencyRace`](crate::StoreError::IdempotencyRace)
    /// when the idempotency key is already bound.
    async fn create_order(&self, new_order: NewOrder) -> Result<()>;

    /// Loads an order with its line items.
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// Resolves an idempotency key to the order it is bound to.
    async fn get_order_by_idempotency_key(&self, key: &str) -> Result<Option<OrderId>>;

    /// Updates an order's status and bumps `updated_at`.
    async fn set_order_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<()>;

    /// Updates an order's status and appends an outbox record in the
    /// same database transaction, making the state change and the
    /// intent to publish atomic.
    async fn set_order_status_with_event(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        record: NewOutboxRecord,
    ) -> Result<()>;

    /// Advances a coordinator log entry.
    async fn set_tx_status(&self, txid: TxId, status: TxStatus) -> Result<()>;

    /// Loads a coordinator log entry.
    async fn get_tx_log(&self, txid: TxId) -> Result<Option<TxLogEntry>>;

    /// Appends one outbox record outside of any order mutation.
    async fn append_event(&self, record: NewOutboxRecord) -> Result<()>;

    /// Fetches up to `limit` unsent outbox records ordered by ascending
    /// `id`.
    async fn fetch_pending_events(&self, limit: i64) -> Result<Vec<OutboxRecord>>;

    /// Marks an outbox record as sent. `sent_at` is only ever written
    /// once; marking an already-sent record is a no-op.
    async fn mark_event_sent(&self, id: i64) -> Result<()>;
}
