//! In-memory checkout store for tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, TxId};
use domain::{Order, OrderStatus, TxStatus};

use crate::error::{Result, StoreError};
use crate::store::{CheckoutStore, NewOrder, NewOutboxRecord, OutboxRecord, TxLogEntry};

#[derive(Debug, Default)]
struct InMemoryState {
    orders: HashMap<String, Order>,
    bindings: HashMap<String, OrderId>,
    tx_log: HashMap<TxId, TxLogEntry>,
    outbox: Vec<OutboxRecord>,
    next_outbox_id: i64,
}

impl InMemoryState {
    fn push_outbox(&mut self, record: NewOutboxRecord) {
        self.next_outbox_id += 1;
        self.outbox.push(OutboxRecord {
            id: self.next_outbox_id,
            event_id: record.event_id,
            topic: record.topic,
            key: record.key,
            payload: record.payload,
            created_at: Utc::now(),
            sent_at: None,
        });
    }

    fn set_order_status(&mut self, order_id: &OrderId, status: OrderStatus) {
        if let Some(order) = self.orders.get_mut(order_id.as_str()) {
            order.status = status;
            order.updated_at = Utc::now();
        }
    }
}

/// In-memory implementation of [`CheckoutStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of order rows.
    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }

    /// Returns the number of idempotency bindings.
    pub fn binding_count(&self) -> usize {
        self.state.read().unwrap().bindings.len()
    }

    /// Returns a snapshot of every outbox record, sent or not.
    pub fn outbox_records(&self) -> Vec<OutboxRecord> {
        self.state.read().unwrap().outbox.clone()
    }
}

#[async_trait]
impl CheckoutStore for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_order(&self, new_order: NewOrder) -> Result<()> {
        let mut state = self.state.write().unwrap();

        if let Some(key) = &new_order.idempotency_key
            && state.bindings.contains_key(key)
        {
            return Err(StoreError::IdempotencyRace);
        }
        if state.orders.contains_key(new_order.order_id.as_str()) {
            return Err(StoreError::Conflict(format!(
                "order {} already exists",
                new_order.order_id
            )));
        }

        let now = Utc::now();
        state.orders.insert(
            new_order.order_id.as_str().to_string(),
            Order {
                id: new_order.order_id.clone(),
                status: OrderStatus::Processing,
                total: new_order.total,
                items: new_order.items,
                created_at: now,
                updated_at: now,
            },
        );

        if let Some(key) = new_order.idempotency_key {
            state.bindings.insert(key, new_order.order_id.clone());
        }

        if let Some(txid) = new_order.txid {
            state.tx_log.insert(
                txid,
                TxLogEntry {
                    txid,
                    order_id: new_order.order_id,
                    status: TxStatus::Started,
                    participants: new_order.participants,
                    updated_at: now,
                },
            );
        }

        Ok(())
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .orders
            .get(order_id.as_str())
            .cloned())
    }

    async fn get_order_by_idempotency_key(&self, key: &str) -> Result<Option<OrderId>> {
        Ok(self.state.read().unwrap().bindings.get(key).cloned())
    }

    async fn set_order_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<()> {
        self.state.write().unwrap().set_order_status(order_id, status);
        Ok(())
    }

    async fn set_order_status_with_event(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        record: NewOutboxRecord,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.set_order_status(order_id, status);
        state.push_outbox(record);
        Ok(())
    }

    async fn set_tx_status(&self, txid: TxId, status: TxStatus) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if let Some(entry) = state.tx_log.get_mut(&txid) {
            entry.status = status;
            entry.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn get_tx_log(&self, txid: TxId) -> Result<Option<TxLogEntry>> {
        Ok(self.state.read().unwrap().tx_log.get(&txid).cloned())
    }

    async fn append_event(&self, record: NewOutboxRecord) -> Result<()> {
        self.state.write().unwrap().push_outbox(record);
        Ok(())
    }

    async fn fetch_pending_events(&self, limit: i64) -> Result<Vec<OutboxRecord>> {
        let state = self.state.read().unwrap();
        Ok(state
            .outbox
            .iter()
            .filter(|r| r.sent_at.is_none())
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_event_sent(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if let Some(record) = state.outbox.iter_mut().find(|r| r.id == id)
            && record.sent_at.is_none()
        {
            record.sent_at = Some(Utc::now());
        }
        Ok(())
    }
}
