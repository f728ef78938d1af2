//! The checkout entry point: idempotent replay, atomic order creation,
//! mode dispatch.

use common::{EventId, OrderId, TxId};
use domain::{Event, OrderItem, OrderStatus};
use participant::ParticipantClient;
use store::{CheckoutStore, NewOrder, NewOutboxRecord, StoreError};

use crate::error::CoordinatorError;
use crate::mode::TxMode;
use crate::outcome::CheckoutOutcome;

/// A participant wired into the coordinator, with the TCC step token it
/// owns. Participants whose base URL is unconfigured are never added.
pub struct Participant<C> {
    pub client: C,
    pub step: &'static str,
}

impl<C: ParticipantClient> Participant<C> {
    pub fn new(client: C, step: &'static str) -> Self {
        Self { client, step }
    }

    pub fn name(&self) -> &str {
        self.client.name()
    }
}

/// A validated checkout submission.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    /// Client-supplied order ID; blank or missing means the coordinator
    /// mints one.
    pub order_id: Option<String>,
    /// Trimmed `Idempotency-Key` header; empty disables idempotency for
    /// this request.
    pub idempotency_key: Option<String>,
    pub items: Vec<OrderItem>,
    pub total: i64,
}

/// Drives one checkout through the configured transaction discipline.
pub struct CheckoutCoordinator<S, C> {
    pub(crate) store: S,
    pub(crate) participants: Vec<Participant<C>>,
    mode: TxMode,
    pub(crate) mock_two_pc: bool,
    topic: String,
}

impl<S, C> CheckoutCoordinator<S, C>
where
    S: CheckoutStore,
    C: ParticipantClient,
{
    pub fn new(
        store: S,
        participants: Vec<Participant<C>>,
        mode: TxMode,
        mock_two_pc: bool,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            store,
            participants,
            mode,
            mock_two_pc,
            topic: topic.into(),
        }
    }

    /// The configured transaction mode.
    pub fn mode(&self) -> TxMode {
        self.mode
    }

    /// Runs one checkout to its outcome.
    ///
    /// Storage failures (other than a recovered idempotency race) come
    /// back as errors; protocol failures come back as
    /// [`CheckoutOutcome::Aborted`]/[`CheckoutOutcome::Rejected`].
    pub async fn checkout(
        &self,
        input: CheckoutInput,
    ) -> Result<CheckoutOutcome, CoordinatorError> {
        let started = std::time::Instant::now();
        let outcome = self.run(input).await?;
        metrics::counter!(
            "txlab_checkout_total",
            "mode" => self.mode.as_str(),
            "status" => outcome.status_str()
        )
        .increment(1);
        tracing::info!(
            service = "order",
            order_id = %outcome.order_id(),
            step = "checkout",
            status = outcome.status_str(),
            duration_ms = started.elapsed().as_millis() as u64,
            "checkout finished"
        );
        Ok(outcome)
    }

    async fn run(&self, input: CheckoutInput) -> Result<CheckoutOutcome, CoordinatorError> {
        let idem_key = input
            .idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from);

        if let Some(key) = &idem_key
            && let Some(existing) = self.store.get_order_by_idempotency_key(key).await?
        {
            tracing::info!(
                service = "order",
                order_id = %existing,
                step = "checkout",
                status = "idempotent_replay",
                "idempotency key already bound"
            );
            return Ok(CheckoutOutcome::Replayed { order_id: existing });
        }

        let order_id = match input.order_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => OrderId::from(id),
            _ => OrderId::new(),
        };

        // Only 2PC keeps a coordinator log; the other disciplines mint
        // their transaction IDs at dispatch time, for correlation only.
        let log_txid = (self.mode == TxMode::TwoPc).then(TxId::new);

        let new_order = NewOrder {
            order_id: order_id.clone(),
            idempotency_key: idem_key.clone(),
            items: input.items.clone(),
            total: input.total,
            txid: log_txid,
            participants: self
                .participants
                .iter()
                .map(|p| p.name().to_string())
                .collect(),
        };

        match self.store.create_order(new_order).await {
            Ok(()) => {}
            Err(StoreError::IdempotencyRace) if idem_key.is_some() => {
                // Lost the bind race; the winner's order answers this
                // request too.
                let key = idem_key.as_deref().unwrap_or_default();
                if let Some(existing) = self.store.get_order_by_idempotency_key(key).await? {
                    tracing::info!(
                        service = "order",
                        order_id = %existing,
                        step = "checkout",
                        status = "idempotent_race",
                        "recovered idempotency race as replay"
                    );
                    return Ok(CheckoutOutcome::Replayed { order_id: existing });
                }
                return Err(StoreError::IdempotencyRace.into());
            }
            Err(e) => return Err(e.into()),
        }

        match self.mode {
            TxMode::None => {
                self.store
                    .set_order_status(&order_id, OrderStatus::Confirmed)
                    .await?;
                Ok(CheckoutOutcome::Confirmed {
                    order_id,
                    txid: None,
                })
            }
            TxMode::TwoPc => {
                let txid = log_txid.expect("twopc mode mints a log txid");
                self.run_two_pc(txid, order_id, &input.items, input.total)
                    .await
            }
            TxMode::Tcc => {
                self.run_tcc(TxId::new(), order_id, &input.items, input.total)
                    .await
            }
            TxMode::SagaOrch => {
                self.run_saga_orch(TxId::new(), order_id, &input.items, input.total)
                    .await
            }
            TxMode::SagaChor => {
                let txid = TxId::new();
                self.enqueue_order_event(
                    txid,
                    &order_id,
                    "OrderCreated",
                    &input.items,
                    input.total,
                    OrderStatus::Pending,
                )
                .await?;
                Ok(CheckoutOutcome::Pending { order_id, txid })
            }
            TxMode::Outbox => {
                let txid = TxId::new();
                self.enqueue_order_event(
                    txid,
                    &order_id,
                    "OrderConfirmed",
                    &input.items,
                    input.total,
                    OrderStatus::Confirmed,
                )
                .await?;
                Ok(CheckoutOutcome::Confirmed {
                    order_id,
                    txid: Some(txid),
                })
            }
        }
    }

    /// Builds the bus event for an order and stores it atomically with
    /// the status transition.
    async fn enqueue_order_event(
        &self,
        txid: TxId,
        order_id: &OrderId,
        event_type: &str,
        items: &[OrderItem],
        total: i64,
        status: OrderStatus,
    ) -> Result<(), CoordinatorError> {
        let record = self.order_event_record(txid, order_id, event_type, items, total)?;
        self.store
            .set_order_status_with_event(order_id, status, record)
            .await?;
        Ok(())
    }

    /// Builds the outbox record for an order event without storing it.
    pub(crate) fn order_event_record(
        &self,
        txid: TxId,
        order_id: &OrderId,
        event_type: &str,
        items: &[OrderItem],
        total: i64,
    ) -> Result<NewOutboxRecord, CoordinatorError> {
        let event_id = EventId::new();
        let event = Event::new(
            event_id,
            txid,
            order_id.clone(),
            event_type,
            serde_json::json!({ "items": items, "total": total }),
        );
        Ok(NewOutboxRecord {
            event_id,
            topic: self.topic.clone(),
            key: order_id.as_str().to_string(),
            payload: serde_json::to_value(&event)?,
        })
    }
}
