//! Integration tests driving the coordinator over the in-memory store
//! and mock participants, one scenario per transaction discipline.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, TxId};
use coordinator::{CheckoutCoordinator, CheckoutInput, CheckoutOutcome, Participant, TxMode};
use domain::{OrderItem, OrderStatus, TxStatus};
use participant::{CallJournal, MockParticipant, RecordedCall, steps};
use store::{
    CheckoutStore, InMemoryStore, NewOrder, NewOutboxRecord, OutboxRecord, StoreError, TxLogEntry,
};

struct Fixture {
    store: InMemoryStore,
    inventory: MockParticipant,
    payment: MockParticipant,
    shipping: MockParticipant,
    journal: CallJournal,
    coordinator: CheckoutCoordinator<InMemoryStore, MockParticipant>,
}

fn setup(mode: TxMode, mock_two_pc: bool) -> Fixture {
    let store = InMemoryStore::new();
    let journal: CallJournal = Arc::new(RwLock::new(Vec::new()));
    let inventory = MockParticipant::with_journal("inventory", journal.clone());
    let payment = MockParticipant::with_journal("payment", journal.clone());
    let shipping = MockParticipant::with_journal("shipping", journal.clone());

    let participants = vec![
        Participant::new(inventory.clone(), steps::RESERVE_INVENTORY),
        Participant::new(payment.clone(), steps::CHARGE_PAYMENT),
        Participant::new(shipping.clone(), steps::ARRANGE_SHIPPING),
    ];
    let coordinator = CheckoutCoordinator::new(
        store.clone(),
        participants,
        mode,
        mock_two_pc,
        "txlab.events",
    );

    Fixture {
        store,
        inventory,
        payment,
        shipping,
        journal,
        coordinator,
    }
}

fn input(order_id: Option<&str>, idem_key: Option<&str>) -> CheckoutInput {
    CheckoutInput {
        order_id: order_id.map(String::from),
        idempotency_key: idem_key.map(String::from),
        items: vec![OrderItem {
            product_id: "sku-1".to_string(),
            quantity: 1,
        }],
        total: 1200,
    }
}

async fn order_status(store: &InMemoryStore, order_id: &OrderId) -> OrderStatus {
    store.get_order(order_id).await.unwrap().unwrap().status
}

fn is_cancel(call: &RecordedCall) -> bool {
    matches!(call, RecordedCall::Cancel { .. })
}

#[tokio::test]
async fn test_twopc_mocked_commits_with_full_log_walk() {
    let f = setup(TxMode::TwoPc, true);

    let outcome = f.coordinator.checkout(input(None, Some("K1"))).await.unwrap();
    let CheckoutOutcome::Committed { order_id, txid } = outcome else {
        panic!("expected COMMITTED, got {outcome:?}");
    };

    assert_eq!(order_status(&f.store, &order_id).await, OrderStatus::Confirmed);
    let log = f.store.get_tx_log(txid).await.unwrap().unwrap();
    assert_eq!(log.status, TxStatus::Committed);
    assert_eq!(log.order_id, order_id);
    assert_eq!(log.participants, vec!["inventory", "payment", "shipping"]);
    // Mocked phases never reach the participants.
    assert!(f.journal.read().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_replays_on_same_idempotency_key() {
    let f = setup(TxMode::TwoPc, true);

    let first = f.coordinator.checkout(input(None, Some("K1"))).await.unwrap();
    let second = f.coordinator.checkout(input(None, Some("K1"))).await.unwrap();

    let CheckoutOutcome::Replayed { order_id } = second else {
        panic!("expected IDEMPOTENT_REPLAY");
    };
    assert_eq!(&order_id, first.order_id());
    assert_eq!(f.store.order_count(), 1);
    assert_eq!(f.store.binding_count(), 1);
}

#[tokio::test]
async fn test_empty_idempotency_key_disables_replay() {
    let f = setup(TxMode::TwoPc, true);

    let first = f.coordinator.checkout(input(None, Some("  "))).await.unwrap();
    let second = f.coordinator.checkout(input(None, Some("  "))).await.unwrap();

    assert_ne!(first.order_id(), second.order_id());
    assert_eq!(f.store.order_count(), 2);
    assert_eq!(f.store.binding_count(), 0);
}

#[tokio::test]
async fn test_client_supplied_order_id_is_kept() {
    let f = setup(TxMode::None, false);
    let outcome = f.coordinator.checkout(input(Some("ord-42"), None)).await.unwrap();
    assert_eq!(outcome.order_id().as_str(), "ord-42");
}

#[tokio::test]
async fn test_none_mode_confirms_without_coordination() {
    let f = setup(TxMode::None, false);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    let CheckoutOutcome::Confirmed { order_id, txid } = outcome else {
        panic!("expected CONFIRMED");
    };
    assert!(txid.is_none());
    assert_eq!(order_status(&f.store, &order_id).await, OrderStatus::Confirmed);
    assert!(f.store.outbox_records().is_empty());
    assert!(f.journal.read().unwrap().is_empty());
}

#[tokio::test]
async fn test_twopc_prepare_failure_aborts_without_commits() {
    let f = setup(TxMode::TwoPc, false);
    f.inventory.set_fail_on_prepare(true);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    let CheckoutOutcome::Aborted { order_id, txid } = outcome else {
        panic!("expected ABORTED");
    };

    assert_eq!(order_status(&f.store, &order_id).await, OrderStatus::Rejected);
    let log = f.store.get_tx_log(txid).await.unwrap().unwrap();
    assert_eq!(log.status, TxStatus::Aborted);

    // The first participant failed, so nobody prepared, nobody commits,
    // nobody needs an abort.
    assert_eq!(f.inventory.count(|c| matches!(c, RecordedCall::Prepare)), 1);
    assert_eq!(f.inventory.count(|c| matches!(c, RecordedCall::Commit)), 0);
    assert!(f.payment.calls().is_empty());
    assert!(f.shipping.calls().is_empty());
}

#[tokio::test]
async fn test_twopc_late_prepare_failure_aborts_prepared_in_reverse() {
    let f = setup(TxMode::TwoPc, false);
    f.shipping.set_fail_on_prepare(true);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    assert!(matches!(outcome, CheckoutOutcome::Aborted { .. }));

    // Inventory and payment voted YES and each receive exactly one abort.
    assert_eq!(f.inventory.count(|c| matches!(c, RecordedCall::Abort)), 1);
    assert_eq!(f.payment.count(|c| matches!(c, RecordedCall::Abort)), 1);
    assert_eq!(f.shipping.count(|c| matches!(c, RecordedCall::Abort)), 0);
    assert_eq!(f.shipping.count(|c| matches!(c, RecordedCall::Commit)), 0);

    // Aborts run in reverse prepare order.
    let aborts: Vec<String> = f
        .journal
        .read()
        .unwrap()
        .iter()
        .filter(|(_, c)| matches!(c, RecordedCall::Abort))
        .map(|(name, _)| name.clone())
        .collect();
    assert_eq!(aborts, vec!["payment", "inventory"]);
}

#[tokio::test]
async fn test_twopc_vote_no_is_an_abort_decision() {
    let f = setup(TxMode::TwoPc, false);
    f.payment.set_vote_no(true);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    assert!(matches!(outcome, CheckoutOutcome::Aborted { .. }));
    assert_eq!(f.inventory.count(|c| matches!(c, RecordedCall::Abort)), 1);
    assert!(f.shipping.calls().is_empty());
}

#[tokio::test]
async fn test_twopc_commit_failure_escalates_to_abort_all() {
    let f = setup(TxMode::TwoPc, false);
    f.payment.set_fail_on_commit(true);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    let CheckoutOutcome::Aborted { order_id, txid } = outcome else {
        panic!("expected ABORTED");
    };

    assert_eq!(order_status(&f.store, &order_id).await, OrderStatus::Rejected);
    assert_eq!(
        f.store.get_tx_log(txid).await.unwrap().unwrap().status,
        TxStatus::Aborted
    );

    // Everyone prepared, the failing participant saw no further commit,
    // and every prepared participant received exactly one abort.
    assert_eq!(f.inventory.count(|c| matches!(c, RecordedCall::Commit)), 1);
    assert_eq!(f.payment.count(|c| matches!(c, RecordedCall::Commit)), 1);
    assert_eq!(f.shipping.count(|c| matches!(c, RecordedCall::Commit)), 0);
    for p in [&f.inventory, &f.payment, &f.shipping] {
        assert_eq!(p.count(|c| matches!(c, RecordedCall::Abort)), 1);
    }
}

#[tokio::test]
async fn test_twopc_without_participants_commits_trivially() {
    let store = InMemoryStore::new();
    let coordinator: CheckoutCoordinator<_, MockParticipant> =
        CheckoutCoordinator::new(store.clone(), Vec::new(), TxMode::TwoPc, false, "txlab.events");

    let outcome = coordinator.checkout(input(None, None)).await.unwrap();
    let CheckoutOutcome::Committed { order_id, txid } = outcome else {
        panic!("expected COMMITTED");
    };
    assert_eq!(order_status(&store, &order_id).await, OrderStatus::Confirmed);
    assert_eq!(
        store.get_tx_log(txid).await.unwrap().unwrap().status,
        TxStatus::Committed
    );
}

#[tokio::test]
async fn test_tcc_happy_path_confirms_and_enqueues_event() {
    let f = setup(TxMode::Tcc, false);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    let CheckoutOutcome::Confirmed { order_id, txid } = outcome else {
        panic!("expected CONFIRMED");
    };
    assert!(txid.is_some());
    assert_eq!(order_status(&f.store, &order_id).await, OrderStatus::Confirmed);
    // No TxLog row outside twopc mode.
    assert!(f.store.get_tx_log(txid.unwrap()).await.unwrap().is_none());

    assert_eq!(
        f.inventory.calls(),
        vec![
            RecordedCall::Try {
                step: "reserve_inventory".to_string()
            },
            RecordedCall::Confirm {
                step: "reserve_inventory".to_string()
            },
        ]
    );
    assert_eq!(f.payment.count(|c| matches!(c, RecordedCall::Confirm { .. })), 1);
    assert_eq!(f.shipping.count(|c| matches!(c, RecordedCall::Confirm { .. })), 1);

    // Exactly one OrderConfirmed event keyed by the order.
    let records: Vec<OutboxRecord> = f.store.outbox_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, order_id.as_str());
    assert_eq!(records[0].payload["type"], "OrderConfirmed");
}

#[tokio::test]
async fn test_tcc_try_failure_cancels_tried_prefix_only() {
    let f = setup(TxMode::Tcc, false);
    f.payment.set_fail_on_try(true);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    let CheckoutOutcome::Rejected { order_id, .. } = outcome else {
        panic!("expected REJECTED");
    };
    assert_eq!(order_status(&f.store, &order_id).await, OrderStatus::Rejected);

    // Inventory tried first and gets exactly one cancel with its own
    // step token; shipping was never reached.
    assert_eq!(
        f.inventory.count(|c| *c
            == RecordedCall::Cancel {
                step: "reserve_inventory".to_string()
            }),
        1
    );
    assert_eq!(f.payment.count(is_cancel), 0);
    assert!(f.shipping.calls().is_empty());
    assert!(f.store.outbox_records().is_empty());
}

#[tokio::test]
async fn test_tcc_confirm_failure_cancels_everything_in_reverse() {
    let f = setup(TxMode::Tcc, false);
    f.shipping.set_fail_on_confirm(true);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    assert!(matches!(outcome, CheckoutOutcome::Rejected { .. }));

    for p in [&f.inventory, &f.payment, &f.shipping] {
        assert_eq!(p.count(is_cancel), 1);
    }

    // Compensation is the exact reverse of the tried prefix.
    let cancels: Vec<String> = f
        .journal
        .read()
        .unwrap()
        .iter()
        .filter(|(_, c)| is_cancel(c))
        .map(|(name, _)| name.clone())
        .collect();
    assert_eq!(cancels, vec!["shipping", "payment", "inventory"]);
}

#[tokio::test]
async fn test_tcc_cancel_failures_do_not_stop_compensation() {
    let f = setup(TxMode::Tcc, false);
    f.shipping.set_fail_on_confirm(true);
    f.payment.set_fail_on_cancel(true);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    assert!(matches!(outcome, CheckoutOutcome::Rejected { .. }));
    // The failed cancel is swallowed and inventory still compensates.
    assert_eq!(f.inventory.count(is_cancel), 1);
}

#[tokio::test]
async fn test_saga_orch_prefixes_steps_on_the_wire() {
    let f = setup(TxMode::SagaOrch, false);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    let CheckoutOutcome::Confirmed { order_id, .. } = outcome else {
        panic!("expected CONFIRMED");
    };
    assert_eq!(order_status(&f.store, &order_id).await, OrderStatus::Confirmed);

    assert_eq!(
        f.inventory.calls(),
        vec![RecordedCall::Try {
            step: "saga_orch_reserve_inventory".to_string()
        }]
    );
    // No confirm phase in the orchestrated saga.
    for p in [&f.inventory, &f.payment, &f.shipping] {
        assert_eq!(p.count(|c| matches!(c, RecordedCall::Confirm { .. })), 0);
    }
    assert_eq!(f.store.outbox_records().len(), 1);
}

#[tokio::test]
async fn test_saga_orch_failure_compensates_with_prefixed_cancels() {
    let f = setup(TxMode::SagaOrch, false);
    f.shipping.set_fail_on_try(true);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    assert!(matches!(outcome, CheckoutOutcome::Rejected { .. }));

    assert_eq!(
        f.payment.count(|c| *c
            == RecordedCall::Cancel {
                step: "saga_orch_charge_payment".to_string()
            }),
        1
    );
    assert_eq!(
        f.inventory.count(|c| *c
            == RecordedCall::Cancel {
                step: "saga_orch_reserve_inventory".to_string()
            }),
        1
    );
    assert_eq!(f.shipping.count(is_cancel), 0);
    assert!(f.store.outbox_records().is_empty());
}

#[tokio::test]
async fn test_saga_chor_answers_pending_with_created_event() {
    let f = setup(TxMode::SagaChor, false);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    let CheckoutOutcome::Pending { order_id, .. } = outcome else {
        panic!("expected PENDING");
    };
    assert_eq!(order_status(&f.store, &order_id).await, OrderStatus::Pending);
    assert!(f.journal.read().unwrap().is_empty());

    let records = f.store.outbox_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, order_id.as_str());
    assert_eq!(records[0].payload["type"], "OrderCreated");
    assert_eq!(records[0].payload["order_id"], order_id.as_str());
}

#[tokio::test]
async fn test_outbox_mode_confirms_with_confirmed_event() {
    let f = setup(TxMode::Outbox, false);

    let outcome = f.coordinator.checkout(input(None, None)).await.unwrap();
    let CheckoutOutcome::Confirmed { order_id, txid } = outcome else {
        panic!("expected CONFIRMED");
    };
    assert!(txid.is_some());
    assert_eq!(order_status(&f.store, &order_id).await, OrderStatus::Confirmed);
    assert!(f.journal.read().unwrap().is_empty());

    let records = f.store.outbox_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, order_id.as_str());
    assert_eq!(records[0].payload["type"], "OrderConfirmed");
    assert_eq!(records[0].payload["payload"]["total"], 1200);
    assert!(records[0].sent_at.is_none());
}

/// A store whose `create_order` always loses the idempotency bind race
/// to a fixed winner, simulating a concurrent replica binding the same
/// key between our lookup and our insert.
#[derive(Clone)]
struct RacingStore {
    inner: InMemoryStore,
    winner: OrderId,
}

#[async_trait]
impl CheckoutStore for RacingStore {
    async fn ping(&self) -> store::Result<()> {
        self.inner.ping().await
    }

    async fn create_order(&self, new_order: NewOrder) -> store::Result<()> {
        if let Some(key) = new_order.idempotency_key {
            let winner_order = NewOrder {
                order_id: self.winner.clone(),
                idempotency_key: Some(key),
                items: new_order.items,
                total: new_order.total,
                txid: None,
                participants: Vec::new(),
            };
            self.inner.create_order(winner_order).await?;
            return Err(StoreError::IdempotencyRace);
        }
        self.inner.create_order(new_order).await
    }

    async fn get_order(&self, order_id: &OrderId) -> store::Result<Option<domain::Order>> {
        self.inner.get_order(order_id).await
    }

    async fn get_order_by_idempotency_key(&self, key: &str) -> store::Result<Option<OrderId>> {
        self.inner.get_order_by_idempotency_key(key).await
    }

    async fn set_order_status(&self, order_id: &OrderId, status: OrderStatus) -> store::Result<()> {
        self.inner.set_order_status(order_id, status).await
    }

    async fn set_order_status_with_event(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        record: NewOutboxRecord,
    ) -> store::Result<()> {
        self.inner
            .set_order_status_with_event(order_id, status, record)
            .await
    }

    async fn set_tx_status(&self, txid: TxId, status: TxStatus) -> store::Result<()> {
        self.inner.set_tx_status(txid, status).await
    }

    async fn get_tx_log(&self, txid: TxId) -> store::Result<Option<TxLogEntry>> {
        self.inner.get_tx_log(txid).await
    }

    async fn append_event(&self, record: NewOutboxRecord) -> store::Result<()> {
        self.inner.append_event(record).await
    }

    async fn fetch_pending_events(&self, limit: i64) -> store::Result<Vec<OutboxRecord>> {
        self.inner.fetch_pending_events(limit).await
    }

    async fn mark_event_sent(&self, id: i64) -> store::Result<()> {
        self.inner.mark_event_sent(id).await
    }
}

#[tokio::test]
async fn test_lost_bind_race_is_answered_as_replay() {
    let winner = OrderId::from("ord-winner");
    let store = RacingStore {
        inner: InMemoryStore::new(),
        winner: winner.clone(),
    };
    let coordinator: CheckoutCoordinator<_, MockParticipant> =
        CheckoutCoordinator::new(store, Vec::new(), TxMode::None, false, "txlab.events");

    let outcome = coordinator.checkout(input(None, Some("K1"))).await.unwrap();
    let CheckoutOutcome::Replayed { order_id } = outcome else {
        panic!("expected IDEMPOTENT_REPLAY after losing the bind race");
    };
    assert_eq!(order_id, winner);
}
