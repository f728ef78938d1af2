//! Try/Confirm/Cancel and the orchestrated saga.
//!
//! Both disciplines share the Try/Cancel structure; the saga has no
//! Confirm phase and prefixes its step tokens with `saga_orch_` so the
//! participants can tell the calls apart on the shared endpoints.

use std::time::Instant;

use common::{OrderId, TxId};
use domain::{OrderItem, OrderStatus};
use participant::{ParticipantClient, StepRequest, steps};
use store::CheckoutStore;

use crate::checkout::{CheckoutCoordinator, Participant};
use crate::error::CoordinatorError;
use crate::outcome::CheckoutOutcome;

fn step_request(
    txid: TxId,
    order_id: &OrderId,
    step: String,
    items: Option<&[OrderItem]>,
    total: Option<i64>,
) -> StepRequest {
    StepRequest {
        txid,
        order_id: order_id.clone(),
        step,
        items: items.map(|items| items.to_vec()),
        amount: total,
    }
}

impl<S, C> CheckoutCoordinator<S, C>
where
    S: CheckoutStore,
    C: ParticipantClient,
{
    /// Runs Try on every step, then Confirm on every step. Any failure
    /// cancels the successful prefix in reverse and rejects the order.
    pub(crate) async fn run_tcc(
        &self,
        txid: TxId,
        order_id: OrderId,
        items: &[OrderItem],
        total: i64,
    ) -> Result<CheckoutOutcome, CoordinatorError> {
        let mut tried: Vec<&Participant<C>> = Vec::with_capacity(self.participants.len());

        for p in &self.participants {
            let req = step_request(txid, &order_id, p.step.to_string(), Some(items), Some(total));
            let started = Instant::now();
            match p.client.try_step(&req).await {
                Ok(()) => {
                    self.log_step(p, &req, "tried", started);
                    tried.push(p);
                }
                Err(e) => {
                    tracing::warn!(
                        service = p.name(),
                        txid = %txid,
                        order_id = %order_id,
                        step = p.step,
                        status = "try_failed",
                        duration_ms = started.elapsed().as_millis() as u64,
                        error = %e,
                        "tcc try failed, cancelling prior steps"
                    );
                    return self.reject(txid, order_id, &tried, "").await;
                }
            }
        }

        for p in &tried {
            let req = step_request(txid, &order_id, p.step.to_string(), Some(items), Some(total));
            let started = Instant::now();
            match p.client.confirm(&req).await {
                Ok(()) => self.log_step(p, &req, "confirmed", started),
                Err(e) => {
                    tracing::warn!(
                        service = p.name(),
                        txid = %txid,
                        order_id = %order_id,
                        step = p.step,
                        status = "confirm_failed",
                        duration_ms = started.elapsed().as_millis() as u64,
                        error = %e,
                        "tcc confirm failed, cancelling all steps"
                    );
                    return self.reject(txid, order_id, &tried, "").await;
                }
            }
        }

        self.append_confirmed_event(txid, &order_id, items, total).await;
        self.store
            .set_order_status(&order_id, OrderStatus::Confirmed)
            .await?;
        Ok(CheckoutOutcome::Confirmed {
            order_id,
            txid: Some(txid),
        })
    }

    /// Runs the orchestrated saga: Try is the local commit, a failed
    /// step triggers reverse Cancel of the prior steps.
    pub(crate) async fn run_saga_orch(
        &self,
        txid: TxId,
        order_id: OrderId,
        items: &[OrderItem],
        total: i64,
    ) -> Result<CheckoutOutcome, CoordinatorError> {
        let mut completed: Vec<&Participant<C>> = Vec::with_capacity(self.participants.len());

        for p in &self.participants {
            let step = format!("{}{}", steps::SAGA_ORCH_PREFIX, p.step);
            let req = step_request(txid, &order_id, step, Some(items), Some(total));
            let started = Instant::now();
            match p.client.try_step(&req).await {
                Ok(()) => {
                    self.log_step(p, &req, "applied", started);
                    completed.push(p);
                }
                Err(e) => {
                    tracing::warn!(
                        service = p.name(),
                        txid = %txid,
                        order_id = %order_id,
                        step = req.step.as_str(),
                        status = "action_failed",
                        duration_ms = started.elapsed().as_millis() as u64,
                        error = %e,
                        "saga action failed, compensating"
                    );
                    return self
                        .reject(txid, order_id, &completed, steps::SAGA_ORCH_PREFIX)
                        .await;
                }
            }
        }

        self.append_confirmed_event(txid, &order_id, items, total).await;
        self.store
            .set_order_status(&order_id, OrderStatus::Confirmed)
            .await?;
        Ok(CheckoutOutcome::Confirmed {
            order_id,
            txid: Some(txid),
        })
    }

    fn log_step(&self, p: &Participant<C>, req: &StepRequest, status: &'static str, started: Instant) {
        tracing::info!(
            service = p.name(),
            txid = %req.txid,
            order_id = %req.order_id,
            step = req.step.as_str(),
            status,
            duration_ms = started.elapsed().as_millis() as u64,
            "participant step succeeded"
        );
    }

    /// Cancels the successful prefix in strict reverse order, then
    /// rejects the order.
    async fn reject(
        &self,
        txid: TxId,
        order_id: OrderId,
        completed: &[&Participant<C>],
        step_prefix: &str,
    ) -> Result<CheckoutOutcome, CoordinatorError> {
        self.cancel_steps(txid, &order_id, completed, step_prefix).await;
        self.store
            .set_order_status(&order_id, OrderStatus::Rejected)
            .await?;
        Ok(CheckoutOutcome::Rejected { order_id, txid })
    }

    /// Best-effort reverse cancellation; failures are logged and the
    /// remaining cancellations still run.
    async fn cancel_steps(
        &self,
        txid: TxId,
        order_id: &OrderId,
        completed: &[&Participant<C>],
        step_prefix: &str,
    ) {
        for p in completed.iter().rev() {
            let step = format!("{step_prefix}{}", p.step);
            let req = step_request(txid, order_id, step, None, None);
            if let Err(e) = p.client.cancel(&req).await {
                tracing::warn!(
                    service = p.name(),
                    txid = %txid,
                    order_id = %order_id,
                    step = req.step.as_str(),
                    status = "cancel_failed",
                    error = %e,
                    "compensation cancel failed"
                );
            }
        }
    }

    /// Appends the `OrderConfirmed` event best-effort: participant
    /// effects are already final, a missing event must not fail the
    /// checkout.
    async fn append_confirmed_event(
        &self,
        txid: TxId,
        order_id: &OrderId,
        items: &[OrderItem],
        total: i64,
    ) {
        let record = match self.order_event_record(txid, order_id, "OrderConfirmed", items, total) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    service = "order",
                    txid = %txid,
                    order_id = %order_id,
                    step = "outbox_append",
                    error = %e,
                    "could not build confirmed event"
                );
                return;
            }
        };
        if let Err(e) = self.store.append_event(record).await {
            tracing::warn!(
                service = "order",
                txid = %txid,
                order_id = %order_id,
                step = "outbox_append",
                error = %e,
                "could not append confirmed event"
            );
        }
    }
}
