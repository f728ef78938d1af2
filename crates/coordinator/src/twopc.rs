//! Two-phase commit over the participant set.

use std::time::Instant;

use common::{OrderId, TxId};
use domain::{OrderItem, OrderStatus, TxStatus};
use participant::{AbortRequest, CommitRequest, ParticipantClient, PrepareRequest};
use store::CheckoutStore;

use crate::checkout::{CheckoutCoordinator, Participant};
use crate::error::CoordinatorError;
use crate::outcome::CheckoutOutcome;

impl<S, C> CheckoutCoordinator<S, C>
where
    S: CheckoutStore,
    C: ParticipantClient,
{
    /// Runs prepare/commit against every configured participant.
    ///
    /// The first NO vote (explicit, non-2xx or transport failure)
    /// decides ABORT; prepared participants are aborted in reverse
    /// order, best-effort. A commit failure escalates to abort-all.
    /// With zero participants the transaction commits trivially.
    pub(crate) async fn run_two_pc(
        &self,
        txid: TxId,
        order_id: OrderId,
        items: &[OrderItem],
        total: i64,
    ) -> Result<CheckoutOutcome, CoordinatorError> {
        self.store.set_tx_status(txid, TxStatus::Preparing).await?;

        if self.mock_two_pc {
            // Short-circuit both phases; the log still walks its states.
            self.store.set_tx_status(txid, TxStatus::Committing).await?;
            self.store
                .set_order_status(&order_id, OrderStatus::Confirmed)
                .await?;
            self.store.set_tx_status(txid, TxStatus::Committed).await?;
            return Ok(CheckoutOutcome::Committed { order_id, txid });
        }

        let prepare_req = PrepareRequest {
            txid,
            order_id: order_id.clone(),
            items: items.to_vec(),
            total,
        };

        // Phase 1: collect votes. Stop at the first NO.
        let mut prepared: Vec<&Participant<C>> = Vec::with_capacity(self.participants.len());
        for p in &self.participants {
            let started = Instant::now();
            match p.client.prepare(&prepare_req).await {
                Ok(_) => {
                    tracing::info!(
                        service = p.name(),
                        txid = %txid,
                        order_id = %order_id,
                        step = "prepare",
                        status = "yes",
                        duration_ms = started.elapsed().as_millis() as u64,
                        "participant prepared"
                    );
                    prepared.push(p);
                }
                Err(e) => {
                    tracing::warn!(
                        service = p.name(),
                        txid = %txid,
                        order_id = %order_id,
                        step = "prepare",
                        status = "no",
                        duration_ms = started.elapsed().as_millis() as u64,
                        error = %e,
                        "prepare failed, aborting"
                    );
                    self.abort_participants(txid, &order_id, &prepared).await?;
                    return Ok(CheckoutOutcome::Aborted { order_id, txid });
                }
            }
        }

        // Phase 2: commit everyone; a failure escalates to abort-all.
        self.store.set_tx_status(txid, TxStatus::Committing).await?;
        let commit_req = CommitRequest {
            txid,
            order_id: order_id.clone(),
        };
        for p in &self.participants {
            let started = Instant::now();
            if let Err(e) = p.client.commit(&commit_req).await {
                tracing::warn!(
                    service = p.name(),
                    txid = %txid,
                    order_id = %order_id,
                    step = "commit",
                    status = "failed",
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "commit failed, aborting all participants"
                );
                self.abort_participants(txid, &order_id, &prepared).await?;
                return Ok(CheckoutOutcome::Aborted { order_id, txid });
            }
            tracing::info!(
                service = p.name(),
                txid = %txid,
                order_id = %order_id,
                step = "commit",
                status = "committed",
                duration_ms = started.elapsed().as_millis() as u64,
                "participant committed"
            );
        }

        self.store
            .set_order_status(&order_id, OrderStatus::Confirmed)
            .await?;
        self.store.set_tx_status(txid, TxStatus::Committed).await?;
        Ok(CheckoutOutcome::Committed { order_id, txid })
    }

    /// Walks the prepared prefix backwards with best-effort aborts and
    /// records the abort decision in order and log state.
    async fn abort_participants(
        &self,
        txid: TxId,
        order_id: &OrderId,
        prepared: &[&Participant<C>],
    ) -> Result<(), CoordinatorError> {
        self.store.set_tx_status(txid, TxStatus::Aborting).await?;

        let abort_req = AbortRequest {
            txid,
            order_id: order_id.clone(),
        };
        for p in prepared.iter().rev() {
            if let Err(e) = p.client.abort(&abort_req).await {
                tracing::warn!(
                    service = p.name(),
                    txid = %txid,
                    order_id = %order_id,
                    step = "abort",
                    status = "failed",
                    error = %e,
                    "abort broadcast failed"
                );
            }
        }

        self.store
            .set_order_status(order_id, OrderStatus::Rejected)
            .await?;
        self.store.set_tx_status(txid, TxStatus::Aborted).await?;
        Ok(())
    }
}
