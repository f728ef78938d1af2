//! The result of one coordinated checkout.

use common::{OrderId, TxId};

/// What a checkout run decided. Protocol failures are outcomes, not
/// errors: an aborted transaction is a correct coordinator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The idempotency key was already bound; no new state was created.
    Replayed { order_id: OrderId },

    /// 2PC reached unanimous commit.
    Committed { order_id: OrderId, txid: TxId },

    /// TCC/saga-orch/outbox succeeded, or mode `none` confirmed
    /// immediately (in which case there is no transaction ID).
    Confirmed {
        order_id: OrderId,
        txid: Option<TxId>,
    },

    /// saga-chor accepted the order; the terminal decision arrives
    /// asynchronously.
    Pending { order_id: OrderId, txid: TxId },

    /// 2PC aborted.
    Aborted { order_id: OrderId, txid: TxId },

    /// TCC/saga-orch compensated and rejected the order.
    Rejected { order_id: OrderId, txid: TxId },
}

impl CheckoutOutcome {
    /// The order this outcome is about.
    pub fn order_id(&self) -> &OrderId {
        match self {
            CheckoutOutcome::Replayed { order_id }
            | CheckoutOutcome::Committed { order_id, .. }
            | CheckoutOutcome::Confirmed { order_id, .. }
            | CheckoutOutcome::Pending { order_id, .. }
            | CheckoutOutcome::Aborted { order_id, .. }
            | CheckoutOutcome::Rejected { order_id, .. } => order_id,
        }
    }

    /// The transaction ID, when the mode minted one.
    pub fn txid(&self) -> Option<TxId> {
        match self {
            CheckoutOutcome::Replayed { .. } => None,
            CheckoutOutcome::Committed { txid, .. }
            | CheckoutOutcome::Pending { txid, .. }
            | CheckoutOutcome::Aborted { txid, .. }
            | CheckoutOutcome::Rejected { txid, .. } => Some(*txid),
            CheckoutOutcome::Confirmed { txid, .. } => *txid,
        }
    }

    /// The status token reported to the client.
    pub fn status_str(&self) -> &'static str {
        match self {
            CheckoutOutcome::Replayed { .. } => "IDEMPOTENT_REPLAY",
            CheckoutOutcome::Committed { .. } => "COMMITTED",
            CheckoutOutcome::Confirmed { .. } => "CONFIRMED",
            CheckoutOutcome::Pending { .. } => "PENDING",
            CheckoutOutcome::Aborted { .. } => "ABORTED",
            CheckoutOutcome::Rejected { .. } => "REJECTED",
        }
    }

    /// True for outcomes reported as a 502 upstream failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CheckoutOutcome::Aborted { .. } | CheckoutOutcome::Rejected { .. }
        )
    }
}
