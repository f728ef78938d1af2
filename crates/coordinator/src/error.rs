use thiserror::Error;

/// Errors that end a checkout run without a protocol outcome.
///
/// Participant failures never appear here: the drivers turn them into
/// [`CheckoutOutcome`](crate::CheckoutOutcome) aborts/rejections.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Storage failed outside the idempotency-race recovery path.
    #[error("storage error: {0}")]
    Store(#[from] store::StoreError),

    /// An event payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
