use thiserror::Error;

/// Errors that can occur when interacting with checkout storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent request bound the same idempotency key first. The
    /// caller recovers by re-reading the binding and answering as a
    /// replay.
    #[error("idempotency key already bound")]
    IdempotencyRace,

    /// A row that must be unique already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A statement exceeded its deadline.
    #[error("statement deadline exceeded during {0}")]
    Timeout(&'static str),

    /// A persisted value could not be interpreted.
    #[error("decode error: {0}")]
    Decode(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
