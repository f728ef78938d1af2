//! Storage for the checkout coordinator.
//!
//! One trait, [`CheckoutStore`], over the order rows, the idempotency
//! bindings, the coordinator transaction log and the outbox. Two
//! implementations: [`PostgresStore`] for production and
//! [`InMemoryStore`] for tests.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{CheckoutStore, NewOrder, NewOutboxRecord, OutboxRecord, TxLogEntry};
