//! Shared identifier types for the checkout laboratory.

pub mod types;

pub use types::{EventId, OrderId, TxId};
