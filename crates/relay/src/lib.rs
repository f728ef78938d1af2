//! Outbox relay: drains pending outbox records onto the bus.
//!
//! One relay task runs per Order-service instance, and only when a bus
//! is configured. Delivery is at-least-once; ordering per order key is
//! preserved because fetches are id-ordered and a failing publish halts
//! the batch.

pub mod kafka;
pub mod publisher;
pub mod relay;

pub use kafka::KafkaPublisher;
pub use publisher::{EventPublisher, MemoryPublisher, PublishError};
pub use relay::{OutboxRelay, RelayConfig};
