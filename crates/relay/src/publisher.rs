//! The bus publisher abstraction.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

/// The relay could not deliver a record. The record stays pending and
/// is retried on a later tick; this error is logged, never surfaced to
/// a client.
#[derive(Debug, Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);

/// Sink for outbox records. Production uses Kafka; tests use
/// [`MemoryPublisher`].
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one message keyed for partitioning.
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<(), PublishError>;
}

#[derive(Debug, Default)]
struct MemoryPublisherState {
    messages: Vec<(String, Vec<u8>)>,
    fail: bool,
}

/// In-memory publisher for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    state: Arc<RwLock<MemoryPublisherState>>,
}

impl MemoryPublisher {
    /// Creates a publisher that accepts every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent publish fail.
    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap().fail = fail;
    }

    /// Messages accepted so far, in publish order.
    pub fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.state.read().unwrap().messages.clone()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<(), PublishError> {
        let mut state = self.state.write().unwrap();
        if state.fail {
            return Err(PublishError("broker unavailable".to_string()));
        }
        state.messages.push((key.to_string(), payload.to_vec()));
        Ok(())
    }
}
