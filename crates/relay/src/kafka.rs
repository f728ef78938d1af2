//! Kafka-backed publisher.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};

use crate::publisher::{EventPublisher, PublishError};

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes outbox records to a Kafka topic, hash-partitioned by key.
#[derive(Clone)]
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaPublisher {
    /// Builds a publisher from a comma-separated broker list. Returns
    /// `None` when the list is empty, which disables the relay.
    pub fn from_brokers(
        brokers_csv: &str,
        topic: impl Into<String>,
    ) -> Result<Option<Self>, rdkafka::error::KafkaError> {
        let brokers: Vec<&str> = brokers_csv
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .collect();
        if brokers.is_empty() {
            return Ok(None);
        }

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers.join(","))
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Some(Self {
            producer,
            topic: topic.into(),
        }))
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<(), PublishError> {
        let record = FutureRecord::to(&self.topic).key(key).payload(payload);
        self.producer
            .send(record, SEND_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(|(e, _)| PublishError(e.to_string()))
    }
}
