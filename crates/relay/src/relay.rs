//! The relay poll loop.

use std::time::Duration;

use store::CheckoutStore;
use tokio_util::sync::CancellationToken;

use crate::publisher::EventPublisher;

/// Relay tuning knobs.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Time between outbox polls.
    pub poll_interval: Duration,
    /// Maximum records fetched per tick.
    pub batch_size: i64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            batch_size: 100,
        }
    }
}

/// Drains pending outbox records to the bus on a timer.
pub struct OutboxRelay<S, P> {
    store: S,
    publisher: P,
    config: RelayConfig,
}

impl<S, P> OutboxRelay<S, P>
where
    S: CheckoutStore,
    P: EventPublisher,
{
    pub fn new(store: S, publisher: P, config: RelayConfig) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    /// Runs until the token is cancelled. In-flight batch work is
    /// abandoned mid-await on cancellation; unsent records stay pending
    /// and are picked up by the next relay instance.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            poll_ms = self.config.poll_interval.as_millis() as u64,
            batch = self.config.batch_size,
            "outbox relay started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.drain_once() => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "outbox fetch failed");
                    }
                }
            }
        }

        tracing::info!("outbox relay stopped");
    }

    /// Publishes one batch of pending records in ascending `id` order.
    ///
    /// A failed publish halts the batch without marking the record, so
    /// nothing behind it can overtake: per-key ordering holds and the
    /// record is retried on the next tick. Returns how many records
    /// were published and marked.
    pub async fn drain_once(&self) -> store::Result<usize> {
        let records = self
            .store
            .fetch_pending_events(self.config.batch_size)
            .await?;

        let mut published = 0;
        for record in records {
            let payload = record.payload.to_string();
            if let Err(e) = self.publisher.publish(&record.key, payload.as_bytes()).await {
                metrics::counter!("txlab_outbox_publish_errors_total").increment(1);
                tracing::warn!(
                    outbox_id = record.id,
                    event_id = %record.event_id,
                    error = %e,
                    "publish failed, halting batch"
                );
                break;
            }
            self.store.mark_event_sent(record.id).await?;
            metrics::counter!("txlab_outbox_published_total").increment(1);
            tracing::debug!(
                outbox_id = record.id,
                event_id = %record.event_id,
                key = record.key.as_str(),
                "outbox record published"
            );
            published += 1;
        }

        Ok(published)
    }
}
