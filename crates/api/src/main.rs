//! Order service entry point.

use std::sync::Arc;

use api::config::Config;
use api::routes::metrics::{LATENCY_BUCKETS_MS, LATENCY_HISTOGRAM};
use coordinator::CheckoutCoordinator;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use participant::{HttpParticipant, steps};
use relay::{KafkaPublisher, OutboxRelay, RelayConfig};
use sqlx::postgres::PgPoolOptions;
use store::{CheckoutStore, PostgresStore};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn build_participants(config: &Config) -> Vec<coordinator::Participant<HttpParticipant>> {
    let endpoints = [
        ("inventory", &config.inventory_base_url, steps::RESERVE_INVENTORY),
        ("payment", &config.payment_base_url, steps::CHARGE_PAYMENT),
        ("shipping", &config.shipping_base_url, steps::ARRANGE_SHIPPING),
    ];

    endpoints
        .into_iter()
        .filter(|(_, url, _)| !url.is_empty())
        .map(|(name, url, step)| {
            coordinator::Participant::new(
                HttpParticipant::new(name, url, config.request_timeout),
                step,
            )
        })
        .collect()
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("configuration error");

    // 2. Install Prometheus metrics recorder with the latency buckets
    let metrics_handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(LATENCY_HISTOGRAM.to_string()), LATENCY_BUCKETS_MS)
        .expect("invalid latency buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Database pool, migrations, smoke check
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .expect("db connect error");
    let store = PostgresStore::new(pool);
    store.run_migrations().await.expect("db migration error");
    store.ping().await.expect("db ping error");

    // 4. Participants and coordinator
    let participants = build_participants(&config);
    let coordinator = CheckoutCoordinator::new(
        store.clone(),
        participants,
        config.tx_mode,
        config.mock_two_pc,
        config.kafka_topic.clone(),
    );

    // 5. Outbox relay, only when a bus is configured
    let shutdown = CancellationToken::new();
    let relay_handle = match KafkaPublisher::from_brokers(&config.kafka_brokers, &config.kafka_topic)
        .expect("kafka producer error")
    {
        Some(publisher) => {
            let relay = OutboxRelay::new(
                store.clone(),
                publisher,
                RelayConfig {
                    poll_interval: config.outbox_poll_interval,
                    batch_size: config.outbox_batch_size,
                },
            );
            Some(tokio::spawn(relay.run(shutdown.clone())))
        }
        None => None,
    };

    // 6. Serve
    let state = Arc::new(api::AppState { coordinator, store });
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(
        %addr,
        tx_mode = %config.tx_mode,
        mock_2pc = config.mock_two_pc,
        "order service listening"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Stop the relay after the server drains.
    shutdown.cancel();
    if let Some(handle) = relay_handle {
        let _ = handle.await;
    }

    tracing::info!("server shut down gracefully");
}
