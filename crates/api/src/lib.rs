//! HTTP surface of the Order service.
//!
//! `POST /checkout` drives the coordinator; `GET /orders/{id}` reads
//! order status; `/health` and `/metrics` serve the operators. Request
//! logging via `tower-http` tracing, request counters and latency
//! histograms per handler via the Prometheus recorder.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use coordinator::CheckoutCoordinator;
use metrics_exporter_prometheus::PrometheusHandle;
use participant::ParticipantClient;
use store::CheckoutStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S, C> {
    pub coordinator: CheckoutCoordinator<S, C>,
    pub store: S,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, C>(state: Arc<AppState<S, C>>, metrics_handle: PrometheusHandle) -> Router
where
    S: CheckoutStore + 'static,
    C: ParticipantClient + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/checkout", post(routes::checkout::post::<S, C>))
        .route("/orders/{id}", get(routes::orders::get::<S, C>))
        .route("/health", get(routes::health::check))
        .with_state(state)
        .merge(metrics_router)
        .layer(axum::middleware::from_fn(routes::metrics::track))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
