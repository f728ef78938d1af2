//! Prometheus metrics endpoint and the per-handler request metrics.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// Latency histogram buckets in milliseconds; configure them on the
/// Prometheus recorder at startup.
pub const LATENCY_BUCKETS_MS: &[f64] = &[
    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
];

/// Name of the per-handler latency histogram.
pub const LATENCY_HISTOGRAM: &str = "txlab_http_request_duration_ms";

/// GET /metrics — returns Prometheus-formatted metrics.
pub async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}

/// Middleware recording a request counter by handler and status, and a
/// latency histogram by handler.
pub async fn track(request: Request, next: Next) -> impl IntoResponse {
    let handler = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let started = Instant::now();
    let response = next.run(request).await;

    metrics::counter!(
        "txlab_http_requests_total",
        "handler" => handler.clone(),
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(LATENCY_HISTOGRAM, "handler" => handler)
        .record(started.elapsed().as_secs_f64() * 1000.0);

    response
}
