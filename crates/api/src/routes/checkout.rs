//! The checkout entry point.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use common::TxId;
use coordinator::CheckoutInput;
use domain::{OrderItem, validate_checkout};
use participant::ParticipantClient;
use serde::{Deserialize, Serialize};
use store::CheckoutStore;

use crate::AppState;
use crate::error::ApiError;

/// Whole-request deadline; individual participant calls and database
/// statements carry their own, shorter deadlines.
const REQUEST_DEADLINE: Duration = Duration::from_secs(10);

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub order_id: Option<String>,
    pub total: i64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<TxId>,
    pub status: &'static str,
}

/// POST /checkout — validate, then run the configured transaction
/// discipline to its outcome.
#[tracing::instrument(skip(state, headers, req))]
pub async fn post<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError>
where
    S: CheckoutStore + 'static,
    C: ParticipantClient + 'static,
{
    validate_checkout(req.total, &req.items)?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from);

    let input = CheckoutInput {
        order_id: req.order_id,
        idempotency_key,
        items: req.items,
        total: req.total,
    };

    let outcome = tokio::time::timeout(REQUEST_DEADLINE, state.coordinator.checkout(input))
        .await
        .map_err(|_| ApiError::DeadlineExceeded)??;

    let http_status = if outcome.is_failure() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };

    let response = CheckoutResponse {
        order_id: outcome.order_id().to_string(),
        txid: outcome.txid(),
        status: outcome.status_str(),
    };

    Ok((http_status, Json(response)))
}
