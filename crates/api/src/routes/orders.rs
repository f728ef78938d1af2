//! Order status lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use domain::OrderStatus;
use participant::ParticipantClient;
use serde::Serialize;
use store::CheckoutStore;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct OrderStatusResponse {
    pub status: OrderStatus,
}

/// GET /orders/{id} — returns the order's current status.
#[tracing::instrument(skip(state))]
pub async fn get<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderStatusResponse>, ApiError>
where
    S: CheckoutStore + 'static,
    C: ParticipantClient + 'static,
{
    let order_id = OrderId::from(id.as_str());
    let order = state
        .store
        .get_order(&order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;

    Ok(Json(OrderStatusResponse {
        status: order.status,
    }))
}
