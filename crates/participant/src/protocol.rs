//! Wire types for the participant endpoints.

use common::{OrderId, TxId};
use domain::OrderItem;
use serde::{Deserialize, Serialize};

/// Step tokens sent on the `/tcc/*` endpoints.
///
/// Orchestrated-saga calls reuse the same endpoints with a `saga_orch_`
/// prefix so participants can tell the disciplines apart.
pub mod steps {
    pub const RESERVE_INVENTORY: &str = "reserve_inventory";
    pub const CHARGE_PAYMENT: &str = "charge_payment";
    pub const ARRANGE_SHIPPING: &str = "arrange_shipping";

    pub const SAGA_ORCH_PREFIX: &str = "saga_orch_";
}

/// Body of `POST /2pc/prepare`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareRequest {
    pub txid: TxId,
    pub order_id: OrderId,
    pub items: Vec<OrderItem>,
    pub total: i64,
}

/// Participant vote returned from `POST /2pc/prepare`.
///
/// A missing body on a 2xx response counts as a YES vote; anything else
/// is a NO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareResponse {
    #[serde(default = "default_vote")]
    pub vote_yes: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_vote() -> bool {
    true
}

impl Default for PrepareResponse {
    fn default() -> Self {
        Self {
            vote_yes: true,
            reason: None,
        }
    }
}

/// Body of `POST /2pc/commit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub txid: TxId,
    pub order_id: OrderId,
}

/// Body of `POST /2pc/abort`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbortRequest {
    pub txid: TxId,
    pub order_id: OrderId,
}

/// Body of `POST /tcc/{try,confirm,cancel}`.
///
/// `items` and `amount` ride along on Try so participants can reserve;
/// Confirm and Cancel carry only the identifiers and the step token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRequest {
    pub txid: TxId,
    pub order_id: OrderId,
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_request_wire_shape() {
        let req = PrepareRequest {
            txid: TxId::new(),
            order_id: OrderId::from("ord-1"),
            items: vec![OrderItem {
                product_id: "sku-1".to_string(),
                quantity: 1,
            }],
            total: 1200,
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["order_id"], "ord-1");
        assert_eq!(json["total"], 1200);
        assert_eq!(json["items"][0]["product_id"], "sku-1");
        assert!(json["txid"].as_str().is_some());
    }

    #[test]
    fn test_prepare_response_defaults_to_yes() {
        let resp: PrepareResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.vote_yes);
        assert!(resp.reason.is_none());

        let resp: PrepareResponse =
            serde_json::from_str(r#"{"vote_yes": false, "reason": "out of stock"}"#).unwrap();
        assert!(!resp.vote_yes);
        assert_eq!(resp.reason.as_deref(), Some("out of stock"));
    }

    #[test]
    fn test_step_request_omits_empty_optionals() {
        let req = StepRequest {
            txid: TxId::new(),
            order_id: OrderId::from("ord-1"),
            step: steps::RESERVE_INVENTORY.to_string(),
            items: None,
            amount: None,
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["step"], "reserve_inventory");
        assert!(json.get("items").is_none());
        assert!(json.get("amount").is_none());
    }
}
