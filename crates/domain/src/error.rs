use thiserror::Error;

/// Errors raised by checkout validation. Each one maps to a 400 at the
/// HTTP boundary before any state is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The item list is empty.
    #[error("items is required")]
    NoItems,

    /// The order total is negative.
    #[error("total must be >= 0, got {0}")]
    NegativeTotal(i64),

    /// An item has a blank product ID.
    #[error("each item must have a product_id")]
    BlankProductId,

    /// An item has a non-positive quantity.
    #[error("item {product_id} must have quantity > 0, got {quantity}")]
    InvalidQuantity { product_id: String, quantity: i32 },
}
