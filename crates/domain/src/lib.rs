//! Domain model for the checkout transaction laboratory.
//!
//! Orders, their status lifecycle, the coordinator transaction log states,
//! checkout validation rules, and the event contract published on the bus.

pub mod error;
pub mod event;
pub mod order;
pub mod tx;

pub use error::ValidationError;
pub use event::{Event, taxonomy};
pub use order::{Order, OrderItem, OrderStatus, validate_checkout};
pub use tx::TxStatus;
