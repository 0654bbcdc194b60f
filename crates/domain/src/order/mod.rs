//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;

pub use aggregate::Order;
pub use commands::{AdvanceFulfillment, CancelOrder, PayOrder, PlaceOrder, SettleOrder};
pub use events::{
    FulfillmentStepData, OrderCancelledData, OrderEvent, OrderPaidData, OrderPlacedData,
    PaidAtBackfilledData,
};
pub use service::{OrderFilter, OrderService};
pub use state::{FulfillmentStatus, PaymentStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order already placed")]
    AlreadyPlaced,

    #[error("Order has no items")]
    NoItems,

    #[error("Invalid quantity for {product_id} (must be at least 1)")]
    InvalidQuantity { product_id: String },

    #[error("Invalid price for {product_id} (must not be negative)")]
    InvalidPrice { product_id: String },

    #[error("Order total is too large")]
    TotalOverflow,

    #[error("Guest count must be at least 1")]
    InvalidGuestCount,

    #[error("Invalid transition: cannot move from {from} to {to}")]
    InvalidTransition {
        from: FulfillmentStatus,
        to: FulfillmentStatus,
    },

    #[error("Paid orders cannot be cancelled")]
    PaidOrderNotCancellable,

    #[error("Cancelled orders cannot be paid")]
    CancelledOrderNotPayable,

    #[error("Order is already paid")]
    AlreadyPaid,
}
