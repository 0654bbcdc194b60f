//! Order commands.

use common::AggregateId;

use crate::command::Command;
use crate::value_objects::ProductId;

use super::{FulfillmentStatus, Order, OrderError};

/// Place an order at a table.
///
/// Items name products and quantities; names and prices are resolved from
/// the catalog when the order is staged.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: AggregateId,
    pub table_id: AggregateId,
    pub guest_count: u32,
    pub items: Vec<(ProductId, u32)>,
}

impl PlaceOrder {
    /// Creates the command with a generated order ID.
    pub fn new(table_id: AggregateId, guest_count: u32) -> Self {
        Self {
            order_id: AggregateId::new(),
            table_id,
            guest_count,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, product_id: impl Into<ProductId>, quantity: u32) -> Self {
        self.items.push((product_id.into(), quantity));
        self
    }

    /// Checks the request shape without reading any state.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.guest_count == 0 {
            return Err(OrderError::InvalidGuestCount);
        }
        if self.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if let Some((product_id, _)) = self.items.iter().find(|(_, quantity)| *quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: product_id.to_string(),
            });
        }
        Ok(())
    }
}

impl Command for PlaceOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

#[derive(Debug, Clone)]
pub struct AdvanceFulfillment {
    pub order_id: AggregateId,
    pub target: FulfillmentStatus,
}

impl AdvanceFulfillment {
    pub fn new(order_id: AggregateId, target: FulfillmentStatus) -> Self {
        Self { order_id, target }
    }
}

impl Command for AdvanceFulfillment {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: AggregateId,
}

impl Command for CancelOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

#[derive(Debug, Clone)]
pub struct PayOrder {
    pub order_id: AggregateId,
}

impl Command for PayOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Serve (through every remaining step) and pay in one go.
#[derive(Debug, Clone)]
pub struct SettleOrder {
    pub order_id: AggregateId,
}

impl Command for SettleOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}
