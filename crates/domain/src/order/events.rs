//! Order domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::value_objects::{LineItem, Money};

use super::FulfillmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    OrderPlaced(OrderPlacedData),
    OrderConfirmed(FulfillmentStepData),
    OrderPreparing(FulfillmentStepData),
    OrderReady(FulfillmentStepData),
    OrderServed(FulfillmentStepData),
    OrderCancelled(OrderCancelledData),
    OrderPaid(OrderPaidData),

    /// A missing payment time was repaired after the fact.
    PaidAtBackfilled(PaidAtBackfilledData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderConfirmed(_) => "OrderConfirmed",
            OrderEvent::OrderPreparing(_) => "OrderPreparing",
            OrderEvent::OrderReady(_) => "OrderReady",
            OrderEvent::OrderServed(_) => "OrderServed",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
            OrderEvent::OrderPaid(_) => "OrderPaid",
            OrderEvent::PaidAtBackfilled(_) => "PaidAtBackfilled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub table_id: AggregateId,

    /// Table number at order time, kept for listings.
    pub table_number: u32,

    pub owner: UserId,
    pub guest_count: u32,

    /// Price snapshots, in the order they were requested.
    pub items: Vec<LineItem>,

    /// Sum of line totals, fixed at placement.
    pub total: Money,

    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentStepData {
    pub by: UserId,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub cancelled_by: UserId,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPaidData {
    pub paid_by: UserId,

    /// Absent on payments recorded before the time was captured.
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaidAtBackfilledData {
    pub paid_at: DateTime<Utc>,
    pub backfilled_at: DateTime<Utc>,
}

impl OrderEvent {
    /// The event recording a forward move to `status`.
    ///
    /// Returns None for `Pending` and `Cancelled`, which are not steps.
    pub fn fulfillment_step(status: FulfillmentStatus, by: UserId, at: DateTime<Utc>) -> Option<Self> {
        let data = FulfillmentStepData { by, at };
        match status {
            FulfillmentStatus::Confirmed => Some(OrderEvent::OrderConfirmed(data)),
            FulfillmentStatus::Preparing => Some(OrderEvent::OrderPreparing(data)),
            FulfillmentStatus::Ready => Some(OrderEvent::OrderReady(data)),
            FulfillmentStatus::Served => Some(OrderEvent::OrderServed(data)),
            FulfillmentStatus::Pending | FulfillmentStatus::Cancelled => None,
        }
    }

    pub fn order_cancelled(cancelled_by: UserId) -> Self {
        OrderEvent::OrderCancelled(OrderCancelledData {
            cancelled_by,
            cancelled_at: Utc::now(),
        })
    }

    pub fn order_paid(paid_by: UserId, paid_at: DateTime<Utc>) -> Self {
        OrderEvent::OrderPaid(OrderPaidData {
            paid_by,
            paid_at: Some(paid_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_payment_without_time_still_deserializes() {
        let json = serde_json::json!({
            "type": "OrderPaid",
            "data": { "paid_by": "cashier-1" }
        });

        let event: OrderEvent = serde_json::from_value(json).unwrap();
        match event {
            OrderEvent::OrderPaid(data) => {
                assert_eq!(data.paid_by, UserId::new("cashier-1"));
                assert!(data.paid_at.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn only_forward_statuses_map_to_step_events() {
        let by = UserId::new("admin");
        let now = Utc::now();

        let event = OrderEvent::fulfillment_step(FulfillmentStatus::Ready, by.clone(), now).unwrap();
        assert_eq!(event.event_type(), "OrderReady");
        assert!(OrderEvent::fulfillment_step(FulfillmentStatus::Pending, by.clone(), now).is_none());
        assert!(OrderEvent::fulfillment_step(FulfillmentStatus::Cancelled, by, now).is_none());
    }
}
