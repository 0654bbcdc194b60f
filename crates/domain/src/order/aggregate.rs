//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::value_objects::{LineItem, Money};

use super::{
    FulfillmentStatus, OrderError, OrderEvent, PaymentStatus,
    events::{FulfillmentStepData, OrderPlacedData},
};

/// An order placed at a table.
///
/// Line items and the total are fixed when the order is placed. After that
/// only the fulfillment and payment statuses (and their timestamps) change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    table_id: Option<AggregateId>,
    table_number: u32,
    owner: Option<UserId>,
    guest_count: u32,
    items: Vec<LineItem>,
    total: Money,
    fulfillment: FulfillmentStatus,
    payment: PaymentStatus,
    created_at: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    preparing_at: Option<DateTime<Utc>>,
    ready_at: Option<DateTime<Utc>>,
    served_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_placed(data),
            OrderEvent::OrderConfirmed(data) => {
                self.apply_step(FulfillmentStatus::Confirmed, &data);
                self.confirmed_at = Some(data.at);
            }
            OrderEvent::OrderPreparing(data) => {
                self.apply_step(FulfillmentStatus::Preparing, &data);
                self.preparing_at = Some(data.at);
            }
            OrderEvent::OrderReady(data) => {
                self.apply_step(FulfillmentStatus::Ready, &data);
                self.ready_at = Some(data.at);
            }
            OrderEvent::OrderServed(data) => {
                self.apply_step(FulfillmentStatus::Served, &data);
                self.served_at = Some(data.at);
            }
            OrderEvent::OrderCancelled(data) => {
                self.fulfillment = FulfillmentStatus::Cancelled;
                self.cancelled_at = Some(data.cancelled_at);
                self.updated_at = Some(data.cancelled_at);
            }
            OrderEvent::OrderPaid(data) => {
                self.payment = PaymentStatus::Paid;
                self.paid_at = data.paid_at;
                if data.paid_at.is_some() {
                    self.updated_at = data.paid_at;
                }
            }
            OrderEvent::PaidAtBackfilled(data) => {
                self.paid_at = Some(data.paid_at);
            }
        }
    }
}

// Query methods
impl Order {
    pub fn table_id(&self) -> Option<AggregateId> {
        self.table_id
    }

    pub fn table_number(&self) -> u32 {
        self.table_number
    }

    pub fn owner(&self) -> Option<&UserId> {
        self.owner.as_ref()
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner.as_ref() == Some(user)
    }

    pub fn guest_count(&self) -> u32 {
        self.guest_count
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn fulfillment(&self) -> FulfillmentStatus {
        self.fulfillment
    }

    pub fn payment(&self) -> PaymentStatus {
        self.payment
    }

    pub fn is_paid(&self) -> bool {
        self.payment == PaymentStatus::Paid
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn preparing_at(&self) -> Option<DateTime<Utc>> {
        self.preparing_at
    }

    pub fn ready_at(&self) -> Option<DateTime<Utc>> {
        self.ready_at
    }

    pub fn served_at(&self) -> Option<DateTime<Utc>> {
        self.served_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Neither cancelled nor both served and paid.
    pub fn is_open(&self) -> bool {
        !self.is_finished()
    }

    /// Cancelled, or served and paid. A finished order frees its table.
    pub fn is_finished(&self) -> bool {
        match self.fulfillment {
            FulfillmentStatus::Cancelled => true,
            FulfillmentStatus::Served => self.is_paid(),
            _ => false,
        }
    }
}

// Command methods (return events)
impl Order {
    /// Places a new order.
    ///
    /// `items` must already carry catalog snapshots. Guest count is checked
    /// against the table by the caller.
    pub fn place(
        &self,
        order_id: AggregateId,
        table_id: AggregateId,
        table_number: u32,
        owner: UserId,
        guest_count: u32,
        items: Vec<LineItem>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }
        validate_request(guest_count, &items)?;
        if let Some(item) = items.iter().find(|item| item.unit_price.is_negative()) {
            return Err(OrderError::InvalidPrice {
                product_id: item.product_id.to_string(),
            });
        }

        let total = LineItem::order_total(&items).ok_or(OrderError::TotalOverflow)?;

        Ok(vec![OrderEvent::OrderPlaced(OrderPlacedData {
            order_id,
            table_id,
            table_number,
            owner,
            guest_count,
            items,
            total,
            placed_at: Utc::now(),
        })])
    }

    /// Moves fulfillment to `target`, which must be the next forward step
    /// or `Cancelled`.
    pub fn advance(
        &self,
        target: FulfillmentStatus,
        actor: &Actor,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if target == FulfillmentStatus::Cancelled {
            return self.cancel(actor);
        }

        let invalid = OrderError::InvalidTransition {
            from: self.fulfillment,
            to: target,
        };
        if !self.fulfillment.can_transition_to(target) {
            return Err(invalid);
        }

        OrderEvent::fulfillment_step(target, actor.id.clone(), Utc::now())
            .map(|event| vec![event])
            .ok_or(invalid)
    }

    pub fn cancel(&self, actor: &Actor) -> Result<Vec<OrderEvent>, OrderError> {
        if !self
            .fulfillment
            .can_transition_to(FulfillmentStatus::Cancelled)
        {
            return Err(OrderError::InvalidTransition {
                from: self.fulfillment,
                to: FulfillmentStatus::Cancelled,
            });
        }
        if self.is_paid() {
            return Err(OrderError::PaidOrderNotCancellable);
        }

        Ok(vec![OrderEvent::order_cancelled(actor.id.clone())])
    }

    /// Marks the order paid. Allowed at any fulfillment stage except
    /// `Cancelled`.
    pub fn pay(&self, actor: &Actor) -> Result<Vec<OrderEvent>, OrderError> {
        self.check_payable()?;
        Ok(vec![OrderEvent::order_paid(actor.id.clone(), Utc::now())])
    }

    /// Walks every remaining forward step up to `Served`, then pays.
    pub fn settle(&self, actor: &Actor) -> Result<Vec<OrderEvent>, OrderError> {
        self.check_payable()?;

        let now = Utc::now();
        let mut events = Vec::new();
        let mut status = self.fulfillment;
        while let Some(next) = status.next() {
            events.extend(OrderEvent::fulfillment_step(next, actor.id.clone(), now));
            status = next;
        }
        events.push(OrderEvent::order_paid(actor.id.clone(), now));

        Ok(events)
    }

    /// Fills in a missing payment time from `signal`.
    ///
    /// Records nothing when the order is unpaid or already has a time.
    pub fn backfill_paid_at(&self, signal: DateTime<Utc>) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.is_paid() || self.paid_at.is_some() {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::PaidAtBackfilled(
            super::events::PaidAtBackfilledData {
                paid_at: signal,
                backfilled_at: Utc::now(),
            },
        )])
    }

    fn check_payable(&self) -> Result<(), OrderError> {
        if self.fulfillment == FulfillmentStatus::Cancelled {
            return Err(OrderError::CancelledOrderNotPayable);
        }
        if self.is_paid() {
            return Err(OrderError::AlreadyPaid);
        }
        Ok(())
    }
}

fn validate_request(guest_count: u32, items: &[LineItem]) -> Result<(), OrderError> {
    if guest_count == 0 {
        return Err(OrderError::InvalidGuestCount);
    }
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }
    if let Some(item) = items.iter().find(|item| item.quantity == 0) {
        return Err(OrderError::InvalidQuantity {
            product_id: item.product_id.to_string(),
        });
    }
    Ok(())
}

// Apply event helpers
impl Order {
    fn apply_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.table_id = Some(data.table_id);
        self.table_number = data.table_number;
        self.owner = Some(data.owner);
        self.guest_count = data.guest_count;
        self.items = data.items;
        self.total = data.total;
        self.fulfillment = FulfillmentStatus::Pending;
        self.payment = PaymentStatus::Unpaid;
        self.created_at = Some(data.placed_at);
        self.updated_at = Some(data.placed_at);
    }

    fn apply_step(&mut self, status: FulfillmentStatus, data: &FulfillmentStepData) {
        self.fulfillment = status;
        self.updated_at = Some(data.at);
    }
}
