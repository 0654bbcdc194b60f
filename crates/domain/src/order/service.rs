//! Order service: staging order commands and order lookups.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId, UserId};
use event_store::{EventQuery, EventStore};

use crate::catalog::{CatalogError, CatalogReader};
use crate::command::{CommandHandler, Staged};
use crate::error::DomainError;
use crate::table::Table;
use crate::value_objects::LineItem;

use super::{
    AdvanceFulfillment, CancelOrder, Order, OrderEvent, OrderPlacedData, PayOrder, PlaceOrder,
    SettleOrder,
};

/// Narrows an order listing.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub owner: Option<UserId>,
    pub table_id: Option<AggregateId>,

    /// Keep only orders that are neither cancelled nor served-and-paid.
    pub only_open: bool,
}

impl OrderFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn open() -> Self {
        Self {
            only_open: true,
            ..Default::default()
        }
    }

    pub fn for_owner(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            ..Default::default()
        }
    }

    pub fn for_table(table_id: AggregateId) -> Self {
        Self {
            table_id: Some(table_id),
            ..Default::default()
        }
    }

    fn matches_placement(&self, placed: &OrderPlacedData) -> bool {
        self.owner.as_ref().is_none_or(|owner| *owner == placed.owner)
            && self.table_id.is_none_or(|id| id == placed.table_id)
    }
}

/// Stages order commands for the gateway to commit, alone or alongside
/// table changes.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    /// Resolves requested products into line items with name and price
    /// snapshots.
    pub async fn resolve_items<C: CatalogReader + ?Sized>(
        &self,
        cmd: &PlaceOrder,
        catalog: &C,
    ) -> Result<Vec<LineItem>, DomainError> {
        let mut items = Vec::with_capacity(cmd.items.len());
        for (product_id, quantity) in &cmd.items {
            let product = catalog
                .get_product(product_id)
                .await?
                .ok_or_else(|| CatalogError::ProductNotFound(product_id.clone()))?;
            if !product.available {
                return Err(CatalogError::ProductUnavailable(product_id.clone()).into());
            }
            items.push(LineItem::new(
                product.id,
                product.name,
                product.price,
                *quantity,
            ));
        }
        Ok(items)
    }

    /// Stages a new order for `table`. The table's own change is staged
    /// separately.
    #[tracing::instrument(skip(self, table, items, actor), fields(actor = %actor.id))]
    pub fn stage_place(
        &self,
        cmd: &PlaceOrder,
        table: &Table,
        items: Vec<LineItem>,
        actor: &Actor,
    ) -> Result<Staged<Order>, DomainError> {
        table.check_guest_count(cmd.guest_count)?;

        let order_id = cmd.order_id;
        self.handler
            .stage_on(Order::default(), order_id, actor, |order| {
                order.place(
                    order_id,
                    cmd.table_id,
                    table.number(),
                    actor.id.clone(),
                    cmd.guest_count,
                    items,
                )
            })
    }

    pub fn stage_advance(
        &self,
        order: Order,
        cmd: AdvanceFulfillment,
        actor: &Actor,
    ) -> Result<Staged<Order>, DomainError> {
        self.handler
            .stage_on(order, cmd.order_id, actor, |order| {
                order.advance(cmd.target, actor)
            })
    }

    pub fn stage_cancel(
        &self,
        order: Order,
        cmd: CancelOrder,
        actor: &Actor,
    ) -> Result<Staged<Order>, DomainError> {
        self.handler
            .stage_on(order, cmd.order_id, actor, |order| order.cancel(actor))
    }

    pub fn stage_pay(
        &self,
        order: Order,
        cmd: PayOrder,
        actor: &Actor,
    ) -> Result<Staged<Order>, DomainError> {
        self.handler
            .stage_on(order, cmd.order_id, actor, |order| order.pay(actor))
    }

    pub fn stage_settle(
        &self,
        order: Order,
        cmd: SettleOrder,
        actor: &Actor,
    ) -> Result<Staged<Order>, DomainError> {
        self.handler
            .stage_on(order, cmd.order_id, actor, |order| order.settle(actor))
    }

    pub fn stage_backfill(
        &self,
        order: Order,
        order_id: AggregateId,
        signal: DateTime<Utc>,
        actor: &Actor,
    ) -> Result<Staged<Order>, DomainError> {
        self.handler
            .stage_on(order, order_id, actor, |order| {
                order.backfill_paid_at(signal)
            })
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }

    pub async fn require_order(&self, order_id: AggregateId) -> Result<Order, DomainError> {
        self.handler.load_required(order_id).await
    }

    /// Orders matching `filter`, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError> {
        let envelopes = self
            .handler
            .store()
            .query_events(EventQuery::for_event("Order", "OrderPlaced"))
            .await?;

        let mut orders = Vec::new();
        for envelope in envelopes {
            let event: OrderEvent = serde_json::from_value(envelope.payload)?;
            let OrderEvent::OrderPlaced(placed) = event else {
                continue;
            };
            if !filter.matches_placement(&placed) {
                continue;
            }
            if let Some(order) = self.handler.load_existing(placed.order_id).await?
                && (!filter.only_open || order.is_open())
            {
                orders.push(order);
            }
        }

        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    /// Payments recorded without a time, with the commit time of the
    /// payment event.
    pub async fn payments_missing_time(
        &self,
    ) -> Result<Vec<(AggregateId, DateTime<Utc>)>, DomainError> {
        let envelopes = self
            .handler
            .store()
            .query_events(EventQuery::for_event("Order", "OrderPaid"))
            .await?;

        let mut missing = Vec::new();
        for envelope in envelopes {
            let event: OrderEvent = serde_json::from_value(envelope.payload)?;
            if let OrderEvent::OrderPaid(paid) = event
                && paid.paid_at.is_none()
            {
                missing.push((envelope.aggregate_id, envelope.timestamp));
            }
        }
        Ok(missing)
    }
}
