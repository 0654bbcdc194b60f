//! Order operations.

use common::{Actor, AggregateId};
use domain::{
    AdvanceFulfillment, CancelOrder, CatalogReader, DomainError, FulfillmentStatus,
    OccupyTable, Order, OrderFilter, OrderService, PayOrder, PlaceOrder, ReleaseTable,
    SettleOrder, Staged, UnitOfWork,
};
use event_store::EventStore;

use crate::error::{GatewayError, Result};
use crate::gateway::{CafeGateway, require_elevated};
use crate::locks::LockKey;

impl<S, C> CafeGateway<S, C>
where
    S: EventStore + Clone,
    C: CatalogReader,
{
    /// Places an order and seats it at its table in one atomic commit.
    #[tracing::instrument(skip(self, actor, cmd), fields(actor = %actor.id, table_id = %cmd.table_id))]
    pub async fn create_order(&self, actor: &Actor, cmd: PlaceOrder) -> Result<Order> {
        self.observe("create_order", async {
            cmd.validate()?;

            let (_table_guard, _order_guard) = self
                .locks
                .acquire_table_and_order(cmd.table_id, cmd.order_id)
                .await;

            let table = self.tables.require_table(cmd.table_id).await?;
            let staged_table = self.tables.stage_occupy(
                table.clone(),
                OccupyTable {
                    table_id: cmd.table_id,
                    order_id: cmd.order_id,
                },
                actor,
            )?;
            let items = self.orders.resolve_items(&cmd, &self.catalog).await?;
            let staged_order = self.orders.stage_place(&cmd, &table, items, actor)?;

            let mut unit = UnitOfWork::new();
            let table = unit.push(staged_table);
            let order = unit.push(staged_order);
            unit.commit(&self.store).await?;
            self.tables.handler().snapshot_if_due(&table).await?;

            metrics::counter!("orders_placed_total").increment(1);
            tracing::info!(
                order_id = %cmd.order_id,
                table_number = table.number(),
                total = %order.total(),
                "order placed"
            );
            Ok(order)
        })
        .await
    }

    /// One order, visible to its owner and to elevated roles.
    pub async fn get_order(&self, actor: &Actor, order_id: AggregateId) -> Result<Order> {
        self.observe("get_order", async {
            let order = self.orders.require_order(order_id).await?;
            if !actor.is_elevated() && !order.is_owned_by(&actor.id) {
                return Err(GatewayError::Forbidden(
                    "Orders are visible to their owner or an elevated role".to_string(),
                ));
            }
            Ok(order)
        })
        .await
    }

    /// The caller's orders, newest first.
    pub async fn my_orders(&self, actor: &Actor) -> Result<Vec<Order>> {
        self.observe("my_orders", async {
            Ok(self
                .orders
                .list_orders(OrderFilter::for_owner(actor.id.clone()))
                .await?)
        })
        .await
    }

    /// All orders, newest first, optionally only open ones.
    pub async fn list_orders(&self, actor: &Actor, only_open: bool) -> Result<Vec<Order>> {
        self.observe("list_orders", async {
            require_elevated(actor, "list all orders")?;
            let filter = if only_open {
                OrderFilter::open()
            } else {
                OrderFilter::all()
            };
            Ok(self.orders.list_orders(filter).await?)
        })
        .await
    }

    /// Order history of one table, newest first.
    pub async fn orders_by_table(&self, actor: &Actor, table_id: AggregateId) -> Result<Vec<Order>> {
        self.observe("orders_by_table", async {
            require_elevated(actor, "view table history")?;
            self.tables.require_table(table_id).await?;
            Ok(self.orders.list_orders(OrderFilter::for_table(table_id)).await?)
        })
        .await
    }

    /// Moves fulfillment to `target`, which must be the next step or
    /// `Cancelled`.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn advance_order(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        target: FulfillmentStatus,
    ) -> Result<Order> {
        self.observe("advance_order", async {
            require_elevated(actor, "advance orders")?;
            let order = self
                .transition(actor, order_id, |orders, order| {
                    orders.stage_advance(order, AdvanceFulfillment::new(order_id, target), actor)
                })
                .await?;

            if target == FulfillmentStatus::Cancelled {
                metrics::counter!("orders_cancelled_total").increment(1);
            }
            tracing::info!(%order_id, status = %order.fulfillment(), "order advanced");
            Ok(order)
        })
        .await
    }

    pub async fn confirm_order(&self, actor: &Actor, order_id: AggregateId) -> Result<Order> {
        self.advance_order(actor, order_id, FulfillmentStatus::Confirmed)
            .await
    }

    pub async fn start_preparing(&self, actor: &Actor, order_id: AggregateId) -> Result<Order> {
        self.advance_order(actor, order_id, FulfillmentStatus::Preparing)
            .await
    }

    pub async fn mark_ready(&self, actor: &Actor, order_id: AggregateId) -> Result<Order> {
        self.advance_order(actor, order_id, FulfillmentStatus::Ready)
            .await
    }

    pub async fn mark_served(&self, actor: &Actor, order_id: AggregateId) -> Result<Order> {
        self.advance_order(actor, order_id, FulfillmentStatus::Served)
            .await
    }

    /// Cancels an unpaid, non-terminal order and frees its table.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn cancel_order(&self, actor: &Actor, order_id: AggregateId) -> Result<Order> {
        self.observe("cancel_order", async {
            require_elevated(actor, "cancel orders")?;
            let order = self
                .transition(actor, order_id, |orders, order| {
                    orders.stage_cancel(order, CancelOrder { order_id }, actor)
                })
                .await?;

            metrics::counter!("orders_cancelled_total").increment(1);
            tracing::info!(%order_id, "order cancelled");
            Ok(order)
        })
        .await
    }

    /// Records payment. Paying twice fails with `AlreadyPaid`.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn pay_order(&self, actor: &Actor, order_id: AggregateId) -> Result<Order> {
        self.observe("pay_order", async {
            require_elevated(actor, "take payments")?;
            let order = self
                .transition(actor, order_id, |orders, order| {
                    orders.stage_pay(order, PayOrder { order_id }, actor)
                })
                .await?;

            metrics::counter!("orders_paid_total").increment(1);
            tracing::info!(%order_id, total = %order.total(), "order paid");
            Ok(order)
        })
        .await
    }

    /// Serves through every remaining step, pays, and frees the table in
    /// one commit.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn settle_order(&self, actor: &Actor, order_id: AggregateId) -> Result<Order> {
        self.observe("settle_order", async {
            require_elevated(actor, "settle orders")?;
            let order = self
                .transition(actor, order_id, |orders, order| {
                    orders.stage_settle(order, SettleOrder { order_id }, actor)
                })
                .await?;

            metrics::counter!("orders_paid_total").increment(1);
            tracing::info!(%order_id, total = %order.total(), "order settled");
            Ok(order)
        })
        .await
    }

    /// Fills in missing payment times on paid orders from the time their
    /// payment was committed. Returns how many orders were repaired.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn backfill_paid_at(&self, actor: &Actor) -> Result<u64> {
        self.observe("backfill_paid_at", async {
            require_elevated(actor, "run maintenance")?;

            let mut fixed = 0;
            for (order_id, signal) in self.orders.payments_missing_time().await? {
                let _guard = self.locks.acquire(LockKey::Order(order_id)).await;
                let order = self.orders.require_order(order_id).await?;
                if !order.is_paid() || order.paid_at().is_some() {
                    continue;
                }

                let staged = self.orders.stage_backfill(order, order_id, signal, actor)?;
                self.orders.handler().commit(staged).await?;
                fixed += 1;
            }

            tracing::info!(fixed, "paid-at backfill complete");
            Ok(fixed)
        })
        .await
    }

    /// Applies an order command under the table-then-order locks and, when
    /// the order becomes finished, releases the table it occupies in the
    /// same commit.
    async fn transition<F>(&self, actor: &Actor, order_id: AggregateId, decide: F) -> Result<Order>
    where
        F: FnOnce(&OrderService<S>, Order) -> std::result::Result<Staged<Order>, DomainError>,
    {
        let table_id = self
            .orders
            .require_order(order_id)
            .await?
            .table_id()
            .ok_or_else(|| GatewayError::Internal(format!("order {order_id} has no table")))?;

        let (_table_guard, _order_guard) = self
            .locks
            .acquire_table_and_order(table_id, order_id)
            .await;

        let order = self.orders.require_order(order_id).await?;
        let mut unit = UnitOfWork::new();
        let order = unit.push(decide(&self.orders, order)?);

        let mut released = None;
        if order.is_finished()
            && let Some(table) = self.tables.get_table(table_id).await?
            && table.is_serving(order_id)
        {
            let staged = self
                .tables
                .stage_release(table, ReleaseTable::new(table_id), actor)?;
            released = Some(unit.push(staged));
        }

        unit.commit(&self.store).await?;

        if let Some(table) = released {
            self.tables.handler().snapshot_if_due(&table).await?;
            tracing::info!(
                table_number = table.number(),
                %order_id,
                "table released after order finished"
            );
        }
        Ok(order)
    }
}
