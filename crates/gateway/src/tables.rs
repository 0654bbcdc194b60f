//! Table operations.

use common::{Actor, AggregateId};
use domain::{
    Aggregate, CatalogReader, CreateTable, OrderFilter, ReleaseTable, ReserveTable,
    SetTableStatus, Table, TableStatus,
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
    /// Adds a table. Table numbers are unique.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn create_table(&self, actor: &Actor, cmd: CreateTable) -> Result<Table> {
        self.observe("create_table", async {
            require_elevated(actor, "create tables")?;
            let _guard = self.locks.acquire(LockKey::TableNumber(cmd.number)).await;

            if self.tables.find_by_number(cmd.number).await?.is_some() {
                return Err(GatewayError::Conflict(format!(
                    "Table number {} already exists",
                    cmd.number
                )));
            }

            let result = self.tables.create_table(cmd, actor).await?;
            tracing::info!(
                table_number = result.aggregate.number(),
                capacity = result.aggregate.capacity(),
                "table created"
            );
            Ok(result.aggregate)
        })
        .await
    }

    /// Every table with full details, by number.
    pub async fn list_tables(&self, actor: &Actor) -> Result<Vec<Table>> {
        self.observe("list_tables", async {
            require_elevated(actor, "list table details")?;
            Ok(self.tables.list_tables().await?)
        })
        .await
    }

    /// Every table, by number. Callers decide which fields to expose.
    pub async fn list_public_tables(&self) -> Result<Vec<Table>> {
        self.observe("list_public_tables", async {
            Ok(self.tables.list_tables().await?)
        })
        .await
    }

    /// Tables the caller holds a reservation on or is seated at.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn my_tables(&self, actor: &Actor) -> Result<Vec<Table>> {
        self.observe("my_tables", async {
            let my_orders = self
                .orders
                .list_orders(OrderFilter::for_owner(actor.id.clone()))
                .await?;

            let tables = self.tables.list_tables().await?;
            Ok(tables
                .into_iter()
                .filter(|table| {
                    table.is_reserved_by(&actor.id)
                        || table.current_order_id().is_some_and(|current| {
                            my_orders.iter().any(|o| o.id() == Some(current))
                        })
                })
                .collect())
        })
        .await
    }

    pub async fn get_table(&self, table_id: AggregateId) -> Result<Table> {
        Ok(self.tables.require_table(table_id).await?)
    }

    /// Administrative status override.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn set_table_status(&self, actor: &Actor, cmd: SetTableStatus) -> Result<Table> {
        self.observe("set_table_status", async {
            require_elevated(actor, "override table status")?;
            let _guard = self.locks.acquire(LockKey::Table(cmd.table_id)).await;

            let before = self.tables.require_table(cmd.table_id).await?;
            if cmd.status == TableStatus::Available
                && let Some(order_id) = before.current_order_id()
            {
                tracing::warn!(
                    table_number = before.number(),
                    %order_id,
                    "table forced available while an order is attached"
                );
            }

            let result = self.tables.set_status(cmd, actor).await?;
            tracing::info!(
                table_number = result.aggregate.number(),
                status = %result.aggregate.status(),
                "table status overridden"
            );
            Ok(result.aggregate)
        })
        .await
    }

    /// Holds an available table for the caller.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn reserve_table(&self, actor: &Actor, cmd: ReserveTable) -> Result<Table> {
        self.observe("reserve_table", async {
            let _guard = self.locks.acquire(LockKey::Table(cmd.table_id)).await;

            let result = self.tables.reserve(cmd, actor).await?;
            metrics::counter!("tables_reserved_total").increment(1);
            tracing::info!(table_number = result.aggregate.number(), "table reserved");
            Ok(result.aggregate)
        })
        .await
    }

    /// Returns a table to `Available`.
    ///
    /// Elevated callers may release any table but must pass `force` while an
    /// open order is still seated there. Other callers may only give up a
    /// reservation they hold.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn release_table(&self, actor: &Actor, cmd: ReleaseTable) -> Result<Table> {
        self.observe("release_table", async {
            let _guard = self.locks.acquire(LockKey::Table(cmd.table_id)).await;
            let table = self.tables.require_table(cmd.table_id).await?;

            if !actor.is_elevated() {
                if !table.is_reserved_by(&actor.id) {
                    return Err(GatewayError::Forbidden(
                        "Only the reserving party or an elevated role can release this table"
                            .to_string(),
                    ));
                }
            } else if let Some(order_id) = table.current_order_id() {
                let open = match self.orders.get_order(order_id).await? {
                    Some(order) => order.is_open(),
                    None => false,
                };
                if open && !cmd.force {
                    return Err(GatewayError::Conflict(format!(
                        "Table {} is serving open order {order_id}; release with force to override",
                        table.number()
                    )));
                }
                if open {
                    tracing::warn!(
                        table_number = table.number(),
                        %order_id,
                        "force-releasing table with an open order"
                    );
                }
            }

            let staged = self.tables.stage_release(table, cmd, actor)?;
            let result = self.tables.commit(staged).await?;
            tracing::info!(table_number = result.aggregate.number(), "table released");
            Ok(result.aggregate)
        })
        .await
    }
}
