//! Table service: command execution and table lookups.

use common::{Actor, AggregateId};
use event_store::{EventQuery, EventStore};

use crate::command::{Command, CommandHandler, CommandResult, Staged};
use crate::error::DomainError;

use super::{
    CreateTable, OccupyTable, ReleaseTable, ReserveTable, SetTableStatus, Table,
    TableCreatedData, TableEvent,
};

pub struct TableService<S: EventStore> {
    handler: CommandHandler<S, Table>,
}

impl<S: EventStore> TableService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Table> {
        &self.handler
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn create_table(
        &self,
        cmd: CreateTable,
        actor: &Actor,
    ) -> Result<CommandResult<Table>, DomainError> {
        let table_id = cmd.aggregate_id();
        self.handler
            .execute(table_id, actor, |table| {
                table.create(table_id, cmd.number, cmd.capacity)
            })
            .await
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn reserve(
        &self,
        cmd: ReserveTable,
        actor: &Actor,
    ) -> Result<CommandResult<Table>, DomainError> {
        let table = self.handler.load_required(cmd.table_id).await?;
        let staged = self.handler.stage_on(table, cmd.table_id, actor, |table| {
            table.reserve(actor, cmd.guest_hint, cmd.note)
        })?;
        self.commit(staged).await
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn set_status(
        &self,
        cmd: SetTableStatus,
        actor: &Actor,
    ) -> Result<CommandResult<Table>, DomainError> {
        let table = self.handler.load_required(cmd.table_id).await?;
        let staged = self.handler.stage_on(table, cmd.table_id, actor, |table| {
            table.set_status(cmd.status, actor)
        })?;
        self.commit(staged).await
    }

    /// Stages a release against a loaded table.
    pub fn stage_release(
        &self,
        table: Table,
        cmd: ReleaseTable,
        actor: &Actor,
    ) -> Result<Staged<Table>, DomainError> {
        self.handler
            .stage_on(table, cmd.table_id, actor, |table| {
                table.release(actor, cmd.force)
            })
    }

    /// Stages seating an order against a loaded table.
    pub fn stage_occupy(
        &self,
        table: Table,
        cmd: OccupyTable,
        actor: &Actor,
    ) -> Result<Staged<Table>, DomainError> {
        self.handler.stage_on(table, cmd.table_id, actor, |table| {
            table.occupy(cmd.order_id, &actor.id)
        })
    }

    /// Persists a single staged change and snapshots if due.
    pub async fn commit(&self, staged: Staged<Table>) -> Result<CommandResult<Table>, DomainError> {
        let result = self.handler.commit(staged).await?;
        self.handler.snapshot_if_due(&result.aggregate).await?;
        Ok(result)
    }

    pub async fn get_table(&self, table_id: AggregateId) -> Result<Option<Table>, DomainError> {
        self.handler.load_existing(table_id).await
    }

    pub async fn require_table(&self, table_id: AggregateId) -> Result<Table, DomainError> {
        self.handler.load_required(table_id).await
    }

    /// Every table, ordered by table number.
    pub async fn list_tables(&self) -> Result<Vec<Table>, DomainError> {
        let mut tables = Vec::new();
        for created in self.created_events().await? {
            if let Some(table) = self.handler.load_existing(created.table_id).await? {
                tables.push(table);
            }
        }
        tables.sort_by_key(|t| t.number());
        Ok(tables)
    }

    /// Looks up a table by its number.
    pub async fn find_by_number(&self, number: u32) -> Result<Option<Table>, DomainError> {
        match self
            .created_events()
            .await?
            .into_iter()
            .find(|created| created.number == number)
        {
            Some(created) => self.handler.load_existing(created.table_id).await,
            None => Ok(None),
        }
    }

    async fn created_events(&self) -> Result<Vec<TableCreatedData>, DomainError> {
        let envelopes = self
            .handler
            .store()
            .query_events(EventQuery::for_event("Table", "TableCreated"))
            .await?;

        let mut created = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            let event: TableEvent = serde_json::from_value(envelope.payload)?;
            if let TableEvent::TableCreated(data) = event {
                created.push(data);
            }
        }
        Ok(created)
    }
}
