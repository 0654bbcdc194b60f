//! Table commands.

use common::AggregateId;

use crate::command::Command;

use super::{Table, TableStatus};

#[derive(Debug, Clone)]
pub struct CreateTable {
    pub table_id: AggregateId,
    pub number: u32,
    pub capacity: u32,
}

impl CreateTable {
    /// Creates the command with a generated table ID.
    pub fn new(number: u32, capacity: u32) -> Self {
        Self {
            table_id: AggregateId::new(),
            number,
            capacity,
        }
    }
}

impl Command for CreateTable {
    type Aggregate = Table;

    fn aggregate_id(&self) -> AggregateId {
        self.table_id
    }
}

#[derive(Debug, Clone)]
pub struct ReserveTable {
    pub table_id: AggregateId,
    pub guest_hint: Option<u32>,
    pub note: Option<String>,
}

impl ReserveTable {
    pub fn new(table_id: AggregateId) -> Self {
        Self {
            table_id,
            guest_hint: None,
            note: None,
        }
    }

    pub fn with_guest_hint(mut self, guests: u32) -> Self {
        self.guest_hint = Some(guests);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl Command for ReserveTable {
    type Aggregate = Table;

    fn aggregate_id(&self) -> AggregateId {
        self.table_id
    }
}

/// Seats an order. Issued only together with placing that order.
#[derive(Debug, Clone)]
pub struct OccupyTable {
    pub table_id: AggregateId,
    pub order_id: AggregateId,
}

impl Command for OccupyTable {
    type Aggregate = Table;

    fn aggregate_id(&self) -> AggregateId {
        self.table_id
    }
}

#[derive(Debug, Clone)]
pub struct ReleaseTable {
    pub table_id: AggregateId,

    /// Release even though an open order is attached.
    pub force: bool,
}

impl ReleaseTable {
    pub fn new(table_id: AggregateId) -> Self {
        Self {
            table_id,
            force: false,
        }
    }

    pub fn forced(table_id: AggregateId) -> Self {
        Self {
            table_id,
            force: true,
        }
    }
}

impl Command for ReleaseTable {
    type Aggregate = Table;

    fn aggregate_id(&self) -> AggregateId {
        self.table_id
    }
}

#[derive(Debug, Clone)]
pub struct SetTableStatus {
    pub table_id: AggregateId,
    pub status: TableStatus,
}

impl Command for SetTableStatus {
    type Aggregate = Table;

    fn aggregate_id(&self) -> AggregateId {
        self.table_id
    }
}
