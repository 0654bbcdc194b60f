//! Table domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::TableStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TableEvent {
    TableCreated(TableCreatedData),
    TableReserved(TableReservedData),

    /// An order was seated at the table.
    TableOccupied(TableOccupiedData),

    TableReleased(TableReleasedData),

    /// An administrator set the status directly.
    TableStatusOverridden(TableStatusOverriddenData),
}

impl DomainEvent for TableEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TableEvent::TableCreated(_) => "TableCreated",
            TableEvent::TableReserved(_) => "TableReserved",
            TableEvent::TableOccupied(_) => "TableOccupied",
            TableEvent::TableReleased(_) => "TableReleased",
            TableEvent::TableStatusOverridden(_) => "TableStatusOverridden",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCreatedData {
    pub table_id: AggregateId,
    pub number: u32,
    pub capacity: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReservedData {
    pub reserved_by: UserId,

    /// Expected party size, if the requester gave one.
    pub guest_hint: Option<u32>,

    pub note: Option<String>,
    pub reserved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableOccupiedData {
    pub order_id: AggregateId,
    pub occupied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReleasedData {
    pub released_by: UserId,

    /// True when an open order was still attached.
    pub forced: bool,

    pub released_at: DateTime<Utc>,
}

/// Carries the references the table holds after the override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStatusOverriddenData {
    pub status: TableStatus,
    pub reserved_by: Option<UserId>,
    pub current_order_id: Option<AggregateId>,
    pub overridden_by: UserId,
    pub overridden_at: DateTime<Utc>,
}

impl TableEvent {
    pub fn table_created(table_id: AggregateId, number: u32, capacity: u32) -> Self {
        TableEvent::TableCreated(TableCreatedData {
            table_id,
            number,
            capacity,
            created_at: Utc::now(),
        })
    }

    pub fn table_reserved(
        reserved_by: UserId,
        guest_hint: Option<u32>,
        note: Option<String>,
    ) -> Self {
        TableEvent::TableReserved(TableReservedData {
            reserved_by,
            guest_hint,
            note,
            reserved_at: Utc::now(),
        })
    }

    pub fn table_occupied(order_id: AggregateId) -> Self {
        TableEvent::TableOccupied(TableOccupiedData {
            order_id,
            occupied_at: Utc::now(),
        })
    }

    pub fn table_released(released_by: UserId, forced: bool) -> Self {
        TableEvent::TableReleased(TableReleasedData {
            released_by,
            forced,
            released_at: Utc::now(),
        })
    }
}
