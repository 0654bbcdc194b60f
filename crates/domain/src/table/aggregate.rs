//! Table aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};

use super::{
    TableError, TableEvent, TableStatus,
    events::{TableCreatedData, TableReservedData, TableStatusOverriddenData},
};

/// A café table.
///
/// `current_order_id` is only set while the table is occupied and
/// `reserved_by` only while it is reserved; every event handler below keeps
/// both in step with `status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    number: u32,
    capacity: u32,
    status: TableStatus,
    current_order_id: Option<AggregateId>,
    reserved_by: Option<UserId>,
    guest_hint: Option<u32>,
    note: Option<String>,
    reserved_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Table {
    type Event = TableEvent;
    type Error = TableError;

    fn aggregate_type() -> &'static str {
        "Table"
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
            TableEvent::TableCreated(data) => self.apply_created(data),
            TableEvent::TableReserved(data) => self.apply_reserved(data),
            TableEvent::TableOccupied(data) => {
                self.clear_reservation();
                self.status = TableStatus::Occupied;
                self.current_order_id = Some(data.order_id);
                self.updated_at = Some(data.occupied_at);
            }
            TableEvent::TableReleased(data) => {
                self.clear_reservation();
                self.status = TableStatus::Available;
                self.current_order_id = None;
                self.updated_at = Some(data.released_at);
            }
            TableEvent::TableStatusOverridden(data) => self.apply_overridden(data),
        }
    }
}

impl SnapshotCapable for Table {
    fn snapshot_interval() -> usize {
        50
    }
}

// Query methods
impl Table {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn status(&self) -> TableStatus {
        self.status
    }

    pub fn current_order_id(&self) -> Option<AggregateId> {
        self.current_order_id
    }

    pub fn reserved_by(&self) -> Option<&UserId> {
        self.reserved_by.as_ref()
    }

    pub fn guest_hint(&self) -> Option<u32> {
        self.guest_hint
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn reserved_at(&self) -> Option<DateTime<Utc>> {
        self.reserved_at
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_reserved_by(&self, user: &UserId) -> bool {
        self.status == TableStatus::Reserved && self.reserved_by.as_ref() == Some(user)
    }

    /// True if `order_id` is the order currently seated here.
    pub fn is_serving(&self, order_id: AggregateId) -> bool {
        self.current_order_id == Some(order_id)
    }

    /// Checks a party size against this table.
    pub fn check_guest_count(&self, guest_count: u32) -> Result<(), TableError> {
        if guest_count == 0 {
            return Err(TableError::InvalidGuestCount);
        }
        if guest_count > self.capacity {
            return Err(TableError::GuestCountExceedsCapacity {
                guest_count,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

// Command methods (return events)
impl Table {
    pub fn create(
        &self,
        table_id: AggregateId,
        number: u32,
        capacity: u32,
    ) -> Result<Vec<TableEvent>, TableError> {
        if self.id.is_some() {
            return Err(TableError::AlreadyCreated);
        }
        if number == 0 {
            return Err(TableError::InvalidNumber);
        }
        if capacity == 0 {
            return Err(TableError::InvalidCapacity);
        }

        Ok(vec![TableEvent::table_created(table_id, number, capacity)])
    }

    /// Holds the table for `requester`.
    pub fn reserve(
        &self,
        requester: &Actor,
        guest_hint: Option<u32>,
        note: Option<String>,
    ) -> Result<Vec<TableEvent>, TableError> {
        if !self.status.can_reserve() {
            return Err(TableError::NotAvailable {
                status: self.status,
            });
        }
        if let Some(hint) = guest_hint {
            self.check_guest_count(hint)?;
        }

        Ok(vec![TableEvent::table_reserved(
            requester.id.clone(),
            guest_hint,
            note,
        )])
    }

    /// Seats `order_id`, consuming a reservation held by `requester`.
    pub fn occupy(
        &self,
        order_id: AggregateId,
        requester: &UserId,
    ) -> Result<Vec<TableEvent>, TableError> {
        match self.status {
            TableStatus::Available => {}
            TableStatus::Reserved if self.reserved_by.as_ref() == Some(requester) => {}
            TableStatus::Reserved => return Err(TableError::ReservedByOther),
            TableStatus::Occupied => {
                return Err(TableError::NotAvailable {
                    status: self.status,
                });
            }
        }

        Ok(vec![TableEvent::table_occupied(order_id)])
    }

    /// Returns the table to `Available`.
    ///
    /// Releasing a table that is already available and holds no references
    /// records nothing.
    pub fn release(&self, actor: &Actor, forced: bool) -> Result<Vec<TableEvent>, TableError> {
        if self.status == TableStatus::Available
            && self.current_order_id.is_none()
            && self.reserved_by.is_none()
        {
            return Ok(vec![]);
        }

        Ok(vec![TableEvent::table_released(actor.id.clone(), forced)])
    }

    /// Administrative override.
    ///
    /// Moving to `Available` drops both references. Moving to `Reserved`
    /// drops the order and keeps the existing holder, or makes `actor` the
    /// holder. Moving to `Occupied` drops the holder and keeps any order.
    pub fn set_status(
        &self,
        status: TableStatus,
        actor: &Actor,
    ) -> Result<Vec<TableEvent>, TableError> {
        let (reserved_by, current_order_id) = match status {
            TableStatus::Available => (None, None),
            TableStatus::Reserved => (
                Some(
                    self.reserved_by
                        .clone()
                        .unwrap_or_else(|| actor.id.clone()),
                ),
                None,
            ),
            TableStatus::Occupied => (None, self.current_order_id),
        };

        Ok(vec![TableEvent::TableStatusOverridden(
            TableStatusOverriddenData {
                status,
                reserved_by,
                current_order_id,
                overridden_by: actor.id.clone(),
                overridden_at: Utc::now(),
            },
        )])
    }
}

// Apply event helpers
impl Table {
    fn apply_created(&mut self, data: TableCreatedData) {
        self.id = Some(data.table_id);
        self.number = data.number;
        self.capacity = data.capacity;
        self.status = TableStatus::Available;
        self.created_at = Some(data.created_at);
        self.updated_at = Some(data.created_at);
    }

    fn apply_reserved(&mut self, data: TableReservedData) {
        self.status = TableStatus::Reserved;
        self.reserved_by = Some(data.reserved_by);
        self.guest_hint = data.guest_hint;
        self.note = data.note;
        self.reserved_at = Some(data.reserved_at);
        self.updated_at = Some(data.reserved_at);
    }

    fn apply_overridden(&mut self, data: TableStatusOverriddenData) {
        if data.reserved_by.is_none() {
            self.clear_reservation();
        }
        self.status = data.status;
        self.reserved_by = data.reserved_by;
        self.current_order_id = data.current_order_id;
        self.updated_at = Some(data.overridden_at);
    }

    fn clear_reservation(&mut self) {
        self.reserved_by = None;
        self.guest_hint = None;
        self.note = None;
        self.reserved_at = None;
    }
}
