//! Table aggregate: occupancy state and the link to the active order.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;

pub use aggregate::Table;
pub use commands::{CreateTable, OccupyTable, ReleaseTable, ReserveTable, SetTableStatus};
pub use events::{
    TableCreatedData, TableEvent, TableOccupiedData, TableReleasedData, TableReservedData,
    TableStatusOverriddenData,
};
pub use service::TableService;
pub use state::TableStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Table already created")]
    AlreadyCreated,

    #[error("Table number must be at least 1")]
    InvalidNumber,

    #[error("Table capacity must be at least 1")]
    InvalidCapacity,

    /// The table's current status does not allow the request.
    #[error("Table is {status}, not available")]
    NotAvailable { status: TableStatus },

    #[error("Table is reserved by another party")]
    ReservedByOther,

    #[error("Guest count must be at least 1")]
    InvalidGuestCount,

    #[error("Guest count {guest_count} exceeds table capacity {capacity}")]
    GuestCountExceedsCapacity { guest_count: u32, capacity: u32 },
}
