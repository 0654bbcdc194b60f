//! Domain layer for the café workflow engine.
//!
//! - [`Aggregate`] and [`DomainEvent`] traits for event-sourced entities
//! - [`CommandHandler`] and [`UnitOfWork`] for staging and committing events
//! - [`Table`] and [`Order`] aggregates with their state machines
//! - [`CatalogReader`] for the product data orders are priced from

pub mod aggregate;
pub mod catalog;
pub mod command;
pub mod error;
pub mod order;
pub mod table;
pub mod value_objects;

pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use catalog::{CatalogError, CatalogReader, InMemoryCatalog, Product};
pub use command::{Command, CommandHandler, CommandResult, Staged, UnitOfWork};
pub use error::DomainError;
pub use order::{
    AdvanceFulfillment, CancelOrder, FulfillmentStatus, Order, OrderError, OrderEvent,
    OrderFilter, OrderPaidData, OrderPlacedData, OrderService, PaidAtBackfilledData, PayOrder,
    PaymentStatus, PlaceOrder, SettleOrder,
};
pub use table::{
    CreateTable, OccupyTable, ReleaseTable, ReserveTable, SetTableStatus, Table, TableError,
    TableEvent, TableService, TableStatus,
};
pub use value_objects::{LineItem, Money, ProductId};
