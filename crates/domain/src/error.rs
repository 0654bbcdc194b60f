//! Domain error types.

use event_store::{EventStoreError, MissingEnvelopeField};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::order::OrderError;
use crate::table::TableError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    #[error(transparent)]
    Envelope(#[from] MissingEnvelopeField),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
