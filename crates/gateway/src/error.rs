//! Gateway error taxonomy.

use domain::{CatalogError, DomainError, OrderError, TableError};
use event_store::EventStoreError;
use projections::ProjectionError;
use serde::Serialize;
use thiserror::Error;

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    InvalidTransition,
    NotFound,
    Forbidden,
    AlreadyPaid,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::AlreadyPaid => "already_paid",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed gateway operation, carrying a kind and a human-readable message.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed input, rejected before any state was read.
    #[error("{0}")]
    Validation(String),

    /// The current state of a table or order does not allow the action.
    /// Safe to retry after re-reading.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    AlreadyPaid(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation(_) => ErrorKind::Validation,
            GatewayError::Conflict(_) => ErrorKind::Conflict,
            GatewayError::InvalidTransition(_) => ErrorKind::InvalidTransition,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::Forbidden(_) => ErrorKind::Forbidden,
            GatewayError::AlreadyPaid(_) => ErrorKind::AlreadyPaid,
            GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn forbidden(action: &str) -> Self {
        GatewayError::Forbidden(format!("Elevated role required to {action}"))
    }
}

impl From<OrderError> for GatewayError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::NoItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidPrice { .. }
            | OrderError::TotalOverflow
            | OrderError::InvalidGuestCount => GatewayError::Validation(message),
            OrderError::AlreadyPlaced => GatewayError::Conflict(message),
            OrderError::InvalidTransition { .. }
            | OrderError::PaidOrderNotCancellable
            | OrderError::CancelledOrderNotPayable => GatewayError::InvalidTransition(message),
            OrderError::AlreadyPaid => GatewayError::AlreadyPaid(message),
        }
    }
}

impl From<TableError> for GatewayError {
    fn from(err: TableError) -> Self {
        let message = err.to_string();
        match err {
            TableError::InvalidNumber
            | TableError::InvalidCapacity
            | TableError::InvalidGuestCount
            | TableError::GuestCountExceedsCapacity { .. } => GatewayError::Validation(message),
            TableError::AlreadyCreated
            | TableError::NotAvailable { .. }
            | TableError::ReservedByOther => GatewayError::Conflict(message),
        }
    }
}

impl From<CatalogError> for GatewayError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::ProductNotFound(_) => GatewayError::NotFound(message),
            CatalogError::ProductUnavailable(_) => GatewayError::Conflict(message),
            CatalogError::InvalidData(_) => GatewayError::Internal(message),
        }
    }
}

impl From<EventStoreError> for GatewayError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::ConcurrencyConflict { aggregate_id, .. } => GatewayError::Conflict(
                format!("{aggregate_id} was changed concurrently; re-read and retry"),
            ),
            EventStoreError::AggregateNotFound(id) => GatewayError::NotFound(format!("{id} not found")),
            other => GatewayError::Internal(other.to_string()),
        }
    }
}

impl From<DomainError> for GatewayError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Order(e) => e.into(),
            DomainError::Table(e) => e.into(),
            DomainError::Catalog(e) => e.into(),
            DomainError::EventStore(e) => e.into(),
            DomainError::AggregateNotFound {
                aggregate_type,
                aggregate_id,
            } => GatewayError::NotFound(format!("{aggregate_type} {aggregate_id} not found")),
            other => GatewayError::Internal(other.to_string()),
        }
    }
}

impl From<ProjectionError> for GatewayError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::InvalidRange { .. } => GatewayError::Validation(err.to_string()),
            other => GatewayError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::AggregateId;
    use domain::{FulfillmentStatus, ProductId, TableStatus};
    use event_store::Version;

    #[test]
    fn domain_errors_map_to_kinds() {
        let cases: Vec<(DomainError, ErrorKind)> = vec![
            (OrderError::NoItems.into(), ErrorKind::Validation),
            (
                OrderError::InvalidTransition {
                    from: FulfillmentStatus::Pending,
                    to: FulfillmentStatus::Ready,
                }
                .into(),
                ErrorKind::InvalidTransition,
            ),
            (OrderError::AlreadyPaid.into(), ErrorKind::AlreadyPaid),
            (
                TableError::NotAvailable {
                    status: TableStatus::Occupied,
                }
                .into(),
                ErrorKind::Conflict,
            ),
            (TableError::ReservedByOther.into(), ErrorKind::Conflict),
            (
                TableError::GuestCountExceedsCapacity {
                    guest_count: 5,
                    capacity: 4,
                }
                .into(),
                ErrorKind::Validation,
            ),
            (
                CatalogError::ProductNotFound(ProductId::new("x")).into(),
                ErrorKind::NotFound,
            ),
            (
                DomainError::AggregateNotFound {
                    aggregate_type: "Order",
                    aggregate_id: AggregateId::new().to_string(),
                },
                ErrorKind::NotFound,
            ),
        ];

        for (err, kind) in cases {
            assert_eq!(GatewayError::from(err).kind(), kind);
        }
    }

    #[test]
    fn concurrency_conflict_is_a_conflict() {
        let err = EventStoreError::ConcurrencyConflict {
            aggregate_id: AggregateId::new(),
            expected: Version::new(1),
            actual: Version::new(2),
        };
        assert_eq!(GatewayError::from(DomainError::from(err)).kind(), ErrorKind::Conflict);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InvalidTransition).unwrap();
        assert_eq!(json, "\"invalid_transition\"");
        assert_eq!(ErrorKind::AlreadyPaid.to_string(), "already_paid");
    }
}
