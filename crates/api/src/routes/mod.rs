//! HTTP handlers, one module per resource.

pub mod health;
pub mod maintenance;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod reports;
pub mod tables;

use common::AggregateId;

use crate::error::ApiError;

fn parse_id(id: &str) -> Result<AggregateId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
