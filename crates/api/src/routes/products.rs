//! Public menu.

use axum::Json;
use axum::extract::State;
use domain::{CatalogReader, Product};
use event_store::EventStore;

use crate::SharedGateway;
use crate::error::ApiError;

/// GET /products: available products, sorted by name.
pub async fn list<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
) -> Result<Json<Vec<Product>>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    Ok(Json(gateway.list_products().await?))
}
