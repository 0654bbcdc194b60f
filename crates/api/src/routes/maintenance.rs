//! Operator maintenance endpoints.

use axum::extract::State;
use domain::CatalogReader;
use event_store::EventStore;

use crate::SharedGateway;
use crate::error::ApiError;
use crate::identity::CurrentActor;

/// POST /admin/maintenance/backfill-paid-at
///
/// Responds with `fixed=<count>` in plain text.
#[tracing::instrument(skip_all)]
pub async fn backfill_paid_at<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
) -> Result<String, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let fixed = gateway.backfill_paid_at(&actor).await?;
    Ok(format!("fixed={fixed}"))
}
