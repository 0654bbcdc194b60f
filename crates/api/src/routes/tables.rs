//! Table endpoints.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{
    Aggregate, CatalogReader, CreateTable, ReleaseTable, ReserveTable, SetTableStatus, Table,
    TableStatus,
};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::SharedGateway;
use crate::error::ApiError;
use crate::identity::CurrentActor;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateTableRequest {
    pub number: u32,
    pub capacity: u32,
}

#[derive(Default, Deserialize)]
pub struct ReserveTableRequest {
    #[serde(default)]
    pub guest_hint: Option<u32>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: TableStatus,
}

#[derive(Default, Deserialize)]
pub struct ReleaseQuery {
    #[serde(default)]
    pub force: bool,
}

// -- Response types --

/// Full table details, for elevated callers and for the caller's own tables.
#[derive(Serialize)]
pub struct TableResponse {
    pub id: String,
    pub number: u32,
    pub capacity: u32,
    pub status: &'static str,
    pub current_order_id: Option<String>,
    pub reserved_by: Option<String>,
    pub guest_hint: Option<u32>,
    pub note: Option<String>,
    pub reserved_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Table> for TableResponse {
    fn from(table: &Table) -> Self {
        Self {
            id: table.id().map(|id| id.to_string()).unwrap_or_default(),
            number: table.number(),
            capacity: table.capacity(),
            status: table.status().as_str(),
            current_order_id: table.current_order_id().map(|id| id.to_string()),
            reserved_by: table.reserved_by().map(|user| user.to_string()),
            guest_hint: table.guest_hint(),
            note: table.note().map(String::from),
            reserved_at: table.reserved_at(),
            updated_at: table.updated_at(),
        }
    }
}

/// What any authenticated caller may see about a table.
#[derive(Serialize)]
pub struct PublicTableResponse {
    pub id: String,
    pub number: u32,
    pub capacity: u32,
    pub status: &'static str,
}

impl From<&Table> for PublicTableResponse {
    fn from(table: &Table) -> Self {
        Self {
            id: table.id().map(|id| id.to_string()).unwrap_or_default(),
            number: table.number(),
            capacity: table.capacity(),
            status: table.status().as_str(),
        }
    }
}

fn full(tables: &[Table]) -> Vec<TableResponse> {
    tables.iter().map(TableResponse::from).collect()
}

// -- Handlers --

/// POST /admin/tables
#[tracing::instrument(skip_all)]
pub async fn create<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<CreateTableRequest>,
) -> Result<(StatusCode, Json<TableResponse>), ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let table = gateway
        .create_table(&actor, CreateTable::new(req.number, req.capacity))
        .await?;
    Ok((StatusCode::CREATED, Json(TableResponse::from(&table))))
}

/// GET /admin/tables
pub async fn list_all<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<TableResponse>>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    Ok(Json(full(&gateway.list_tables(&actor).await?)))
}

/// GET /tables
pub async fn list_public<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(_): CurrentActor,
) -> Result<Json<Vec<PublicTableResponse>>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let tables = gateway.list_public_tables().await?;
    Ok(Json(tables.iter().map(PublicTableResponse::from).collect()))
}

/// GET /tables/my
pub async fn mine<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<TableResponse>>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    Ok(Json(full(&gateway.my_tables(&actor).await?)))
}

/// POST /tables/{id}/reserve, with an optional JSON body.
#[tracing::instrument(skip(gateway, actor, body))]
pub async fn reserve<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TableResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let table_id = parse_id(&id)?;
    let req: ReserveTableRequest = if body.is_empty() {
        ReserveTableRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid reservation body: {e}")))?
    };

    let mut cmd = ReserveTable::new(table_id);
    if let Some(guests) = req.guest_hint {
        cmd = cmd.with_guest_hint(guests);
    }
    if let Some(note) = req.note {
        cmd = cmd.with_note(note);
    }

    let table = gateway.reserve_table(&actor, cmd).await?;
    Ok(Json(TableResponse::from(&table)))
}

/// POST /tables/{id}/release?force=
#[tracing::instrument(skip(gateway, actor, query))]
pub async fn release<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Query(query): Query<ReleaseQuery>,
) -> Result<Json<TableResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let table_id = parse_id(&id)?;
    let cmd = if query.force {
        ReleaseTable::forced(table_id)
    } else {
        ReleaseTable::new(table_id)
    };

    let table = gateway.release_table(&actor, cmd).await?;
    Ok(Json(TableResponse::from(&table)))
}

/// PUT /admin/tables/{id}/status
#[tracing::instrument(skip(gateway, actor, req))]
pub async fn set_status<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<TableResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let cmd = SetTableStatus {
        table_id: parse_id(&id)?,
        status: req.status,
    };
    let table = gateway.set_table_status(&actor, cmd).await?;
    Ok(Json(TableResponse::from(&table)))
}
