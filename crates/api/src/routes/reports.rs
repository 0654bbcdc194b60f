//! Sales report endpoints. Dates are `YYYY-MM-DD`; `tz` is an IANA zone name.

use axum::Json;
use axum::extract::{Query, State};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use domain::CatalogReader;
use event_store::EventStore;
use projections::{ProductSales, SalesSummary};
use serde::{Deserialize, Serialize};

use crate::SharedGateway;
use crate::error::ApiError;
use crate::identity::CurrentActor;

#[derive(Deserialize)]
pub struct DailyQuery {
    /// Defaults to today in the effective zone.
    pub date: Option<NaiveDate>,
    pub tz: Option<String>,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub tz: Option<String>,
}

#[derive(Deserialize)]
pub struct TopProductsQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub limit: usize,
    pub tz: Option<String>,
}

#[derive(Serialize)]
pub struct SalesReportResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub timezone: String,
    #[serde(flatten)]
    pub summary: SalesSummary,
}

#[derive(Serialize)]
pub struct TopProductsResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub timezone: String,
    pub products: Vec<ProductSales>,
}

fn parse_tz(tz: Option<&str>) -> Result<Option<Tz>, ApiError> {
    tz.map(|name| {
        name.parse::<Tz>()
            .map_err(|_| ApiError::BadRequest(format!("Unknown time zone: {name}")))
    })
    .transpose()
}

/// GET /admin/reports/daily?date=&tz=
#[tracing::instrument(skip(gateway, actor, query))]
pub async fn daily<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<DailyQuery>,
) -> Result<Json<SalesReportResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let tz = parse_tz(query.tz.as_deref())?;
    let zone = tz.unwrap_or_else(|| gateway.report_timezone());
    let date = query
        .date
        .unwrap_or_else(|| Utc::now().with_timezone(&zone).date_naive());

    let summary = gateway.daily_report(&actor, date, tz).await?;
    Ok(Json(SalesReportResponse {
        start: date,
        end: date,
        timezone: zone.name().to_string(),
        summary,
    }))
}

/// GET /admin/reports/range?start=&end=&tz=
#[tracing::instrument(skip(gateway, actor, query))]
pub async fn range<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<RangeQuery>,
) -> Result<Json<SalesReportResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let tz = parse_tz(query.tz.as_deref())?;
    let summary = gateway
        .range_report(&actor, query.start, query.end, tz)
        .await?;
    Ok(Json(SalesReportResponse {
        start: query.start,
        end: query.end,
        timezone: tz.unwrap_or_else(|| gateway.report_timezone()).name().to_string(),
        summary,
    }))
}

/// GET /admin/reports/top-products?start=&end=&limit=&tz=
#[tracing::instrument(skip(gateway, actor, query))]
pub async fn top_products<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<TopProductsQuery>,
) -> Result<Json<TopProductsResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let tz = parse_tz(query.tz.as_deref())?;
    let products = gateway
        .top_products(&actor, query.start, query.end, query.limit, tz)
        .await?;
    Ok(Json(TopProductsResponse {
        start: query.start,
        end: query.end,
        timezone: tz.unwrap_or_else(|| gateway.report_timezone()).name().to_string(),
        products,
    }))
}
