//! Order endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{Aggregate, CatalogReader, LineItem, Money, Order, PlaceOrder};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::SharedGateway;
use crate::error::ApiError;
use crate::identity::CurrentActor;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub table_id: String,
    pub guest_count: u32,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Default, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub only_open: bool,
}

/// Staff action on an order, taken from the last path segment.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Confirm,
    Preparing,
    Ready,
    Served,
    Cancel,
    Pay,
    Settle,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub table_id: String,
    pub table_number: u32,
    pub owner: String,
    pub guest_count: u32,
    pub items: Vec<OrderItemResponse>,
    pub total: Money,
    pub fulfillment_status: &'static str,
    pub payment_status: &'static str,
    pub created_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub served_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

impl From<&LineItem> for OrderItemResponse {
    fn from(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            name: item.name.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            // Placement rejects orders whose totals overflow.
            line_total: item.line_total().unwrap_or_default(),
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().map(|id| id.to_string()).unwrap_or_default(),
            table_id: order.table_id().map(|id| id.to_string()).unwrap_or_default(),
            table_number: order.table_number(),
            owner: order.owner().map(|o| o.to_string()).unwrap_or_default(),
            guest_count: order.guest_count(),
            items: order.items().iter().map(OrderItemResponse::from).collect(),
            total: order.total(),
            fulfillment_status: order.fulfillment().as_str(),
            payment_status: order.payment().as_str(),
            created_at: order.created_at(),
            confirmed_at: order.confirmed_at(),
            preparing_at: order.preparing_at(),
            ready_at: order.ready_at(),
            served_at: order.served_at(),
            cancelled_at: order.cancelled_at(),
            paid_at: order.paid_at(),
            updated_at: order.updated_at(),
        }
    }
}

fn respond(orders: &[Order]) -> Json<Vec<OrderResponse>> {
    Json(orders.iter().map(OrderResponse::from).collect())
}

// -- Handlers --

/// POST /orders, placing an order and seating it at its table.
#[tracing::instrument(skip_all)]
pub async fn create<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let table_id = parse_id(&req.table_id)?;
    let cmd = req
        .items
        .into_iter()
        .fold(PlaceOrder::new(table_id, req.guest_count), |cmd, item| {
            cmd.with_item(item.product_id, item.quantity)
        });

    let order = gateway.create_order(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/{id}
pub async fn get<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let order = gateway.get_order(&actor, parse_id(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/my
pub async fn mine<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    Ok(respond(&gateway.my_orders(&actor).await?))
}

/// GET /admin/orders?only_open=
pub async fn list_all<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    Ok(respond(&gateway.list_orders(&actor, query.only_open).await?))
}

/// GET /admin/tables/{id}/orders
pub async fn by_table<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    Ok(respond(&gateway.orders_by_table(&actor, parse_id(&id)?).await?))
}

/// POST /admin/orders/{id}/{action}
#[tracing::instrument(skip(gateway, actor))]
pub async fn act<S, C>(
    State(gateway): State<SharedGateway<S, C>>,
    CurrentActor(actor): CurrentActor,
    Path((id, action)): Path<(String, OrderAction)>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let order_id = parse_id(&id)?;
    let order = match action {
        OrderAction::Confirm => gateway.confirm_order(&actor, order_id).await?,
        OrderAction::Preparing => gateway.start_preparing(&actor, order_id).await?,
        OrderAction::Ready => gateway.mark_ready(&actor, order_id).await?,
        OrderAction::Served => gateway.mark_served(&actor, order_id).await?,
        OrderAction::Cancel => gateway.cancel_order(&actor, order_id).await?,
        OrderAction::Pay => gateway.pay_order(&actor, order_id).await?,
        OrderAction::Settle => gateway.settle_order(&actor, order_id).await?,
    };
    Ok(Json(OrderResponse::from(&order)))
}
