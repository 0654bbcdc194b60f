//! Sales reporting over paid orders.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use common::AggregateId;
use domain::{LineItem, Money, OrderEvent, ProductId};
use event_store::RecordedEvent;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::period::ReportPeriod;
use crate::projection::{Projection, ProjectionPosition};

/// Number of products returned by [`SalesReportView::top_products`] when
/// the caller asks for zero.
pub const DEFAULT_TOP_PRODUCTS: usize = 10;

/// Revenue, order count, and guests over a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub total_revenue: Money,
    pub orders_count: u64,
    pub guests: u64,
}

/// Quantity and revenue of one product over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u64,
    pub revenue: Money,
}

/// What a placed order contributes to sales once it is paid.
#[derive(Debug, Clone)]
struct Sale {
    guests: u32,
    total: Money,
    items: Vec<LineItem>,
    paid: bool,
    paid_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Paid with a known time inside the period.
    fn counts_in(&self, period: &ReportPeriod, tz: Tz) -> bool {
        self.paid && self.paid_at.is_some_and(|at| period.contains(at, tz))
    }
}

#[derive(Default)]
struct SalesState {
    sales: HashMap<AggregateId, Sale>,
    position: ProjectionPosition,
}

impl SalesState {
    fn apply(&mut self, order_id: AggregateId, event: OrderEvent) {
        match event {
            OrderEvent::OrderPlaced(data) => {
                self.sales.entry(order_id).or_insert(Sale {
                    guests: data.guest_count,
                    total: data.total,
                    items: data.items,
                    paid: false,
                    paid_at: None,
                });
            }
            OrderEvent::OrderPaid(data) => {
                if let Some(sale) = self.sales.get_mut(&order_id) {
                    sale.paid = true;
                    sale.paid_at = data.paid_at;
                }
            }
            OrderEvent::PaidAtBackfilled(data) => {
                if let Some(sale) = self.sales.get_mut(&order_id) {
                    sale.paid_at = Some(data.paid_at);
                }
            }
            OrderEvent::OrderCancelled(_) => {
                self.sales.remove(&order_id);
            }
            OrderEvent::OrderConfirmed(_)
            | OrderEvent::OrderPreparing(_)
            | OrderEvent::OrderReady(_)
            | OrderEvent::OrderServed(_) => {}
        }
    }
}

/// Read model of paid orders keyed by payment time.
///
/// Cancelled orders are dropped. Payments recorded without a time stay out
/// of every report until their time is backfilled.
#[derive(Clone)]
pub struct SalesReportView {
    state: Arc<RwLock<SalesState>>,
    default_tz: Tz,
}

impl SalesReportView {
    pub fn new(default_tz: Tz) -> Self {
        Self {
            state: Arc::new(RwLock::new(SalesState::default())),
            default_tz,
        }
    }

    pub fn default_tz(&self) -> Tz {
        self.default_tz
    }

    /// Sales paid on `date` in `tz`.
    pub async fn daily_report(&self, date: chrono::NaiveDate, tz: Option<Tz>) -> SalesSummary {
        self.summarize(ReportPeriod::day(date), tz).await
    }

    /// Sales paid within the inclusive `period` in `tz`.
    pub async fn range_report(&self, period: ReportPeriod, tz: Option<Tz>) -> SalesSummary {
        self.summarize(period, tz).await
    }

    /// Best-selling products by revenue within `period`.
    ///
    /// Ties are ordered by product id. A `limit` of zero means
    /// [`DEFAULT_TOP_PRODUCTS`].
    pub async fn top_products(
        &self,
        period: ReportPeriod,
        limit: usize,
        tz: Option<Tz>,
    ) -> Vec<ProductSales> {
        let tz = tz.unwrap_or(self.default_tz);
        let limit = if limit == 0 { DEFAULT_TOP_PRODUCTS } else { limit };

        let state = self.state.read().await;
        let mut by_product: BTreeMap<ProductId, ProductSales> = BTreeMap::new();
        for sale in state.sales.values().filter(|s| s.counts_in(&period, tz)) {
            for item in &sale.items {
                let entry = by_product
                    .entry(item.product_id.clone())
                    .or_insert_with(|| ProductSales {
                        product_id: item.product_id.clone(),
                        name: item.name.clone(),
                        quantity: 0,
                        revenue: Money::zero(),
                    });
                entry.quantity += u64::from(item.quantity);
                entry.revenue = entry
                    .revenue
                    .saturating_add(item.line_total().unwrap_or(Money::zero()));
            }
        }

        // BTreeMap yields ascending ids, so a stable sort keeps ties ordered.
        let mut products: Vec<_> = by_product.into_values().collect();
        products.sort_by(|a, b| b.revenue.cmp(&a.revenue));
        products.truncate(limit);
        products
    }

    /// Number of orders currently tracked, paid or not.
    pub async fn tracked_orders(&self) -> usize {
        self.state.read().await.sales.len()
    }

    async fn summarize(&self, period: ReportPeriod, tz: Option<Tz>) -> SalesSummary {
        let tz = tz.unwrap_or(self.default_tz);
        let state = self.state.read().await;
        state
            .sales
            .values()
            .filter(|s| s.counts_in(&period, tz))
            .fold(SalesSummary::default(), |mut acc, sale| {
                acc.total_revenue = acc.total_revenue.saturating_add(sale.total);
                acc.orders_count += 1;
                acc.guests += u64::from(sale.guests);
                acc
            })
    }
}

#[async_trait]
impl Projection for SalesReportView {
    fn name(&self) -> &'static str {
        "sales_report"
    }

    async fn handle(&self, recorded: &RecordedEvent) -> Result<()> {
        let event = &recorded.event;
        let mut state = self.state.write().await;

        if event.aggregate_type == "Order" {
            match serde_json::from_value::<OrderEvent>(event.payload.clone()) {
                Ok(order_event) => state.apply(event.aggregate_id, order_event),
                // Retrying cannot decode it either; leave it out of the reports.
                Err(error) => tracing::warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    log_position = recorded.position,
                    %error,
                    "skipping undecodable order event"
                ),
            }
        }

        state.position = ProjectionPosition::at(recorded.position);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = SalesState::default();
        Ok(())
    }
}
