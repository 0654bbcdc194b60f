//! The gateway value and the plumbing shared by its operations.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono_tz::Tz;
use common::Actor;
use domain::{CatalogReader, OrderService, Product, TableService};
use event_store::EventStore;
use projections::{ProjectionProcessor, SalesReportView};

use crate::error::{ErrorKind, GatewayError, Result};
use crate::locks::LockManager;

/// Coordinates table and order workflows over one event store.
///
/// Cheap to share behind an `Arc`; all mutable state lives in the store.
pub struct CafeGateway<S, C>
where
    S: EventStore + Clone,
    C: CatalogReader,
{
    pub(crate) store: S,
    pub(crate) tables: TableService<S>,
    pub(crate) orders: OrderService<S>,
    pub(crate) catalog: C,
    pub(crate) locks: LockManager,
    pub(crate) sales: SalesReportView,
    pub(crate) processor: ProjectionProcessor<S>,
}

impl<S, C> CafeGateway<S, C>
where
    S: EventStore + Clone,
    C: CatalogReader,
{
    /// Builds a gateway whose reports default to `report_tz`.
    pub fn new(store: S, catalog: C, report_tz: Tz) -> Self {
        let sales = SalesReportView::new(report_tz);
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Arc::new(sales.clone()));

        Self {
            tables: TableService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            store,
            catalog,
            locks: LockManager::new(),
            sales,
            processor,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn report_timezone(&self) -> Tz {
        self.sales.default_tz()
    }

    /// Products currently on offer, sorted by name. Open to everyone.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.catalog.list_available().await?)
    }

    /// Runs `operation`, recording its latency and counting conflicts.
    pub(crate) async fn observe<T>(
        &self,
        operation: &'static str,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let started = Instant::now();
        let result = work.await;
        metrics::histogram!("gateway_operation_seconds", "operation" => operation)
            .record(started.elapsed().as_secs_f64());

        if let Err(err) = &result {
            match err.kind() {
                ErrorKind::Conflict => {
                    metrics::counter!("gateway_conflicts_total", "operation" => operation)
                        .increment(1);
                    tracing::warn!(operation, error = %err, "gateway conflict");
                }
                ErrorKind::Internal => {
                    tracing::error!(operation, error = %err, "gateway operation failed");
                }
                _ => tracing::debug!(operation, kind = %err.kind(), error = %err, "rejected"),
            }
        }
        result
    }
}

/// Fails unless `actor` holds an elevated role.
pub(crate) fn require_elevated(actor: &Actor, action: &str) -> Result<()> {
    if actor.is_elevated() {
        Ok(())
    } else {
        Err(GatewayError::forbidden(action))
    }
}
