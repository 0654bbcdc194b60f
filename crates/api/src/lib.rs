//! HTTP API server for the café workflow engine.
//!
//! Exposes every gateway operation over REST, with structured logging
//! (tracing) and Prometheus metrics. Callers are identified by the
//! `X-User-Id` / `X-User-Role` headers.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use chrono_tz::Tz;
use domain::{CatalogError, CatalogReader, InMemoryCatalog, Money, Product};
use event_store::EventStore;
use gateway::CafeGateway;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Gateway shared by every handler.
pub type SharedGateway<S, C> = Arc<CafeGateway<S, C>>;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, C>(gateway: SharedGateway<S, C>, metrics_handle: PrometheusHandle) -> Router
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    use routes::{maintenance, orders, products, reports, tables};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", get(products::list::<S, C>))
        // Tables
        .route("/tables", get(tables::list_public::<S, C>))
        .route("/tables/my", get(tables::mine::<S, C>))
        .route("/tables/{id}/reserve", post(tables::reserve::<S, C>))
        .route("/tables/{id}/release", post(tables::release::<S, C>))
        .route(
            "/admin/tables",
            post(tables::create::<S, C>).get(tables::list_all::<S, C>),
        )
        .route("/admin/tables/{id}/status", put(tables::set_status::<S, C>))
        .route("/admin/tables/{id}/orders", get(orders::by_table::<S, C>))
        // Orders
        .route("/orders", post(orders::create::<S, C>))
        .route("/orders/my", get(orders::mine::<S, C>))
        .route("/orders/{id}", get(orders::get::<S, C>))
        .route("/admin/orders", get(orders::list_all::<S, C>))
        .route("/admin/orders/{id}/{action}", post(orders::act::<S, C>))
        // Reports and maintenance
        .route("/admin/reports/daily", get(reports::daily::<S, C>))
        .route("/admin/reports/range", get(reports::range::<S, C>))
        .route(
            "/admin/reports/top-products",
            get(reports::top_products::<S, C>),
        )
        .route(
            "/admin/maintenance/backfill-paid-at",
            post(maintenance::backfill_paid_at::<S, C>),
        )
        .with_state(gateway)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the shared gateway over `store`.
pub fn create_gateway<S, C>(store: S, catalog: C, report_tz: Tz) -> SharedGateway<S, C>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    Arc::new(CafeGateway::new(store, catalog, report_tz))
}

/// The menu served when no catalog file is configured.
pub fn default_catalog() -> InMemoryCatalog {
    InMemoryCatalog::with_products([
        Product::new("ca-phe-sua-da", "Cà phê sữa đá", Money::from_minor(29000))
            .with_description("Iced coffee with condensed milk"),
        Product::new("ca-phe-den", "Cà phê đen", Money::from_minor(25000)),
        Product::new("bac-xiu", "Bạc xỉu", Money::from_minor(32000)),
        Product::new("tra-dao", "Trà đào cam sả", Money::from_minor(45000)),
        Product::new("banh-mi", "Bánh mì ốp la", Money::from_minor(35000)),
        Product::new("croissant", "Croissant", Money::from_minor(30000)),
    ])
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogLoadError {
    #[error("cannot read catalog {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] CatalogError),
}

/// Loads the catalog from a JSON array of products.
pub async fn load_catalog(path: &Path) -> Result<InMemoryCatalog, CatalogLoadError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(InMemoryCatalog::from_json(&json)?)
}
