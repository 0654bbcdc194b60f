//! API server entry point.

use api::config::Config;
use domain::CatalogReader;
use event_store::{EventStore, InMemoryEventStore, PostgresEventStore};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S, C>(
    config: &Config,
    store: S,
    catalog: C,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError>
where
    S: EventStore + Clone + 'static,
    C: CatalogReader + 'static,
{
    let gateway = api::create_gateway(store, catalog, config.report_timezone);
    let app = api::create_app(gateway, metrics_handle);

    let addr = config.addr();
    tracing::info!(
        %addr,
        report_timezone = config.report_timezone.name(),
        "starting API server"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Seed the catalog
    let catalog = match &config.catalog_path {
        Some(path) => api::load_catalog(path).await?,
        None => api::default_catalog(),
    };
    tracing::info!(products = catalog.len().await, "catalog loaded");

    // 4. Pick the event store and serve
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PostgresEventStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL event store");
            serve(&config, store, catalog, metrics_handle).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set; events are kept in memory only");
            serve(&config, InMemoryEventStore::new(), catalog, metrics_handle).await
        }
    }
}
