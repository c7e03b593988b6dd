//! Health dashboard service: probes the datastore and cache store and folds
//! the results into one overall status.

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;

pub use cache::{CacheStore, RedisManager};
pub use config::AppConfig;
pub use database::{get_database_pool, run_migrations, DatabaseManager, Datastore, RecordCollection};
pub use error::{AppError, ProbeError, Result};
pub use handlers::routes::create_routes;
pub use health::{
    dashboard_aggregator, resolve_version, HealthAggregator, HealthReport, HealthStatus,
    ProcessContext, ProbeResult, ProbeStatus,
};

use axum::Router;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<HealthAggregator>,
}

impl AppState {
    pub fn new(aggregator: HealthAggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
        }
    }

    pub fn version(&self) -> &str {
        self.aggregator.context().version()
    }
}

pub fn create_app(state: AppState) -> Router {
    let router = Router::new().merge(create_routes()).with_state(state);
    middleware::logging::trace_requests(router)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
