//! Main entry point for the health dashboard binary

use anyhow::Result;
use health_core::{
    create_app, dashboard_aggregator, get_database_pool, resolve_version, run_migrations, run_server,
    AppConfig, AppState, DatabaseManager, ProcessContext, RedisManager,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    let context = ProcessContext::capture(resolve_version(
        config.health.version.as_deref(),
        option_env!("CARGO_PKG_VERSION"),
    ));

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());

    let addr: SocketAddr = config.bind_address().parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

    let pool = get_database_pool(&config.database)
        .map_err(|e| anyhow::anyhow!("Failed to configure database pool: {}", e))?;

    if config.database.migrate_on_start {
        // The dashboard must still come up to report a database that is down.
        if let Err(e) = run_migrations(pool.clone()).await {
            warn!("Failed to run database migrations: {}", e);
        }
    }

    let redis = RedisManager::new(&config.redis)
        .map_err(|e| anyhow::anyhow!("Failed to configure Redis client: {}", e))?;

    let aggregator = dashboard_aggregator(
        context,
        Arc::new(DatabaseManager::new(pool)),
        Arc::new(redis),
        config.health.probe_timeout(),
    )?;

    let state = AppState::new(aggregator);
    info!("Health dashboard v{} initialized", state.version());

    let app = create_app(state);

    run_server(app, addr).await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            let default_level = if cfg!(debug_assertions) {
                "debug"
            } else {
                "info"
            };

            format!(
                "{}={},health_core={},tower_http=debug,axum=debug",
                env!("CARGO_CRATE_NAME").replace('-', "_"),
                default_level,
                default_level
            ).into()
        });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.pretty())
            .init();
    }
}
