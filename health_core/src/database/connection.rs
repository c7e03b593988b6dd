use crate::config::DatabaseConfig;
use crate::database::datastore::{Datastore, RecordCollection};
use crate::error::{AppError, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Row, SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Datastore for DatabaseManager {
    async fn ping(&self) -> Result<()> {
        let row = sqlx::query("SELECT 1 as alive")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                debug!("Database ping failed: {}", e);
                AppError::from(e)
            })?;

        let alive: i32 = row.try_get("alive").map_err(AppError::from)?;

        if alive == 1 {
            Ok(())
        } else {
            Err(AppError::Database(format!(
                "Unexpected liveness response: {}",
                alive
            )))
        }
    }

    async fn count(&self, collection: RecordCollection) -> Result<u64> {
        // Table names come from a closed enum, never from input.
        let sql = format!("SELECT COUNT(*) as total FROM {}", collection.table_name());

        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;

        let total: i64 = row.try_get("total").map_err(AppError::from)?;
        debug!("Counted {} {}", total, collection);

        u64::try_from(total).map_err(|_| {
            AppError::Database(format!("Negative count for {}: {}", collection, total))
        })
    }
}

/// Builds the pool without connecting, so the process comes up even when the
/// database is unreachable and the dashboard can report it.
pub fn get_database_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    info!("Configuring database pool: {}", config.url);

    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| {
            error!("Invalid database URL: {}", e);
            AppError::from(e)
        })?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connection_timeout())
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect_lazy_with(options);

    info!("Database connection pool configured");
    Ok(pool)
}
