//! Dependency probes and the aggregator that folds them into one status

pub mod aggregator;
pub mod cache;
pub mod context;
pub mod database;
pub mod info;
pub mod probe;


pub use aggregator::{classify, Criticality, DependencyDescriptor, HealthAggregator, HealthReport, HealthStatus, DEFAULT_PROBE_TIMEOUT};
pub use cache::RedisProbe;
pub use context::{resolve_version, ProcessContext, UNKNOWN_VERSION};
pub use database::DatabaseProbe;
pub use probe::{CacheMetadata, DatabaseMetadata, Probe, ProbeResult, ProbeStatus, RecordCounts, ServiceMetadata};

use crate::cache::CacheStore;
use crate::database::Datastore;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

pub const DATABASE_SERVICE: &str = "database";
pub const REDIS_SERVICE: &str = "redis";

/// The dashboard's dependency set: the database is critical, redis is not.
pub fn dashboard_aggregator(
    context: ProcessContext,
    datastore: Arc<dyn Datastore>,
    cache: Arc<dyn CacheStore>,
    probe_timeout: Duration,
) -> Result<HealthAggregator> {
    HealthAggregator::new(context)
        .with_probe_timeout(probe_timeout)
        .register(DependencyDescriptor::critical(
            DATABASE_SERVICE,
            Arc::new(DatabaseProbe::new(datastore)),
        ))?
        .register(DependencyDescriptor::non_critical(
            REDIS_SERVICE,
            Arc::new(RedisProbe::new(cache)),
        ))
}
