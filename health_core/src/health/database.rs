//! Relational datastore probe

use crate::database::{Datastore, RecordCollection};
use crate::error::{ProbeError, Result};
use crate::health::probe::{elapsed_ms, DatabaseMetadata, Probe, ProbeResult, RecordCounts, ServiceMetadata};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

/// Pings the datastore, then collects record counts.
///
/// `response_time_ms` on success covers the ping alone; the counts run after
/// the measurement is taken. On failure it covers everything up to the error.
pub struct DatabaseProbe {
    datastore: Arc<dyn Datastore>,
}

impl DatabaseProbe {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    async fn record_counts(&self) -> Result<RecordCounts> {
        let (accounts, sessions, messages, machines) = tokio::try_join!(
            self.datastore.count(RecordCollection::Accounts),
            self.datastore.count(RecordCollection::Sessions),
            self.datastore.count(RecordCollection::Messages),
            self.datastore.count(RecordCollection::Machines),
        )?;

        Ok(RecordCounts {
            accounts,
            sessions,
            messages,
            machines,
        })
    }
}

#[async_trait::async_trait]
impl Probe for DatabaseProbe {
    async fn probe(&self) -> ProbeResult {
        let start = Instant::now();

        if let Err(e) = self.datastore.ping().await {
            return ProbeResult::error(ProbeError::Connectivity(e.to_string()), elapsed_ms(start));
        }
        let response_time_ms = elapsed_ms(start);
        debug!("Database answered ping in {}ms", response_time_ms);

        match self.record_counts().await {
            Ok(record_counts) => ProbeResult::ok(response_time_ms)
                .with_metadata(ServiceMetadata::Database(DatabaseMetadata { record_counts })),
            Err(e) => ProbeResult::error(ProbeError::Operation(e.to_string()), elapsed_ms(start)),
        }
    }
}
