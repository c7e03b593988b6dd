//! Cache-store probe

use crate::cache::CacheStore;
use crate::error::ProbeError;
use crate::health::info::parse_cache_info;
use crate::health::probe::{elapsed_ms, Probe, ProbeResult, ServiceMetadata};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

/// Pings the cache store, then reads client and memory figures from `INFO`.
/// Timing follows the same rule as [`super::DatabaseProbe`].
pub struct RedisProbe {
    cache: Arc<dyn CacheStore>,
}

impl RedisProbe {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }
}

#[async_trait::async_trait]
impl Probe for RedisProbe {
    async fn probe(&self) -> ProbeResult {
        let start = Instant::now();

        if let Err(e) = self.cache.ping().await {
            return ProbeResult::error(ProbeError::Connectivity(e.to_string()), elapsed_ms(start));
        }
        let response_time_ms = elapsed_ms(start);
        debug!("Redis answered ping in {}ms", response_time_ms);

        match tokio::try_join!(self.cache.info("clients"), self.cache.info("memory")) {
            Ok((clients, memory)) => ProbeResult::ok(response_time_ms)
                .with_metadata(ServiceMetadata::Cache(parse_cache_info(&clients, &memory))),
            Err(e) => ProbeResult::error(ProbeError::Operation(e.to_string()), elapsed_ms(start)),
        }
    }
}
