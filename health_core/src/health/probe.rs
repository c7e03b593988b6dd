//! Probe contract and the result shape every probe produces

use crate::error::ProbeError;
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Ok,
    Error,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Ok => write!(f, "ok"),
            ProbeStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecordCounts {
    pub accounts: u64,
    pub sessions: u64,
    pub messages: u64,
    pub machines: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseMetadata {
    pub record_counts: RecordCounts,
}

/// Fields scraped from `INFO`; each one is omitted when the server did not
/// report it.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_clients: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_memory: Option<String>,
}

/// Dependency-specific extras, flattened next to the common fields.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ServiceMetadata {
    Database(DatabaseMetadata),
    Cache(CacheMetadata),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub status: ProbeStatus,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub metadata: Option<ServiceMetadata>,
}

impl ProbeResult {
    pub fn ok(response_time_ms: u64) -> Self {
        Self {
            status: ProbeStatus::Ok,
            response_time_ms,
            error: None,
            metadata: None,
        }
    }

    pub fn error(error: ProbeError, response_time_ms: u64) -> Self {
        Self {
            status: ProbeStatus::Error,
            response_time_ms,
            error: Some(error.to_string()),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: ServiceMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ProbeStatus::Ok
    }
}

/// A liveness check against one external dependency.
///
/// Implementations must not fail: every error, including a failed follow-up
/// read, is folded into a [`ProbeResult`] with [`ProbeStatus::Error`], and
/// `response_time_ms` is recorded on both paths.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self) -> ProbeResult;
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
