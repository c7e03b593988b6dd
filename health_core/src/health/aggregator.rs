//! Fan-out of registered probes and reduction into a single report

use crate::error::{AppError, ProbeError, Result};
use crate::health::context::ProcessContext;
use crate::health::probe::{elapsed_ms, Probe, ProbeResult, ProbeStatus};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criticality {
    /// Failure makes the whole system unhealthy.
    Critical,
    /// Failure only degrades the system.
    NonCritical,
}

#[derive(Clone)]
pub struct DependencyDescriptor {
    name: String,
    criticality: Criticality,
    probe: Arc<dyn Probe>,
}

impl DependencyDescriptor {
    pub fn new(name: impl Into<String>, criticality: Criticality, probe: Arc<dyn Probe>) -> Self {
        Self {
            name: name.into(),
            criticality,
            probe,
        }
    }

    pub fn critical(name: impl Into<String>, probe: Arc<dyn Probe>) -> Self {
        Self::new(name, Criticality::Critical, probe)
    }

    pub fn non_critical(name: impl Into<String>, probe: Arc<dyn Probe>) -> Self {
        Self::new(name, Criticality::NonCritical, probe)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn criticality(&self) -> Criticality {
        self.criticality
    }
}

impl std::fmt::Debug for DependencyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyDescriptor")
            .field("name", &self.name)
            .field("criticality", &self.criticality)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    #[serde(rename = "status")]
    pub overall_status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    #[validate(length(min = 1, message = "Version must not be empty"))]
    pub version: String,
    pub uptime_seconds: u64,
    #[validate(custom(function = "validate_services"))]
    pub services: BTreeMap<String, ProbeResult>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.overall_status == HealthStatus::Healthy
    }
}

fn validate_services(services: &BTreeMap<String, ProbeResult>) -> std::result::Result<(), ValidationError> {
    if services.is_empty() {
        return Err(schema_violation("no_services", "Report contains no services".to_string()));
    }

    for (name, result) in services {
        match (result.status, &result.error) {
            (ProbeStatus::Ok, Some(_)) => {
                return Err(schema_violation(
                    "unexpected_error",
                    format!("Service '{}' is ok but carries an error", name),
                ));
            }
            (ProbeStatus::Error, None) => {
                return Err(schema_violation(
                    "missing_error",
                    format!("Service '{}' failed without an error message", name),
                ));
            }
            (ProbeStatus::Error, Some(_)) if result.metadata.is_some() => {
                return Err(schema_violation(
                    "unexpected_metadata",
                    format!("Service '{}' failed but carries metadata", name),
                ));
            }
            _ => {}
        }
    }

    Ok(())
}

fn schema_violation(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(message));
    err
}

/// Critical failures dominate non-critical failures, which dominate all-ok.
pub fn classify<'a, I>(results: I) -> HealthStatus
where
    I: IntoIterator<Item = (Criticality, &'a ProbeResult)>,
{
    let mut degraded = false;

    for (criticality, result) in results {
        if result.is_ok() {
            continue;
        }
        match criticality {
            Criticality::Critical => return HealthStatus::Unhealthy,
            Criticality::NonCritical => degraded = true,
        }
    }

    if degraded {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

pub struct HealthAggregator {
    dependencies: Vec<DependencyDescriptor>,
    context: ProcessContext,
    probe_timeout: Duration,
}

impl HealthAggregator {
    pub fn new(context: ProcessContext) -> Self {
        Self {
            dependencies: Vec::new(),
            context,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn register(mut self, dependency: DependencyDescriptor) -> Result<Self> {
        if self.dependencies.iter().any(|d| d.name == dependency.name) {
            return Err(AppError::Config(format!(
                "Dependency '{}' is already registered",
                dependency.name
            )));
        }
        self.dependencies.push(dependency);
        Ok(self)
    }

    pub fn context(&self) -> &ProcessContext {
        &self.context
    }

    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|d| d.name.as_str())
    }

    /// Runs every probe concurrently and waits for all of them. A slow probe
    /// is cut off at the probe timeout; siblings are never cancelled.
    pub async fn aggregate(&self) -> HealthReport {
        info!("Running health probes for {} dependencies", self.dependencies.len());

        let results = join_all(
            self.dependencies
                .iter()
                .map(|d| run_probe(Arc::clone(&d.probe), self.probe_timeout)),
        )
        .await;

        for (dependency, result) in self.dependencies.iter().zip(&results) {
            log_outcome(dependency, result);
        }

        let overall_status = classify(
            self.dependencies
                .iter()
                .map(|d| d.criticality)
                .zip(results.iter()),
        );

        let services = self
            .dependencies
            .iter()
            .map(|d| d.name.clone())
            .zip(results)
            .collect();

        info!("Health aggregation completed - Overall status: {}", overall_status);

        HealthReport {
            overall_status,
            timestamp: Utc::now(),
            version: self.context.version().to_string(),
            uptime_seconds: self.context.uptime_seconds(),
            services,
        }
    }

    /// Probes a single dependency under the same timeout and panic handling
    /// as [`aggregate`](Self::aggregate).
    pub async fn check_dependency(&self, name: &str) -> Option<ProbeResult> {
        let dependency = self.dependencies.iter().find(|d| d.name == name)?;
        let result = run_probe(Arc::clone(&dependency.probe), self.probe_timeout).await;
        log_outcome(dependency, &result);
        Some(result)
    }
}

async fn run_probe(probe: Arc<dyn Probe>, probe_timeout: Duration) -> ProbeResult {
    let start = Instant::now();

    let task = tokio::spawn(async move {
        match tokio::time::timeout(probe_timeout, probe.probe()).await {
            Ok(result) => result,
            Err(_) => ProbeResult::error(
                ProbeError::Timeout(u64::try_from(probe_timeout.as_millis()).unwrap_or(u64::MAX)),
                elapsed_ms(start),
            ),
        }
    });

    match task.await {
        Ok(result) => result,
        Err(e) => ProbeResult::error(ProbeError::Panicked(e.to_string()), elapsed_ms(start)),
    }
}

fn log_outcome(dependency: &DependencyDescriptor, result: &ProbeResult) {
    let error = result.error.as_deref().unwrap_or_default();
    match (result.status, dependency.criticality) {
        (ProbeStatus::Ok, _) => {
            info!(
                dependency = %dependency.name,
                response_time_ms = result.response_time_ms,
                "Probe passed"
            );
        }
        (ProbeStatus::Error, Criticality::NonCritical) => {
            warn!(
                dependency = %dependency.name,
                response_time_ms = result.response_time_ms,
                error = %error,
                "Non-critical probe failed"
            );
        }
        (ProbeStatus::Error, Criticality::Critical) => {
            error!(
                dependency = %dependency.name,
                response_time_ms = result.response_time_ms,
                error = %error,
                "Critical probe failed"
            );
        }
    }
}
