//! Health dashboard handlers

use crate::{
    error::{AppError, Result},
    health::{HealthAggregator, HealthReport, HealthStatus, ProbeStatus},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{info, warn};
use validator::Validate;

pub async fn handle_dashboard(State(state): State<AppState>) -> Result<impl IntoResponse> {
    info!("GET /v1/health/dashboard - Running dependency probes");

    let report = state.aggregator.aggregate().await;
    ensure_conforms(&report, &state.aggregator)?;

    let status_code = status_code_for(report.overall_status);
    if status_code != StatusCode::OK {
        warn!("Reporting {} with {}", report.overall_status, status_code);
    }

    Ok((status_code, Json(report)))
}

pub async fn handle_service(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<impl IntoResponse> {
    info!("GET /v1/health/dashboard/{} - Probing single dependency", service);

    let result = state
        .aggregator
        .check_dependency(&service)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Service '{}' not found", service)))?;

    let status_code = match result.status {
        ProbeStatus::Ok => StatusCode::OK,
        ProbeStatus::Error => StatusCode::SERVICE_UNAVAILABLE,
    };

    Ok((status_code, Json(result)))
}

/// Degraded is informational only; just an unhealthy system fails the call.
pub fn status_code_for(status: HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn ensure_conforms(report: &HealthReport, aggregator: &HealthAggregator) -> Result<()> {
    report
        .validate()
        .map_err(|e| AppError::Schema(e.to_string()))?;

    let mut expected = 0;
    for name in aggregator.dependency_names() {
        expected += 1;
        if !report.services.contains_key(name) {
            return Err(AppError::Schema(format!("Service '{}' missing from report", name)));
        }
    }

    if report.services.len() != expected {
        return Err(AppError::Schema(format!(
            "Report lists {} services, expected {}",
            report.services.len(),
            expected
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(status_code_for(HealthStatus::Healthy), StatusCode::OK);
        assert_eq!(status_code_for(HealthStatus::Degraded), StatusCode::OK);
        assert_eq!(status_code_for(HealthStatus::Unhealthy), StatusCode::SERVICE_UNAVAILABLE);
    }
}
