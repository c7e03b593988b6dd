//! Route table for the health dashboard

use crate::{
    handlers::health::{handle_dashboard, handle_service},
    AppState,
};
use axum::{routing::get, Router};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/health/dashboard", get(handle_dashboard))
        .route("/v1/health/dashboard/:service", get(handle_service))
}
