use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeFile;

use crate::domain::metrics::SmartctlMetrics;

/// Grafana dashboard, served at `/dashboard.json`.
pub const DASHBOARD_FILE: &str = "dashboard.json";
/// Prometheus scrape config, served at `/prometheus.yml`.
pub const PROMETHEUS_CONFIG_FILE: &str = "prometheus.yml";

/// Shared application state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<SmartctlMetrics>,
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route_service(
            "/dashboard.json",
            ServeFile::new(static_dir.join(DASHBOARD_FILE)),
        )
        .route_service(
            "/prometheus.yml",
            ServeFile::new(static_dir.join(PROMETHEUS_CONFIG_FILE)),
        )
        .with_state(state)
}

/// Current gauge values in the Prometheus text format. Never triggers collection.
async fn metrics(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
