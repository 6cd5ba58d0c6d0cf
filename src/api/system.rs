use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::auth::Authenticated;
use super::{ApiError, AppState};
use crate::services::Operation;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.store().ping().await {
        Ok(()) => Json(HealthResponse { status: "OK" }).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed to reach storage");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse { status: "UNAVAILABLE" }),
            )
                .into_response()
        }
    }
}

/// GET /metrics
pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
) -> Result<String, ApiError> {
    state
        .shared
        .gate
        .authorize(&auth.account, Operation::ViewMetrics)?;

    Ok(state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    ))
}
