//! Health check endpoint

use axum::{Json, extract::State};
use tracing::warn;

use crate::api::{state::ApiState, types::HealthResponse};

/// GET /api/v1/health
///
/// Also reports whether global monitoring is on; `false` if the scheduler is gone
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let monitoring = state.monitor.is_monitoring().await.unwrap_or_else(|e| {
        warn!("health check could not reach the scheduler: {e}");
        false
    });

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        monitoring,
    })
}
