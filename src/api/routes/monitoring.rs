//! Global monitoring toggle

use axum::{Json, extract::State};

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{MonitoringRequest, MonitoringResponse},
};

/// PUT /api/v1/monitoring
pub async fn set_monitoring(
    State(state): State<ApiState>,
    Json(request): Json<MonitoringRequest>,
) -> ApiResult<Json<MonitoringResponse>> {
    let affected = state.monitor.set_monitoring(request.enabled).await?;

    Ok(Json(MonitoringResponse {
        enabled: request.enabled,
        affected,
    }))
}
