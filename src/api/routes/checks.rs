//! Per-check admin actions

use axum::{
    Json,
    extract::{Path, State},
};

use crate::Interval;
use crate::actors::CheckNowResponse;
use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{ActivationResponse, IntervalResponse},
};

/// POST /api/v1/checks/:id/check-now
///
/// Always 200; failures are reported in the body with `ok = false`
pub async fn check_now(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Json<CheckNowResponse> {
    Json(state.monitor.run_check_now(id).await)
}

/// POST /api/v1/checks/:id/activate
pub async fn activate(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ActivationResponse>> {
    let scheduled = state.monitor.activate_check(id).await?;

    Ok(Json(ActivationResponse {
        host_service_id: id,
        active: true,
        scheduled,
    }))
}

/// PUT /api/v1/checks/:id/interval
///
/// Body: `{"number": 10, "unit": "m"}`
pub async fn set_interval(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(interval): Json<Interval>,
) -> ApiResult<Json<IntervalResponse>> {
    let scheduled = state.monitor.set_check_interval(id, interval).await?;

    Ok(Json(IntervalResponse {
        host_service_id: id,
        schedule: interval.schedule_text(),
        scheduled,
    }))
}

/// POST /api/v1/checks/:id/deactivate
pub async fn deactivate(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ActivationResponse>> {
    state.monitor.deactivate_check(id).await?;

    Ok(Json(ActivationResponse {
        host_service_id: id,
        active: false,
        scheduled: false,
    }))
}
