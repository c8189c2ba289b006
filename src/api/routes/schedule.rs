//! Schedule listing and event history

use axum::{Json, extract::State};

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{EventsResponse, ScheduleResponse},
};

/// GET /api/v1/schedule
pub async fn list_schedule(State(state): State<ApiState>) -> ApiResult<Json<ScheduleResponse>> {
    let items = state.monitor.schedule().await?;
    let counts = state.monitor.status_counts().await?;

    Ok(Json(ScheduleResponse {
        count: items.len(),
        items,
        counts,
    }))
}

/// GET /api/v1/events
pub async fn list_events(State(state): State<ApiState>) -> ApiResult<Json<EventsResponse>> {
    let events = state.monitor.events().await?;

    Ok(Json(EventsResponse {
        count: events.len(),
        events,
    }))
}
