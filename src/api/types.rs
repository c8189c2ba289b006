//! API request and response types

use serde::{Deserialize, Serialize};

use crate::monitor::ScheduleItem;
use crate::{Event, StatusCounts};

/// Response for GET /api/v1/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub monitoring: bool,
}

/// Response for GET /api/v1/schedule
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleResponse {
    pub items: Vec<ScheduleItem>,
    pub count: usize,
    pub counts: StatusCounts,
}

/// Response for GET /api/v1/events
#[derive(Debug, Clone, Serialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub count: usize,
}

/// Response for POST /api/v1/checks/:id/activate and /deactivate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivationResponse {
    pub host_service_id: i64,
    pub active: bool,
    /// Whether the check has a live schedule entry after the call
    pub scheduled: bool,
}

/// Response for PUT /api/v1/checks/:id/interval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntervalResponse {
    pub host_service_id: i64,
    pub schedule: String,
    pub scheduled: bool,
}

/// Body of PUT /api/v1/monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringRequest {
    pub enabled: bool,
}

/// Response for PUT /api/v1/monitoring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitoringResponse {
    pub enabled: bool,
    /// Checks scheduled (when enabling) or unscheduled (when disabling)
    pub affected: usize,
}
