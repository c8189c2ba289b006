//! Event names and payload builders
//!
//! Every value in a payload is a string. Timestamps use
//! [`crate::util::format_timestamp`]; unset timestamps render as `"Pending"`.

use chrono::{DateTime, Utc};

use super::Payload;
use crate::util::{PENDING, display_timestamp};
use crate::{HostService, Status, StatusCounts};

pub const STATUS_CHANGED: &str = "host-service-status-changed";
pub const COUNT_CHANGED: &str = "host-service-count-changed";
pub const SCHEDULE_CHANGED: &str = "schedule-changed-event";
pub const SCHEDULE_REMOVED: &str = "schedule-item-removed-event";
pub const APP_STARTING: &str = "app-starting";

fn payload<const N: usize>(entries: [(&str, String); N]) -> Payload {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// `host-service-status-changed`
///
/// `last_run` is `now` when the check had been run before, `"Pending"` otherwise.
pub fn status_changed(check: &HostService, new_status: Status, now: DateTime<Utc>) -> Payload {
    let last_run = match check.last_check {
        Some(_) => display_timestamp(Some(now)),
        None => PENDING.to_string(),
    };

    payload([
        ("host_id", check.host_id.to_string()),
        ("host_service_id", check.id.to_string()),
        ("host_name", check.host_name.clone()),
        ("service_name", check.service_name.clone()),
        ("icon", check.icon.clone()),
        ("status", new_status.to_string()),
        ("message", status_message(check, new_status)),
        ("last_run", last_run),
    ])
}

/// Human readable description of a status transition, also stored as the event message
pub fn status_message(check: &HostService, new_status: Status) -> String {
    format!(
        "host service {} on {} has changed to {}",
        check.service_name, check.host_name, new_status
    )
}

/// `host-service-count-changed`
pub fn counts_changed(counts: &StatusCounts) -> Payload {
    payload([
        ("healthy_count", counts.healthy.to_string()),
        ("pending_count", counts.pending.to_string()),
        ("problem_count", counts.problem.to_string()),
        ("warning_count", counts.warning.to_string()),
    ])
}

/// `schedule-changed-event`
pub fn schedule_changed(
    check: &HostService,
    status: Status,
    next_run: Option<DateTime<Utc>>,
    last_run: Option<DateTime<Utc>>,
) -> Payload {
    payload([
        ("host_service_id", check.id.to_string()),
        ("service_id", check.service_id().to_string()),
        ("host_id", check.host_id.to_string()),
        ("next_run", display_timestamp(next_run)),
        ("last_run", display_timestamp(last_run)),
        ("host", check.host_name.clone()),
        ("service", check.service_name.clone()),
        ("schedule", check.interval.schedule_text()),
        ("status", status.to_string()),
        ("icon", check.icon.clone()),
    ])
}

/// `schedule-changed-event` published when a check is (re)scheduled
pub fn scheduling(check: &HostService) -> Payload {
    let mut data = schedule_changed(check, check.status, None, check.last_check);
    data.insert("message".to_string(), "scheduling".to_string());
    data
}

/// `schedule-item-removed-event`
pub fn schedule_removed(check_id: i64) -> Payload {
    payload([("host_service_id", check_id.to_string())])
}

/// `app-starting`
pub fn app_starting() -> Payload {
    payload([("message", "Monitoring is starting...".to_string())])
}
