use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};

/// Rendered in place of any timestamp that has never been set
pub const PENDING: &str = "Pending";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %-I:%M:%S %p";

/// Format a timestamp as `YYYY-MM-DD h:mm:ss AM/PM`
pub fn format_timestamp<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Local-time rendering of an optional timestamp, `"Pending"` when unset
pub fn display_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => format_timestamp(&ts.with_timezone(&Local)),
        None => PENDING.to_string(),
    }
}

const CONFIG_FILE: &str = "SERVICE_WATCH_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "./service-watch.json";

pub fn get_config_file() -> String {
    std::env::var(CONFIG_FILE).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
}

const LOG_LEVEL: &str = "SERVICE_WATCH_LOG";

pub fn get_log_level() -> tracing::level_filters::LevelFilter {
    std::env::var(LOG_LEVEL)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(tracing::level_filters::LevelFilter::DEBUG)
}
