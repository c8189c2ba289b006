pub mod actors;
pub mod api;
pub mod config;
pub mod monitor;
pub mod monitors;
pub mod notifications;
pub mod scheduler;
pub mod storage;
pub mod util;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health of a single check, as last observed by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Healthy,
    Warning,
    Problem,
}

impl Status {
    /// Lowercase form used by the storage backends
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Healthy => "healthy",
            Status::Warning => "warning",
            Status::Problem => "problem",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Pending => "Pending",
            Status::Healthy => "Healthy",
            Status::Warning => "Warning",
            Status::Problem => "Problem",
        };
        f.write_str(name)
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "healthy" => Ok(Status::Healthy),
            "warning" => Ok(Status::Warning),
            "problem" => Ok(Status::Problem),
            other => Err(anyhow::anyhow!("unknown status '{other}'")),
        }
    }
}

/// Kind of check performed against a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Http,
    Https,
    TlsCertificate,
}

impl ServiceType {
    /// Numeric service id as stored in the `services` table
    pub fn service_id(&self) -> i64 {
        match self {
            ServiceType::Http => 1,
            ServiceType::Https => 2,
            ServiceType::TlsCertificate => 3,
        }
    }

    pub fn from_service_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(ServiceType::Http),
            2 => Some(ServiceType::Https),
            3 => Some(ServiceType::TlsCertificate),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceType::Http => "HTTP",
            ServiceType::Https => "HTTPS",
            ServiceType::TlsCertificate => "SSL Certificate",
        }
    }

    pub fn default_icon(&self) -> &'static str {
        match self {
            ServiceType::Http => "fas fa-server",
            ServiceType::Https => "fas fa-server",
            ServiceType::TlsCertificate => "fas fa-lock",
        }
    }
}

/// Unit of a check interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleUnit {
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
    #[serde(rename = "d")]
    Days,
}

impl ScheduleUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleUnit::Minutes => "m",
            ScheduleUnit::Hours => "h",
            ScheduleUnit::Days => "d",
        }
    }
}

impl FromStr for ScheduleUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(ScheduleUnit::Minutes),
            "h" => Ok(ScheduleUnit::Hours),
            "d" => Ok(ScheduleUnit::Days),
            other => Err(anyhow::anyhow!("unknown schedule unit '{other}'")),
        }
    }
}

/// How often a check runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub number: u32,
    pub unit: ScheduleUnit,
}

impl Interval {
    pub fn new(number: u32, unit: ScheduleUnit) -> Self {
        Self { number, unit }
    }

    /// Interval as configured, e.g. `@every 3d`
    pub fn schedule_text(&self) -> String {
        format!("@every {}{}", self.number, self.unit.as_str())
    }

    /// Interval in the scheduler's grammar. The scheduler has no day unit,
    /// so days become hours.
    pub fn to_spec(&self) -> String {
        match self.unit {
            ScheduleUnit::Days => format!("@every {}h", u64::from(self.number) * 24),
            unit => format!("@every {}{}", self.number, unit.as_str()),
        }
    }
}

/// A monitored endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: i64,
    pub host_name: String,
    pub canonical_name: String,
    /// Address handed to the probes
    pub url: String,
    pub active: bool,
}

impl Host {
    /// A new active host. The id is assigned on insert.
    pub fn new(host_name: impl Into<String>, url: impl Into<String>) -> Self {
        let host_name = host_name.into();
        Self {
            id: 0,
            canonical_name: host_name.clone(),
            host_name,
            url: url.into(),
            active: true,
        }
    }
}

/// One recurring check of one service type on one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostService {
    pub id: i64,
    pub host_id: i64,
    pub host_name: String,
    pub service_type: ServiceType,
    pub service_name: String,
    pub icon: String,
    pub active: bool,
    pub interval: Interval,
    pub status: Status,
    /// `None` until the first check completes
    pub last_check: Option<DateTime<Utc>>,
    pub last_message: String,
}

impl HostService {
    /// A new, active, never-checked check on `host`. The id is assigned on insert.
    pub fn new(host: &Host, service_type: ServiceType, interval: Interval) -> Self {
        Self {
            id: 0,
            host_id: host.id,
            host_name: host.host_name.clone(),
            service_type,
            service_name: service_type.display_name().to_string(),
            icon: service_type.default_icon().to_string(),
            active: true,
            interval,
            status: Status::Pending,
            last_check: None,
            last_message: String::new(),
        }
    }

    pub fn service_id(&self) -> i64 {
        self.service_type.service_id()
    }
}

/// Append-only record of a status transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Option<i64>,
    pub host_service_id: i64,
    /// The status the check transitioned to
    pub event_type: Status,
    pub host_id: i64,
    pub service_name: String,
    pub host_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Number of active checks per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub healthy: i64,
    pub warning: i64,
    pub problem: i64,
}
