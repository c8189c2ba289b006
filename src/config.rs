use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

use crate::{Interval, ServiceType};

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory repository (seeded from `hosts`, nothing persisted)
    #[serde(rename = "none")]
    None,

    /// SQLite database
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::None
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./service-watch.db")
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Global monitoring switch; checks are only scheduled while it is on
    #[serde(default = "default_monitoring_live")]
    pub monitoring_live: bool,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub probes: ProbeConfig,

    /// Upper bound for a single repository call, in seconds
    #[serde(default = "default_repository_timeout")]
    pub repository_timeout: u64,

    pub api: Option<ApiSection>,

    /// Seed data for the in-memory repository
    pub hosts: Option<Vec<HostConfig>>,
}

impl Config {
    pub fn repository_timeout(&self) -> Duration {
        Duration::from_secs(self.repository_timeout)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_channel")]
    pub channel: String,
    pub webhook: Option<Webhook>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            webhook: None,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
    #[serde(default = "default_webhook_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,
    #[serde(default = "default_certificate_timeout")]
    pub certificate_timeout: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            http_timeout: default_http_timeout(),
            certificate_timeout: default_certificate_timeout(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct HostConfig {
    pub name: String,
    pub canonical_name: Option<String>,
    pub url: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ServiceConfig {
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub interval: Interval,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_monitoring_live() -> bool {
    true
}

fn default_channel() -> String {
    String::from("public-channel")
}

fn default_webhook_timeout() -> u64 {
    5
}

fn default_http_timeout() -> u64 {
    5
}

fn default_certificate_timeout() -> u64 {
    10
}

fn default_repository_timeout() -> u64 {
    3
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_enable_cors() -> bool {
    true
}

fn default_active() -> bool {
    true
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    parse_config(&file_content)
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    let config: Config = serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?;

    for host in config.hosts.iter().flatten() {
        for service in &host.services {
            if service.interval.number == 0 {
                anyhow::bail!(
                    "host '{}' has a {} check with a zero interval",
                    host.name,
                    service.service_type.display_name()
                );
            }
        }
    }

    trace!("loaded config: {config:?}");
    Ok(config)
}
