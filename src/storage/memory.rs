//! In-memory repository (no persistence)
//!
//! Useful for:
//! - Testing without database dependencies
//! - Running from a config file that lists hosts directly
//!
//! All data is lost on restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::Repository;
use super::error::{StorageError, StorageResult};
use crate::config::HostConfig;
use crate::{Event, Host, HostService, Interval, Status, StatusCounts};

#[derive(Default)]
struct Tables {
    hosts: HashMap<i64, Host>,
    checks: BTreeMap<i64, HostService>,
    events: Vec<Event>,
    next_host_id: i64,
    next_check_id: i64,
}

/// Repository kept entirely in memory behind a `RwLock`
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository holding the hosts and checks from the config file
    pub async fn from_config(hosts: &[HostConfig]) -> StorageResult<Self> {
        let repository = Self::new();

        for host_config in hosts {
            let mut host = Host::new(&host_config.name, &host_config.url);
            if let Some(canonical) = &host_config.canonical_name {
                host.canonical_name = canonical.clone();
            }
            host.active = host_config.active;
            let host = repository.insert_host(host).await;

            for service in &host_config.services {
                let mut check = HostService::new(&host, service.service_type, service.interval);
                check.active = service.active;
                repository.insert_check(check).await?;
            }
        }

        debug!("seeded in-memory repository with {} hosts", hosts.len());
        Ok(repository)
    }

    /// Insert a host, assigning its id
    pub async fn insert_host(&self, mut host: Host) -> Host {
        let mut tables = self.tables.write().await;
        tables.next_host_id += 1;
        host.id = tables.next_host_id;
        tables.hosts.insert(host.id, host.clone());
        host
    }

    /// Insert a check for an existing host, assigning its id
    pub async fn insert_check(&self, mut check: HostService) -> StorageResult<HostService> {
        let mut tables = self.tables.write().await;
        let host = tables.hosts.get(&check.host_id).ok_or(StorageError::NotFound {
            entity: "host",
            id: check.host_id,
        })?;
        check.host_name = host.host_name.clone();

        tables.next_check_id += 1;
        check.id = tables.next_check_id;
        tables.checks.insert(check.id, check.clone());
        Ok(check)
    }

    pub async fn set_host_active(&self, id: i64, active: bool) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let host = tables
            .hosts
            .get_mut(&id)
            .ok_or(StorageError::NotFound { entity: "host", id })?;
        host.active = active;
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn load_check(&self, id: i64) -> StorageResult<HostService> {
        self.tables
            .read()
            .await
            .checks
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound {
                entity: "host service",
                id,
            })
    }

    async fn load_host(&self, id: i64) -> StorageResult<Host> {
        self.tables
            .read()
            .await
            .hosts
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound { entity: "host", id })
    }

    async fn set_check_interval(&self, id: i64, interval: Interval) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables.checks.get_mut(&id).ok_or(StorageError::NotFound {
            entity: "host service",
            id,
        })?;
        stored.interval = interval;
        Ok(())
    }

    async fn record_result(
        &self,
        id: i64,
        status: Status,
        last_check: DateTime<Utc>,
        message: &str,
    ) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables.checks.get_mut(&id).ok_or(StorageError::NotFound {
            entity: "host service",
            id,
        })?;

        stored.status = status;
        stored.last_check = Some(last_check);
        stored.last_message = message.to_string();
        Ok(())
    }

    async fn set_check_active(&self, id: i64, active: bool) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables.checks.get_mut(&id).ok_or(StorageError::NotFound {
            entity: "host service",
            id,
        })?;
        stored.active = active;
        Ok(())
    }

    async fn append_event(&self, event: &Event) -> StorageResult<i64> {
        let mut tables = self.tables.write().await;
        let id = tables.events.len() as i64 + 1;
        let mut event = event.clone();
        event.id = Some(id);
        event.created_at = Utc::now();
        tables.events.push(event);
        Ok(id)
    }

    async fn list_events(&self) -> StorageResult<Vec<Event>> {
        Ok(self.tables.read().await.events.clone())
    }

    async fn list_active_checks(&self) -> StorageResult<Vec<HostService>> {
        let tables = self.tables.read().await;
        Ok(tables
            .checks
            .values()
            .filter(|check| check.active)
            .filter(|check| {
                tables
                    .hosts
                    .get(&check.host_id)
                    .is_some_and(|host| host.active)
            })
            .cloned()
            .collect())
    }

    async fn aggregate_status_counts(&self) -> StorageResult<StatusCounts> {
        let tables = self.tables.read().await;
        let mut counts = StatusCounts::default();

        for check in tables.checks.values().filter(|check| check.active) {
            match check.status {
                Status::Pending => counts.pending += 1,
                Status::Healthy => counts.healthy += 1,
                Status::Warning => counts.warning += 1,
                Status::Problem => counts.problem += 1,
            }
        }

        Ok(counts)
    }
}
