//! Monitor facade
//!
//! Wires the repository, notification sink and prober into a running
//! registry actor and check coordinator, and exposes the operations the
//! admin surface needs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::actors::{CheckCoordinator, CheckNowResponse, RegistryActor, RegistryHandle};
use crate::config::Config;
use crate::monitors::Prober;
use crate::notifications::{NotificationSink, Notifier};
use crate::scheduler::{IntervalSpec, JobEngine, ScheduleError};
use crate::storage::{Repository, StorageError, with_timeout};
use crate::util::display_timestamp;
use crate::{Event, HostService, Interval, Status, StatusCounts};

/// How long shutdown waits for queued notifications
const SHUTDOWN_FLUSH_LIMIT: Duration = Duration::from_secs(5);

/// Runtime settings for [`Monitor::spawn`]
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub monitoring_live: bool,
    pub channel: String,
    pub repository_timeout: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            monitoring_live: true,
            channel: "public-channel".to_string(),
            repository_timeout: Duration::from_secs(3),
        }
    }
}

impl From<&Config> for MonitorSettings {
    fn from(config: &Config) -> Self {
        Self {
            monitoring_live: config.monitoring_live,
            channel: config.notifications.channel.clone(),
            repository_timeout: config.repository_timeout(),
        }
    }
}

#[derive(Debug)]
pub enum MonitorError {
    /// No check with this id
    NotFound(i64),

    Storage(StorageError),

    Schedule(ScheduleError),

    /// The registry actor is no longer running
    Unavailable(String),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::NotFound(id) => write!(f, "host service {id} not found"),
            MonitorError::Storage(e) => write!(f, "{e}"),
            MonitorError::Schedule(e) => write!(f, "{e}"),
            MonitorError::Unavailable(msg) => write!(f, "scheduler unavailable: {msg}"),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Storage(e) => Some(e),
            MonitorError::Schedule(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for MonitorError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound {
                entity: "host service",
                id,
            } => MonitorError::NotFound(id),
            other => MonitorError::Storage(other),
        }
    }
}

impl From<anyhow::Error> for MonitorError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ScheduleError>() {
            Ok(e) => return MonitorError::Schedule(e),
            Err(err) => err,
        };
        match err.downcast::<StorageError>() {
            Ok(e) => MonitorError::from(e),
            Err(err) => MonitorError::Unavailable(err.to_string()),
        }
    }
}

/// One row of the schedule listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleItem {
    pub host_service_id: i64,
    pub host_id: i64,
    pub host: String,
    pub service: String,
    pub schedule: String,
    pub status: Status,
    pub next_run: String,
    pub last_run: String,
}

/// Running monitoring core
#[derive(Clone)]
pub struct Monitor {
    repository: Arc<dyn Repository>,
    registry: RegistryHandle,
    coordinator: Arc<CheckCoordinator>,
    notifier: Notifier,
    repository_timeout: Duration,
}

impl Monitor {
    /// Spawn the registry actor. Nothing is scheduled until [`Monitor::bootstrap`].
    pub fn spawn(
        settings: MonitorSettings,
        repository: Arc<dyn Repository>,
        sink: Arc<dyn NotificationSink>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        let notifier = Notifier::new(sink, settings.channel);
        let (registry, command_rx) = RegistryHandle::channel();

        let coordinator = Arc::new(CheckCoordinator::new(
            repository.clone(),
            prober,
            notifier.clone(),
            registry.clone(),
            settings.repository_timeout,
        ));

        RegistryHandle::spawn_actor(RegistryActor::new(
            command_rx,
            JobEngine::new(),
            repository.clone(),
            notifier.clone(),
            coordinator.clone(),
            settings.monitoring_live,
            settings.repository_timeout,
        ));

        debug!("monitor spawned");

        Self {
            repository,
            registry,
            coordinator,
            notifier,
            repository_timeout: settings.repository_timeout,
        }
    }

    /// Schedule every active check. Returns the number scheduled.
    pub async fn bootstrap(&self) -> Result<usize, MonitorError> {
        Ok(self.registry.bootstrap().await?)
    }

    pub async fn run_check_now(&self, check_id: i64) -> CheckNowResponse {
        self.coordinator.run_check_now(check_id).await
    }

    /// Mark a check active and schedule it
    ///
    /// Returns whether a job was registered; `false` while monitoring is off.
    #[instrument(skip(self))]
    pub async fn activate_check(&self, check_id: i64) -> Result<bool, MonitorError> {
        let mut check = self.load(check_id).await?;
        // A check that can never be scheduled stays inactive
        check
            .interval
            .to_spec()
            .parse::<IntervalSpec>()
            .map_err(MonitorError::Schedule)?;

        check.active = true;
        with_timeout(
            self.repository_timeout,
            "activate check",
            self.repository.set_check_active(check_id, true),
        )
        .await?;

        let scheduled = self.registry.activate(check).await?;
        info!("activated check {check_id}");
        Ok(scheduled)
    }

    /// Mark a check inactive and stop scheduling it
    ///
    /// Returns whether it had been scheduled.
    #[instrument(skip(self))]
    pub async fn deactivate_check(&self, check_id: i64) -> Result<bool, MonitorError> {
        self.load(check_id).await?;
        with_timeout(
            self.repository_timeout,
            "deactivate check",
            self.repository.set_check_active(check_id, false),
        )
        .await?;

        let existed = self.registry.deactivate(check_id).await?;
        info!("deactivated check {check_id}");
        Ok(existed)
    }

    /// Change a check's interval; an active check is rescheduled with it
    ///
    /// Returns whether a job was registered with the new interval.
    #[instrument(skip(self))]
    pub async fn set_check_interval(
        &self,
        check_id: i64,
        interval: Interval,
    ) -> Result<bool, MonitorError> {
        interval
            .to_spec()
            .parse::<IntervalSpec>()
            .map_err(MonitorError::Schedule)?;

        let mut check = self.load(check_id).await?;
        with_timeout(
            self.repository_timeout,
            "set check interval",
            self.repository.set_check_interval(check_id, interval),
        )
        .await?;
        check.interval = interval;
        info!("check {check_id} now runs {}", interval.schedule_text());

        if !check.active {
            return Ok(false);
        }
        Ok(self.registry.activate(check).await?)
    }

    pub async fn set_monitoring(&self, enabled: bool) -> Result<usize, MonitorError> {
        Ok(self.registry.set_monitoring(enabled).await?)
    }

    pub async fn is_monitoring(&self) -> Result<bool, MonitorError> {
        Ok(self.registry.is_monitoring().await?)
    }

    /// Scheduled checks sorted by host then service
    pub async fn schedule(&self) -> Result<Vec<ScheduleItem>, MonitorError> {
        let entries = self.registry.entries().await?;
        let mut items = Vec::with_capacity(entries.len());

        for entry in entries {
            let check = match self.load(entry.check_id).await {
                Ok(check) => check,
                Err(MonitorError::NotFound(id)) => {
                    warn!("scheduled check {id} no longer exists");
                    continue;
                }
                Err(e) => return Err(e),
            };

            items.push(ScheduleItem {
                host_service_id: check.id,
                host_id: check.host_id,
                host: check.host_name.clone(),
                service: check.service_name.clone(),
                schedule: check.interval.schedule_text(),
                status: check.status,
                next_run: display_timestamp(entry.next_run),
                last_run: display_timestamp(check.last_check),
            });
        }

        items.sort_by(|a, b| {
            a.host
                .cmp(&b.host)
                .then_with(|| a.service.cmp(&b.service))
                .then_with(|| a.host_service_id.cmp(&b.host_service_id))
        });
        Ok(items)
    }

    /// Event history, oldest first
    pub async fn events(&self) -> Result<Vec<Event>, MonitorError> {
        Ok(with_timeout(
            self.repository_timeout,
            "list events",
            self.repository.list_events(),
        )
        .await?)
    }

    pub async fn status_counts(&self) -> Result<StatusCounts, MonitorError> {
        Ok(with_timeout(
            self.repository_timeout,
            "aggregate status counts",
            self.repository.aggregate_status_counts(),
        )
        .await?)
    }

    /// Wait until every notification published so far has been delivered
    pub async fn flush_notifications(&self) {
        self.notifier.flush().await;
    }

    /// Remove every job, stop the registry actor and deliver pending notifications
    pub async fn shutdown(&self) {
        if let Err(e) = self.registry.shutdown().await {
            debug!("registry already stopped: {e}");
        }
        if tokio::time::timeout(SHUTDOWN_FLUSH_LIMIT, self.notifier.flush())
            .await
            .is_err()
        {
            warn!("pending notifications not delivered within {SHUTDOWN_FLUSH_LIMIT:?}");
        }
        info!("monitor shut down");
    }

    async fn load(&self, check_id: i64) -> Result<HostService, MonitorError> {
        Ok(with_timeout(
            self.repository_timeout,
            "load check",
            self.repository.load_check(check_id),
        )
        .await?)
    }
}
