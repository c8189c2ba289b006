//! RegistryActor - single owner of the check → job mapping
//!
//! The actor is the only code that adds or removes jobs in the [`JobEngine`].
//! Admin requests, startup and the monitoring toggle all reach it through a
//! [`RegistryHandle`], so activation and deactivation never race each other.
//!
//! ## Message Flow
//!
//! ```text
//! Monitor / API ──RegistryCommand──▶ RegistryActor ──add/remove──▶ JobEngine
//!                                          │                          │ fires
//!                                          ▼                          ▼
//!                                   Notifier (schedule events)   CheckJob → CheckCoordinator
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

use super::coordinator::CheckCoordinator;
use super::messages::{RegistryCommand, ScheduleEntry};
use crate::HostService;
use crate::notifications::{Notifier, events};
use crate::scheduler::{IntervalSpec, Job, JobEngine, JobId, ScheduleError};
use crate::storage::{Repository, StorageResult, with_timeout};

/// The job registered for every scheduled check
pub struct CheckJob {
    check_id: i64,
    coordinator: Arc<CheckCoordinator>,
}

impl CheckJob {
    pub fn new(check_id: i64, coordinator: Arc<CheckCoordinator>) -> Self {
        Self {
            check_id,
            coordinator,
        }
    }
}

#[async_trait]
impl Job for CheckJob {
    async fn run(&self) {
        self.coordinator.run_check(self.check_id).await;
    }
}

pub struct RegistryActor {
    command_rx: mpsc::Receiver<RegistryCommand>,

    engine: JobEngine,

    repository: Arc<dyn Repository>,

    notifier: Notifier,

    coordinator: Arc<CheckCoordinator>,

    /// check id → job id
    entries: HashMap<i64, JobId>,

    monitoring_live: bool,

    repository_timeout: Duration,
}

impl RegistryActor {
    pub fn new(
        command_rx: mpsc::Receiver<RegistryCommand>,
        engine: JobEngine,
        repository: Arc<dyn Repository>,
        notifier: Notifier,
        coordinator: Arc<CheckCoordinator>,
        monitoring_live: bool,
        repository_timeout: Duration,
    ) -> Self {
        Self {
            command_rx,
            engine,
            repository,
            notifier,
            coordinator,
            entries: HashMap::new(),
            monitoring_live,
            repository_timeout,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting schedule registry actor");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                RegistryCommand::Activate { check, respond_to } => {
                    let result = self.activate(&check).await;
                    let _ = respond_to.send(result);
                }

                RegistryCommand::Deactivate {
                    check_id,
                    respond_to,
                } => {
                    let existed = self.deactivate(check_id).await;
                    let _ = respond_to.send(existed);
                }

                RegistryCommand::Bootstrap { respond_to } => {
                    let result = self.bootstrap().await;
                    let _ = respond_to.send(result);
                }

                RegistryCommand::SetMonitoring {
                    enabled,
                    respond_to,
                } => {
                    let result = self.set_monitoring(enabled).await;
                    let _ = respond_to.send(result);
                }

                RegistryCommand::IsMonitoring { respond_to } => {
                    let _ = respond_to.send(self.monitoring_live);
                }

                RegistryCommand::NextRun {
                    check_id,
                    respond_to,
                } => {
                    let next = match self.entries.get(&check_id) {
                        Some(job_id) => self.engine.next_fire(*job_id).await,
                        None => None,
                    };
                    let _ = respond_to.send(next);
                }

                RegistryCommand::Entries { respond_to } => {
                    let _ = respond_to.send(self.snapshot().await);
                }

                RegistryCommand::Shutdown { respond_to } => {
                    debug!("received shutdown command");
                    self.entries.clear();
                    self.engine.shutdown().await;
                    let _ = respond_to.send(());
                    break;
                }
            }
        }

        debug!("schedule registry actor stopped");
    }

    #[instrument(skip(self, check), fields(check = check.id))]
    async fn activate(&mut self, check: &HostService) -> Result<bool, ScheduleError> {
        if !self.monitoring_live {
            debug!("monitoring is disabled, not scheduling");
            return Ok(false);
        }

        // Parse before touching the existing job so a bad interval leaves it in place
        let spec: IntervalSpec = check.interval.to_spec().parse()?;

        if let Some(previous) = self.entries.remove(&check.id) {
            debug!("replacing job {previous}");
            self.engine.remove(previous).await;
        }

        let job = Arc::new(CheckJob::new(check.id, self.coordinator.clone()));
        let job_id = self.engine.add(spec, job).await;
        self.entries.insert(check.id, job_id);

        info!(
            "scheduled {} on {} {}",
            check.service_name,
            check.host_name,
            check.interval.schedule_text()
        );

        self.notifier.publish(events::SCHEDULE_CHANGED, events::scheduling(check));

        Ok(true)
    }

    #[instrument(skip(self))]
    async fn deactivate(&mut self, check_id: i64) -> bool {
        let existed = match self.entries.remove(&check_id) {
            Some(job_id) => {
                self.engine.remove(job_id).await;
                true
            }
            None => false,
        };

        if existed {
            info!("unscheduled check {check_id}");
        } else {
            debug!("check {check_id} was not scheduled");
        }

        self.notifier.publish(events::SCHEDULE_REMOVED, events::schedule_removed(check_id));

        existed
    }

    #[instrument(skip(self))]
    async fn bootstrap(&mut self) -> StorageResult<usize> {
        if !self.monitoring_live {
            info!("monitoring is disabled, nothing to schedule");
            return Ok(0);
        }

        self.notifier.publish(events::APP_STARTING, events::app_starting());

        let checks = with_timeout(
            self.repository_timeout,
            "list active checks",
            self.repository.list_active_checks(),
        )
        .await?;

        let mut scheduled = 0;
        for check in &checks {
            match self.activate(check).await {
                Ok(true) => scheduled += 1,
                Ok(false) => {}
                Err(e) => error!("could not schedule check {}: {e}", check.id),
            }
        }

        info!("scheduled {scheduled} of {} active checks", checks.len());
        Ok(scheduled)
    }

    async fn set_monitoring(&mut self, enabled: bool) -> StorageResult<usize> {
        if enabled {
            info!("monitoring enabled");
            self.monitoring_live = true;
            return self.bootstrap().await;
        }

        info!("monitoring disabled");
        self.monitoring_live = false;

        let mut check_ids: Vec<i64> = self.entries.keys().copied().collect();
        check_ids.sort_unstable();
        for check_id in &check_ids {
            self.deactivate(*check_id).await;
        }

        Ok(check_ids.len())
    }

    async fn snapshot(&self) -> Vec<ScheduleEntry> {
        let mut snapshot = Vec::with_capacity(self.entries.len());

        for (check_id, job_id) in &self.entries {
            let Some(job) = self.engine.entry(*job_id).await else {
                warn!("job {job_id} for check {check_id} is gone from the engine");
                continue;
            };

            snapshot.push(ScheduleEntry {
                check_id: *check_id,
                job_id: *job_id,
                spec: job.spec.to_string(),
                state: job.state,
                next_run: job.next,
                last_run: job.prev,
            });
        }

        snapshot.sort_by_key(|entry| entry.check_id);
        snapshot
    }
}

/// Cloneable client of the [`RegistryActor`]
#[derive(Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Create the command channel
    ///
    /// The receiver goes to [`RegistryActor::new`]. Splitting the two lets the
    /// coordinator hold a handle before the actor that owns it exists.
    pub fn channel() -> (Self, mpsc::Receiver<RegistryCommand>) {
        let (sender, receiver) = mpsc::channel(32);
        (Self { sender }, receiver)
    }

    /// Spawn the actor onto the runtime
    pub fn spawn_actor(actor: RegistryActor) {
        tokio::spawn(actor.run());
    }

    pub async fn activate(&self, check: HostService) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::Activate {
                check,
                respond_to: tx,
            })
            .await?;

        Ok(rx.await??)
    }

    pub async fn deactivate(&self, check_id: i64) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::Deactivate {
                check_id,
                respond_to: tx,
            })
            .await?;

        Ok(rx.await?)
    }

    pub async fn bootstrap(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::Bootstrap { respond_to: tx })
            .await?;

        Ok(rx.await??)
    }

    pub async fn set_monitoring(&self, enabled: bool) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::SetMonitoring {
                enabled,
                respond_to: tx,
            })
            .await?;

        Ok(rx.await??)
    }

    pub async fn is_monitoring(&self) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::IsMonitoring { respond_to: tx })
            .await?;

        Ok(rx.await?)
    }

    pub async fn next_run(&self, check_id: i64) -> Result<Option<DateTime<Utc>>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::NextRun {
                check_id,
                respond_to: tx,
            })
            .await?;

        Ok(rx.await?)
    }

    pub async fn entries(&self) -> Result<Vec<ScheduleEntry>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::Entries { respond_to: tx })
            .await?;

        Ok(rx.await?)
    }

    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryCommand::Shutdown { respond_to: tx })
            .await?;

        Ok(rx.await?)
    }
}
