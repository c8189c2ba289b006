//! CheckCoordinator - runs one check and propagates its result
//!
//! ## Flow
//!
//! ```text
//! load check + host → probe → record result ┬─ changed ──▶ append event
//!                                           │              → status-changed → count-changed
//!                                           └─ unchanged ─▶ (last check refreshed only)
//!                                           then always ──▶ schedule-changed
//! ```
//!
//! Nothing is cached between runs; the repository is read fresh every time.
//! A repository failure before the result is recorded aborts the run with no
//! writes. Notification failures never fail a run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use super::registry::RegistryHandle;
use crate::monitors::Prober;
use crate::notifications::{Notifier, events};
use crate::storage::{Repository, StorageResult, with_timeout};
use crate::util::display_timestamp;
use crate::{Event, HostService, Status};

/// Result of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    /// The check with this run's result applied
    pub check: HostService,
    pub old_status: Status,
    pub new_status: Status,
    pub checked_at: DateTime<Utc>,
}

impl CheckOutcome {
    pub fn changed(&self) -> bool {
        self.old_status != self.new_status
    }
}

/// Reply to a manual "check now"
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckNowResponse {
    pub ok: bool,
    pub message: String,
    pub service_id: i64,
    pub host_service_id: i64,
    pub host_id: i64,
    pub old_status: Status,
    pub new_status: Status,
    pub last_check: String,
}

impl CheckNowResponse {
    const FAILURE: &'static str = "Something went wrong";

    fn failed(host_service_id: i64) -> Self {
        Self {
            ok: false,
            message: Self::FAILURE.to_string(),
            host_service_id,
            last_check: display_timestamp(None),
            ..Default::default()
        }
    }
}

impl From<&CheckOutcome> for CheckNowResponse {
    fn from(outcome: &CheckOutcome) -> Self {
        Self {
            ok: true,
            message: outcome.check.last_message.clone(),
            service_id: outcome.check.service_id(),
            host_service_id: outcome.check.id,
            host_id: outcome.check.host_id,
            old_status: outcome.old_status,
            new_status: outcome.new_status,
            last_check: display_timestamp(Some(outcome.checked_at)),
        }
    }
}

pub struct CheckCoordinator {
    repository: Arc<dyn Repository>,
    prober: Arc<dyn Prober>,
    notifier: Notifier,
    registry: RegistryHandle,
    repository_timeout: Duration,
}

impl CheckCoordinator {
    pub fn new(
        repository: Arc<dyn Repository>,
        prober: Arc<dyn Prober>,
        notifier: Notifier,
        registry: RegistryHandle,
        repository_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            prober,
            notifier,
            registry,
            repository_timeout,
        }
    }

    /// Entry point for scheduled fires; failures are logged
    pub async fn run_check(&self, check_id: i64) {
        if let Err(e) = self.execute(check_id).await {
            error!("check {check_id} aborted: {e}");
        }
    }

    /// Entry point for manual runs; never surfaces the underlying error
    pub async fn run_check_now(&self, check_id: i64) -> CheckNowResponse {
        match self.execute(check_id).await {
            Ok(outcome) => CheckNowResponse::from(&outcome),
            Err(e) => {
                error!("manual check {check_id} failed: {e}");
                CheckNowResponse::failed(check_id)
            }
        }
    }

    /// Probe one check and persist and announce the result
    #[instrument(skip(self))]
    pub async fn execute(&self, check_id: i64) -> StorageResult<CheckOutcome> {
        let timeout = self.repository_timeout;

        let check =
            with_timeout(timeout, "load check", self.repository.load_check(check_id)).await?;
        let host =
            with_timeout(timeout, "load host", self.repository.load_host(check.host_id)).await?;

        let result = self.prober.probe(check.service_type, &host.url).await;
        let checked_at = Utc::now();
        debug!("{} → {}: {}", check.status, result.status, result.message);

        // Only the result is written; the active flag and interval belong to
        // the admin and may have changed while the probe was running.
        with_timeout(
            timeout,
            "record result",
            self.repository
                .record_result(check_id, result.status, checked_at, &result.message),
        )
        .await?;

        let mut updated = check.clone();
        updated.status = result.status;
        updated.last_check = Some(checked_at);
        updated.last_message = result.message;

        let outcome = CheckOutcome {
            old_status: check.status,
            new_status: updated.status,
            check: updated,
            checked_at,
        };

        if outcome.changed() {
            info!(
                "{} on {} changed from {} to {}",
                check.service_name, check.host_name, outcome.old_status, outcome.new_status
            );
            self.record_change(&check, &outcome).await;
        }

        let next_run = match self.registry.next_run(check_id).await {
            Ok(next) => next,
            Err(e) => {
                warn!("could not query next run: {e}");
                None
            }
        };

        self.notifier.publish(
            events::SCHEDULE_CHANGED,
            events::schedule_changed(
                &outcome.check,
                outcome.new_status,
                next_run,
                Some(checked_at),
            ),
        );

        Ok(outcome)
    }

    /// Append the transition to the history and announce it with fresh counts
    async fn record_change(&self, previous: &HostService, outcome: &CheckOutcome) {
        let timeout = self.repository_timeout;

        let event = Event {
            id: None,
            host_service_id: previous.id,
            event_type: outcome.new_status,
            host_id: previous.host_id,
            service_name: previous.service_name.clone(),
            host_name: previous.host_name.clone(),
            message: outcome.check.last_message.clone(),
            created_at: outcome.checked_at,
        };
        let appended =
            with_timeout(timeout, "append event", self.repository.append_event(&event)).await;
        if let Err(e) = appended {
            error!("failed to record event for check {}: {e}", previous.id);
        }

        self.notifier.publish(
            events::STATUS_CHANGED,
            events::status_changed(previous, outcome.new_status, outcome.checked_at),
        );

        match with_timeout(
            timeout,
            "aggregate status counts",
            self.repository.aggregate_status_counts(),
        )
        .await
        {
            Ok(counts) => {
                self.notifier.publish(events::COUNT_CHANGED, events::counts_changed(&counts));
            }
            Err(e) => error!("failed to read status counts: {e}"),
        }
    }
}
