//! JobEngine - fixed-interval job runner
//!
//! Every registered job is driven by its own task on the shared Tokio runtime.
//! The driver sleeps until the next deadline, spawns `run()` on a fresh task and
//! waits for it before computing the following deadline:
//!
//! ```text
//! Scheduled ──deadline──▶ Firing ──run() done / panicked──▶ Scheduled
//!     │
//!     └── remove() ──▶ (gone)
//! ```
//!
//! Waiting for the run is what keeps fires of one job strictly sequential. A run
//! that overruns its period delays the next fire instead of overlapping it.
//! Removing a job aborts only its driver; a run that is already executing keeps
//! going on its own task and finishes normally.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, instrument, trace, warn};

use super::spec::IntervalSpec;

/// Identifier handed out by [`JobEngine::add`]
pub type JobId = u64;

/// Unit of recurring work
#[async_trait]
pub trait Job: Send + Sync + 'static {
    async fn run(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Scheduled,
    Firing,
}

/// Snapshot of one registered job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    pub id: JobId,
    pub spec: IntervalSpec,
    pub state: JobState,
    /// When the job fires next; while firing, the deadline after the current run
    pub next: Option<DateTime<Utc>>,
    /// When the job last fired
    pub prev: Option<DateTime<Utc>>,
    pub fires: u64,
}

struct Slot {
    entry: JobEntry,
    driver: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    jobs: RwLock<HashMap<JobId, Slot>>,
    next_id: AtomicU64,
}

impl Inner {
    async fn update(&self, id: JobId, f: impl FnOnce(&mut JobEntry)) -> bool {
        match self.jobs.write().await.get_mut(&id) {
            Some(slot) => {
                f(&mut slot.entry);
                true
            }
            None => false,
        }
    }
}

/// Cloneable handle to the job engine
#[derive(Clone, Default)]
pub struct JobEngine {
    inner: Arc<Inner>,
}

impl JobEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job firing every `spec` period, starting one period from now
    pub async fn add(&self, spec: IntervalSpec, job: Arc<dyn Job>) -> JobId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        // Hold the write lock until the slot exists so the driver's first
        // update always finds it.
        let mut jobs = self.inner.jobs.write().await;
        let deadline = Instant::now() + spec.period();
        let driver = tokio::spawn(drive(Arc::downgrade(&self.inner), id, spec, deadline, job));
        jobs.insert(
            id,
            Slot {
                entry: JobEntry {
                    id,
                    spec,
                    state: JobState::Scheduled,
                    next: wall_clock_at(deadline),
                    prev: None,
                    fires: 0,
                },
                driver,
            },
        );

        debug!("registered job {id} ({spec})");
        id
    }

    /// Stop future fires of a job. Returns `false` if it was not registered.
    pub async fn remove(&self, id: JobId) -> bool {
        match self.inner.jobs.write().await.remove(&id) {
            Some(slot) => {
                slot.driver.abort();
                debug!("removed job {id}");
                true
            }
            None => false,
        }
    }

    pub async fn entry(&self, id: JobId) -> Option<JobEntry> {
        self.inner
            .jobs
            .read()
            .await
            .get(&id)
            .map(|slot| slot.entry.clone())
    }

    pub async fn next_fire(&self, id: JobId) -> Option<DateTime<Utc>> {
        self.entry(id).await.and_then(|entry| entry.next)
    }

    /// All registered jobs, ordered by id
    pub async fn entries(&self) -> Vec<JobEntry> {
        let mut entries: Vec<JobEntry> = self
            .inner
            .jobs
            .read()
            .await
            .values()
            .map(|slot| slot.entry.clone())
            .collect();
        entries.sort_by_key(|entry| entry.id);
        entries
    }

    pub async fn len(&self) -> usize {
        self.inner.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every job
    pub async fn shutdown(&self) {
        let mut jobs = self.inner.jobs.write().await;
        for (_, slot) in jobs.drain() {
            slot.driver.abort();
        }
        debug!("job engine shut down");
    }
}

#[instrument(skip(inner, spec, deadline, job))]
async fn drive(
    inner: Weak<Inner>,
    id: JobId,
    spec: IntervalSpec,
    mut deadline: Instant,
    job: Arc<dyn Job>,
) {
    let period = spec.period();
    let step = TimeDelta::from_std(period).unwrap_or(TimeDelta::zero());

    loop {
        let next = wall_clock_at(deadline);
        {
            let Some(inner) = inner.upgrade() else { return };
            if !inner
                .update(id, |entry| {
                    entry.state = JobState::Scheduled;
                    entry.next = next;
                })
                .await
            {
                return;
            }
        }

        tokio::time::sleep_until(deadline).await;

        let fired_at = Utc::now();
        {
            let Some(inner) = inner.upgrade() else { return };
            if !inner
                .update(id, |entry| {
                    entry.state = JobState::Firing;
                    entry.next = fired_at.checked_add_signed(step);
                    entry.prev = Some(fired_at);
                    entry.fires += 1;
                })
                .await
            {
                return;
            }
        }

        trace!("firing job {id}");
        let run = tokio::spawn({
            let job = job.clone();
            async move { job.run().await }
        });

        match run.await {
            Ok(()) => trace!("job {id} finished"),
            Err(e) if e.is_panic() => error!("job {id} panicked: {e}"),
            Err(e) => warn!("job {id} did not complete: {e}"),
        }

        deadline += period;
        let now = Instant::now();
        if deadline < now {
            debug!("job {id} overran its period, firing again right away");
            deadline = now;
        }
    }
}

/// `None` when the deadline lies beyond what a `DateTime` can hold
fn wall_clock_at(deadline: Instant) -> Option<DateTime<Utc>> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    Utc::now().checked_add_signed(TimeDelta::from_std(remaining).ok()?)
}
